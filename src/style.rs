//! Feature styling
//!
//! Styles are plain values. The overlay is styled by [`resolve_style`], a total
//! function of the feature's `class` attribute.

use crate::data::feature::Feature;
use serde::{Deserialize, Serialize};

/// RGBA color with straight (non-premultiplied) alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

/// Polygon fill
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub color: Color,
}

impl Fill {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

/// Outline; a stroke without a color is not drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Option<Color>,
    pub width: f32,
}

impl Stroke {
    pub fn new(color: Color, width: f32) -> Self {
        Self {
            color: Some(color),
            width,
        }
    }

    /// A stroke that only carries a width
    pub fn width_only(width: f32) -> Self {
        Self { color: None, width }
    }

    /// Whether drawing this stroke would put any pixel on screen
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.color.is_some_and(|c| !c.is_transparent())
    }
}

/// Circle symbol used for point geometries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleStyle {
    pub radius: f32,
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
}

/// Visual style of a feature
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Style {
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
    pub image: Option<CircleStyle>,
}

impl Style {
    pub fn new(fill: Option<Fill>, stroke: Option<Stroke>) -> Self {
        Self {
            fill,
            stroke,
            image: None,
        }
    }

    /// Effective fill color, transparent when there is no fill
    pub fn fill_color(&self) -> Color {
        self.fill.map(|f| f.color).unwrap_or(Color::TRANSPARENT)
    }
}

/// Land-use class of an overlay feature, read from its `class` property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    RoadNetwork,
    Built,
    NonBuilt,
    Water,
    Unclassified,
}

impl Classification {
    /// Property holding the classification
    pub const PROPERTY: &'static str = "class";

    /// Maps a raw attribute value; anything unknown is unclassified
    pub fn from_value(value: Option<&serde_json::Value>) -> Self {
        match value.and_then(serde_json::Value::as_str) {
            Some("road_network") => Classification::RoadNetwork,
            Some("built") => Classification::Built,
            Some("non-built") => Classification::NonBuilt,
            Some("water") => Classification::Water,
            _ => Classification::Unclassified,
        }
    }

    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Classification::RoadNetwork => Some("road_network"),
            Classification::Built => Some("built"),
            Classification::NonBuilt => Some("non-built"),
            Classification::Water => Some("water"),
            Classification::Unclassified => None,
        }
    }

    /// Style of every feature carrying this classification
    pub fn style(&self) -> Style {
        match self {
            Classification::RoadNetwork => Style::new(
                Some(Fill::new(Color::TRANSPARENT)),
                Some(Stroke::width_only(0.0)),
            ),
            Classification::Built => Style::new(
                Some(Fill::new(Color::rgb(0xee, 0xcb, 0xaf))),
                Some(Stroke::new(Color::rgb(0x59, 0x65, 0x59), 1.0)),
            ),
            Classification::NonBuilt => Style::new(
                Some(Fill::new(Color::rgb(0x9b, 0xbe, 0x79))),
                Some(Stroke::new(Color::rgb(0x23, 0x23, 0x23), 1.0)),
            ),
            Classification::Water => Style::new(
                Some(Fill::new(Color::TRANSPARENT)),
                Some(Stroke::new(Color::TRANSPARENT, 1.0)),
            ),
            Classification::Unclassified => Style::new(Some(Fill::new(Color::WHITE)), None),
        }
    }
}

/// Resolves the overlay style of a feature. Never fails.
pub fn resolve_style(feature: &Feature) -> Style {
    feature.classification().style()
}

/// Blue dot marking the current device position
pub fn position_style() -> Style {
    Style {
        fill: None,
        stroke: None,
        image: Some(CircleStyle {
            radius: 6.0,
            fill: Some(Fill::new(Color::rgb(0x33, 0x99, 0xcc))),
            stroke: Some(Stroke::new(Color::WHITE, 2.0)),
        }),
    }
}

/// Style applied to features that carry no style of their own
pub fn default_style() -> Style {
    let blue = Color::rgb(0x33, 0x99, 0xcc);
    Style {
        fill: Some(Fill::new(Color::new(255, 255, 255, 102))),
        stroke: Some(Stroke::new(blue, 1.25)),
        image: Some(CircleStyle {
            radius: 5.0,
            fill: Some(Fill::new(Color::new(255, 255, 255, 102))),
            stroke: Some(Stroke::new(blue, 1.25)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature_with_class(class: serde_json::Value) -> Feature {
        let mut properties = serde_json::Map::new();
        properties.insert("class".to_string(), class);
        Feature::new(None, properties)
    }

    #[test]
    fn test_built_style() {
        let style = resolve_style(&feature_with_class(json!("built")));
        assert_eq!(style.fill_color(), Color::rgb(0xee, 0xcb, 0xaf));
        let stroke = style.stroke.unwrap();
        assert_eq!(stroke.color, Some(Color::rgb(0x59, 0x65, 0x59)));
        assert_eq!(stroke.width, 1.0);
    }

    #[test]
    fn test_non_built_style() {
        let style = resolve_style(&feature_with_class(json!("non-built")));
        assert_eq!(style.fill_color(), Color::rgb(0x9b, 0xbe, 0x79));
        assert_eq!(style.stroke, Some(Stroke::new(Color::rgb(0x23, 0x23, 0x23), 1.0)));
    }

    #[test]
    fn test_transparent_classes() {
        for class in ["water", "road_network"] {
            let style = resolve_style(&feature_with_class(json!(class)));
            assert!(style.fill_color().is_transparent(), "{class} fill");
            assert!(!style.stroke.unwrap().is_visible(), "{class} stroke");
        }
        let road = resolve_style(&feature_with_class(json!("road_network")));
        assert_eq!(road.stroke.unwrap().width, 0.0);
        let water = resolve_style(&feature_with_class(json!("water")));
        assert_eq!(water.stroke.unwrap().width, 1.0);
    }

    #[test]
    fn test_fallback_style() {
        let expected = Style::new(Some(Fill::new(Color::WHITE)), None);
        let cases = [
            Feature::new(None, serde_json::Map::new()),
            feature_with_class(serde_json::Value::Null),
            feature_with_class(json!("cemetery")),
            feature_with_class(json!(42)),
            feature_with_class(json!("Built")),
        ];
        for feature in &cases {
            assert_eq!(resolve_style(feature), expected);
        }
    }
}
