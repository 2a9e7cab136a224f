use crate::core::geo::Extent;
use crate::style::{Classification, Style};
use geo::BoundingRect;
use geo_types::Geometry;
use serde_json::{Map, Value};

/// A geographic entity: an optional geometry in map coordinates plus attributes.
///
/// A feature may carry its own style, which takes precedence over the style
/// function of the layer that draws it.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<Value>,
    geometry: Option<Geometry<f64>>,
    properties: Map<String, Value>,
    style: Option<Style>,
}

impl Feature {
    pub fn new(geometry: Option<Geometry<f64>>, properties: Map<String, Value>) -> Self {
        Self {
            id: None,
            geometry,
            properties,
            style: None,
        }
    }

    /// A feature with a geometry and no attributes
    pub fn from_geometry(geometry: Geometry<f64>) -> Self {
        Self::new(Some(geometry), Map::new())
    }

    /// A feature with neither geometry nor attributes
    pub fn empty() -> Self {
        Self::new(None, Map::new())
    }

    pub fn with_id(mut self, id: Value) -> Self {
        self.id = Some(id);
        self
    }

    pub fn geometry(&self) -> Option<&Geometry<f64>> {
        self.geometry.as_ref()
    }

    /// Replaces the geometry; `None` hides the feature
    pub fn set_geometry(&mut self, geometry: Option<Geometry<f64>>) {
        self.geometry = geometry;
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn style(&self) -> Option<&Style> {
        self.style.as_ref()
    }

    pub fn set_style(&mut self, style: Option<Style>) {
        self.style = style;
    }

    /// Land-use class from the `class` attribute
    pub fn classification(&self) -> Classification {
        Classification::from_value(self.get(Classification::PROPERTY))
    }

    /// Bounding extent of the geometry, `None` when there is nothing to bound
    pub fn extent(&self) -> Option<Extent> {
        self.geometry
            .as_ref()
            .and_then(|geometry| geometry.bounding_rect())
            .map(Extent::from)
    }
}

/// Bounding extent of a set of features, `None` when none has a geometry
pub fn features_extent<'a, I>(features: I) -> Option<Extent>
where
    I: IntoIterator<Item = &'a Feature>,
{
    features
        .into_iter()
        .filter_map(Feature::extent)
        .reduce(|acc, extent| acc.union(&extent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{point, polygon};

    #[test]
    fn test_polygon_extent() {
        let feature = Feature::from_geometry(Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 3.0),
            (x: 0.0, y: 0.0),
        ]));
        assert_eq!(feature.extent(), Some(Extent::new(0.0, 0.0, 4.0, 3.0)));
    }

    #[test]
    fn test_features_extent_skips_empty_geometries() {
        let features = vec![
            Feature::from_geometry(Geometry::Point(point!(x: 1.0, y: 2.0))),
            Feature::empty(),
            Feature::from_geometry(Geometry::Point(point!(x: -3.0, y: 5.0))),
        ];
        assert_eq!(features_extent(&features), Some(Extent::new(-3.0, 2.0, 1.0, 5.0)));
        assert_eq!(features_extent(&[Feature::empty()]), None);
    }

    #[test]
    fn test_set_geometry_replaces_previous() {
        let mut feature = Feature::from_geometry(Geometry::Point(point!(x: 1.0, y: 1.0)));
        feature.set_geometry(Some(Geometry::Point(point!(x: 2.0, y: 2.0))));
        assert_eq!(feature.extent(), Some(Extent::new(2.0, 2.0, 2.0, 2.0)));
        feature.set_geometry(None);
        assert!(feature.geometry().is_none());
    }
}
