use crate::{
    core::{
        config::DataProjection,
        geo::{Coordinate, Extent},
        viewport::View,
    },
    data::{
        feature::{features_extent, Feature},
        geojson::read_features,
    },
    layers::base::{LayerProperties, LayerTrait, LayerType},
    rendering::context::{
        LineRenderStyle, PointRenderStyle, PolygonRenderStyle, RenderContext, StyleConversion,
    },
    style::{default_style, Style},
    Result,
};
use geo_types::{Geometry, LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Style callback applied to features without a style of their own
pub type StyleFunction = Arc<dyn Fn(&Feature) -> Style + Send + Sync>;

/// Load state of a vector source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    Undefined,
    Loading,
    Ready,
    Error,
}

/// Feature storage of a vector layer, optionally backed by a remote document
#[derive(Debug, Clone)]
pub struct VectorSource {
    url: Option<String>,
    projection: DataProjection,
    features: Vec<Feature>,
    state: SourceState,
}

impl VectorSource {
    /// A source whose features are managed in memory; it is ready immediately
    pub fn new() -> Self {
        Self {
            url: None,
            projection: DataProjection::default(),
            features: Vec::new(),
            state: SourceState::Ready,
        }
    }

    /// A source loading a GeoJSON document from `url`
    pub fn with_url(url: impl Into<String>, projection: DataProjection) -> Self {
        Self {
            url: Some(url.into()),
            projection,
            features: Vec::new(),
            state: SourceState::Undefined,
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn add_feature(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn clear(&mut self) {
        self.features.clear();
    }

    pub fn feature_by_id(&self, id: &str) -> Option<&Feature> {
        self.features
            .iter()
            .find(|f| f.id.as_ref().and_then(|v| v.as_str()) == Some(id))
    }

    pub fn feature_by_id_mut(&mut self, id: &str) -> Option<&mut Feature> {
        self.features
            .iter_mut()
            .find(|f| f.id.as_ref().and_then(|v| v.as_str()) == Some(id))
    }

    /// Bounding extent of every feature geometry
    pub fn extent(&self) -> Option<Extent> {
        features_extent(&self.features)
    }

    /// Marks the source as loading and returns the URL to fetch, unless a
    /// load is already underway or done
    pub fn begin_load(&mut self) -> Option<String> {
        match (self.state, &self.url) {
            (SourceState::Undefined, Some(url)) => {
                self.state = SourceState::Loading;
                Some(url.clone())
            }
            _ => None,
        }
    }

    /// Completes a load with the fetched document and returns the new state
    pub fn finish_load(&mut self, bytes: Result<Vec<u8>>) -> SourceState {
        let parsed = bytes.and_then(|bytes| read_features(&bytes, self.projection));
        match parsed {
            Ok(features) => {
                log::debug!(
                    "loaded {} features from {}",
                    features.len(),
                    self.url.as_deref().unwrap_or("memory")
                );
                self.features = features;
                self.state = SourceState::Ready;
            }
            Err(e) => {
                log::warn!(
                    "failed to load {}: {}",
                    self.url.as_deref().unwrap_or("vector source"),
                    e
                );
                self.state = SourceState::Error;
            }
        }
        self.state
    }
}

impl Default for VectorSource {
    fn default() -> Self {
        Self::new()
    }
}

/// A layer that draws the features of a [`VectorSource`]
pub struct VectorLayer {
    properties: LayerProperties,
    source: VectorSource,
    style_function: Option<StyleFunction>,
}

impl VectorLayer {
    pub fn new(id: String, name: String) -> Self {
        Self::with_source(id, name, VectorSource::new())
    }

    pub fn with_source(id: String, name: String, source: VectorSource) -> Self {
        Self {
            properties: LayerProperties::new(id, name, LayerType::Vector),
            source,
            style_function: None,
        }
    }

    pub fn with_style_function<F>(mut self, style: F) -> Self
    where
        F: Fn(&Feature) -> Style + Send + Sync + 'static,
    {
        self.style_function = Some(Arc::new(style));
        self
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.properties.attribution = Some(attribution.into());
        self
    }

    pub fn source(&self) -> &VectorSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut VectorSource {
        &mut self.source
    }

    /// Style a feature is drawn with: its own, then the layer function, then the default
    pub fn style_for(&self, feature: &Feature) -> Style {
        if let Some(style) = feature.style() {
            return *style;
        }
        match &self.style_function {
            Some(style_function) => style_function(feature),
            None => default_style(),
        }
    }

    fn render_geometry(
        context: &mut RenderContext,
        view: &View,
        geometry: &Geometry<f64>,
        style: &Style,
        opacity: f32,
    ) {
        let to_screen = |line: &LineString<f64>| -> Vec<Coordinate> {
            line.coords()
                .map(|c| view.coordinate_to_pixel(&Coordinate::from(*c)))
                .collect()
        };
        let draw_polygon = |context: &mut RenderContext, polygon: &Polygon<f64>| {
            let render_style: PolygonRenderStyle = style.to_render_style(opacity);
            if render_style.is_visible() {
                let holes: Vec<Vec<Coordinate>> =
                    polygon.interiors().iter().map(|ring| to_screen(ring)).collect();
                context.render_polygon(&to_screen(polygon.exterior()), &holes, &render_style);
            }
        };
        let draw_line = |context: &mut RenderContext, line: &LineString<f64>| {
            let render_style: LineRenderStyle = style.to_render_style(opacity);
            if render_style.width > 0.0 {
                context.render_line(&to_screen(line), &render_style);
            }
        };
        let draw_point = |context: &mut RenderContext, point: &geo_types::Point<f64>| {
            let render_style: PointRenderStyle = style.to_render_style(opacity);
            if render_style.radius > 0.0 {
                context.render_point(&view.coordinate_to_pixel(&Coordinate::from(point.0)), &render_style);
            }
        };

        match geometry {
            Geometry::Point(point) => draw_point(context, point),
            Geometry::MultiPoint(points) => points.iter().for_each(|p| draw_point(context, p)),
            Geometry::Line(line) => draw_line(context, &LineString::from(vec![line.start, line.end])),
            Geometry::LineString(line) => draw_line(context, line),
            Geometry::MultiLineString(lines) => lines.iter().for_each(|l| draw_line(context, l)),
            Geometry::Polygon(polygon) => draw_polygon(context, polygon),
            Geometry::MultiPolygon(polygons) => polygons.iter().for_each(|p| draw_polygon(context, p)),
            Geometry::Rect(rect) => draw_polygon(context, &rect.to_polygon()),
            Geometry::Triangle(triangle) => draw_polygon(context, &triangle.to_polygon()),
            Geometry::GeometryCollection(collection) => {
                for geometry in collection.iter() {
                    Self::render_geometry(context, view, geometry, style, opacity);
                }
            }
        }
    }
}

impl LayerTrait for VectorLayer {
    crate::impl_layer_trait!(VectorLayer, properties);

    fn render(&mut self, context: &mut RenderContext, view: &View) -> Result<()> {
        let opacity = self.opacity();
        if opacity <= 0.0 {
            return Ok(());
        }
        let visible = view.calculate_extent();

        for feature in self.source.features() {
            let (Some(geometry), Some(extent)) = (feature.geometry(), feature.extent()) else {
                continue;
            };
            if !extent.intersects(&visible) {
                continue;
            }
            let style = self.style_for(feature);
            Self::render_geometry(context, view, geometry, &style, opacity);
        }
        Ok(())
    }

    fn extent(&self) -> Option<Extent> {
        self.source.extent()
    }

    fn options(&self) -> serde_json::Value {
        let mut options = crate::layers::base::properties_options(&self.properties);
        options["url"] = self.source.url().into();
        options["state"] = serde_json::to_value(self.source.state()).unwrap_or_default();
        options["feature_count"] = self.source.feature_count().into();
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Size;
    use crate::rendering::context::DrawCommand;
    use crate::style::resolve_style;
    use crate::MapError;

    const DOCUMENT: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"class": "built"},
             "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [1000.0, 0.0], [1000.0, 1000.0], [0.0, 0.0]]]}},
            {"type": "Feature", "properties": {"class": "water"},
             "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [-1000.0, 0.0], [-1000.0, -1000.0], [0.0, 0.0]]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [500.0, 500.0]]}}
        ]
    }"#;

    fn overlay() -> VectorLayer {
        let source = VectorSource::with_url("./merged.geojson", DataProjection::WebMercator);
        let mut layer = VectorLayer::with_source("merged".to_string(), "Merged".to_string(), source)
            .with_style_function(resolve_style);
        layer.set_opacity(0.5);
        layer
    }

    #[test]
    fn test_source_load_lifecycle() {
        let mut layer = overlay();
        assert_eq!(layer.source().state(), SourceState::Undefined);
        assert_eq!(layer.source_mut().begin_load().as_deref(), Some("./merged.geojson"));
        assert_eq!(layer.source().state(), SourceState::Loading);
        assert_eq!(layer.source_mut().begin_load(), None);

        let state = layer.source_mut().finish_load(Ok(DOCUMENT.as_bytes().to_vec()));
        assert_eq!(state, SourceState::Ready);
        assert_eq!(layer.source().feature_count(), 3);
        assert_eq!(layer.extent(), Some(Extent::new(-1000.0, -1000.0, 1000.0, 1000.0)));
    }

    #[test]
    fn test_failed_load_keeps_no_features() {
        let mut layer = overlay();
        layer.source_mut().begin_load();
        let state = layer.source_mut().finish_load(Err(MapError::HttpStatus {
            status: 404,
            url: "./merged.geojson".to_string(),
        }));
        assert_eq!(state, SourceState::Error);
        assert!(layer.extent().is_none());

        let mut garbage = overlay();
        garbage.source_mut().begin_load();
        assert_eq!(garbage.source_mut().finish_load(Ok(b"not json".to_vec())), SourceState::Error);
    }

    #[test]
    fn test_render_skips_invisible_styles() {
        let mut layer = overlay();
        layer.source_mut().begin_load();
        layer.source_mut().finish_load(Ok(DOCUMENT.as_bytes().to_vec()));

        let view = View::new(Coordinate::new(0.0, 0.0), 14.0, Size::new(800.0, 600.0));
        let mut context = RenderContext::new(800, 600);
        layer.render(&mut context, &view).unwrap();

        // The water polygon is fully transparent and the unclassified line has no stroke.
        let queue = context.get_drawing_queue();
        assert_eq!(queue.len(), 1);
        match &queue[0] {
            DrawCommand::Polygon { style, .. } => {
                assert_eq!(style.fill_color, crate::style::Color::rgb(0xee, 0xcb, 0xaf));
                assert_eq!(style.opacity, 0.5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_feature_style_takes_precedence() {
        let layer = overlay();
        let mut feature = Feature::empty();
        assert_eq!(layer.style_for(&feature), resolve_style(&feature));

        feature.set_style(Some(crate::style::position_style()));
        assert_eq!(layer.style_for(&feature), crate::style::position_style());

        let plain = VectorLayer::new("plain".to_string(), "Plain".to_string());
        assert_eq!(plain.style_for(&Feature::empty()), default_style());
        assert_eq!(plain.source().state(), SourceState::Ready);
    }

    #[test]
    fn test_feature_lookup_by_id() {
        let mut source = VectorSource::new();
        source.add_feature(Feature::empty().with_id(serde_json::json!("position")));
        assert!(source.feature_by_id("position").is_some());
        assert!(source.feature_by_id_mut("accuracy").is_none());
    }
}
