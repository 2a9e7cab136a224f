use crate::core::config::TileLayerConfig;
use crate::core::constants::{OSM_ATTRIBUTION, OSM_MAX_ZOOM, OSM_TILE_URL};
use crate::core::geo::{Extent, TileCoord};

/// Trait representing anything that can produce tile URLs for a given coordinate.
///
/// `url` returns `None` for every coordinate outside the source envelope
/// (zoom range and extent); no request may be issued for those.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> Option<String>;

    fn min_zoom(&self) -> u8;

    fn max_zoom(&self) -> u8;

    /// Extent outside of which the source has no tiles
    fn extent(&self) -> Option<Extent> {
        None
    }

    fn attribution(&self) -> &str;

    /// Whether `coord` lies within the zoom range and extent of this source
    fn covers(&self, coord: TileCoord) -> bool {
        coord.is_valid()
            && coord.z >= self.min_zoom()
            && coord.z <= self.max_zoom()
            && self
                .extent()
                .map_or(true, |extent| extent.overlaps(&coord.extent()))
    }

    /// Tile zoom used for a continuous view zoom: rounded, then clamped to the source range
    fn tile_zoom(&self, view_zoom: f64) -> u8 {
        let z = view_zoom.round().clamp(0.0, u8::MAX as f64) as u8;
        z.clamp(self.min_zoom(), self.max_zoom())
    }
}

/// Generic XYZ source expanding a `{z}/{x}/{y}` URL template
#[derive(Debug, Clone, PartialEq)]
pub struct XyzSource {
    url_template: String,
    min_zoom: u8,
    max_zoom: u8,
    extent: Option<Extent>,
    attribution: String,
}

impl XyzSource {
    pub fn new(url_template: impl Into<String>, min_zoom: u8, max_zoom: u8) -> Self {
        Self {
            url_template: url_template.into(),
            min_zoom,
            max_zoom,
            extent: None,
            attribution: String::new(),
        }
    }

    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = attribution.into();
        self
    }

    pub fn from_config(config: &TileLayerConfig) -> Self {
        let source = Self::new(config.url_template.clone(), config.min_zoom, config.max_zoom)
            .with_attribution(config.attribution.clone());
        match config.extent {
            Some(extent) => source.with_extent(extent),
            None => source,
        }
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }
}

impl TileSource for XyzSource {
    fn url(&self, coord: TileCoord) -> Option<String> {
        if !self.covers(coord) {
            return None;
        }
        Some(
            self.url_template
                .replace("{z}", &coord.z.to_string())
                .replace("{x}", &coord.x.to_string())
                .replace("{y}", &coord.y.to_string()),
        )
    }

    fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    fn extent(&self) -> Option<Extent> {
        self.extent
    }

    fn attribution(&self) -> &str {
        &self.attribution
    }
}

/// The standard OpenStreetMap tile server
#[derive(Debug, Clone, PartialEq)]
pub struct OpenStreetMapSource(XyzSource);

impl OpenStreetMapSource {
    pub fn new() -> Self {
        Self(XyzSource::new(OSM_TILE_URL, 0, OSM_MAX_ZOOM).with_attribution(OSM_ATTRIBUTION))
    }
}

impl Default for OpenStreetMapSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSource for OpenStreetMapSource {
    fn url(&self, coord: TileCoord) -> Option<String> {
        self.0.url(coord)
    }

    fn min_zoom(&self) -> u8 {
        self.0.min_zoom()
    }

    fn max_zoom(&self) -> u8 {
        self.0.max_zoom()
    }

    fn attribution(&self) -> &str {
        self.0.attribution()
    }
}
