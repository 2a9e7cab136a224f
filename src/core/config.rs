//! Viewer configuration
//!
//! Every value defaults to the built-in Montmorillon 1840 setup, so an empty
//! JSON object (or no file at all) yields the stock viewer. The base path used
//! to resolve the overlay file can be overridden with the `BASE_URL`
//! environment variable.

use crate::core::constants::*;
use crate::core::geo::{Coordinate, Extent};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How many coarser tile levels a tile layer fetches below the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preload {
    /// Fetch at most this many levels below the current one
    Levels(u8),
    /// Fetch every level down to the source minimum zoom
    Unbounded,
}

impl Preload {
    /// Number of coarser levels to fetch given how many exist below the current zoom
    pub fn levels_below(&self, available: u8) -> u8 {
        match self {
            Preload::Levels(levels) => (*levels).min(available),
            Preload::Unbounded => available,
        }
    }
}

impl Default for Preload {
    fn default() -> Self {
        Preload::Levels(0)
    }
}

/// Projection of the coordinates stored in the GeoJSON overlay file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataProjection {
    #[serde(rename = "EPSG:4326")]
    Wgs84,
    #[serde(rename = "EPSG:3857")]
    WebMercator,
}

impl Default for DataProjection {
    fn default() -> Self {
        DataProjection::Wgs84
    }
}

/// Initial state of the view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub center: [f64; 2],
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Pixel padding used when fitting to the overlay extent
    pub fit_padding: f64,
}

impl ViewConfig {
    pub fn center(&self) -> Coordinate {
        Coordinate::from(self.center)
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            center: INITIAL_CENTER,
            zoom: INITIAL_ZOOM,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            fit_padding: FIT_PADDING,
        }
    }
}

/// Configuration for an XYZ tile layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayerConfig {
    /// URL template for tiles, e.g. `https://tile.openstreetmap.org/{z}/{x}/{y}.png`
    pub url_template: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Tiles are only requested when they overlap this extent
    #[serde(default)]
    pub extent: Option<Extent>,
    pub attribution: String,
    #[serde(default)]
    pub preload: Preload,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_opacity() -> f32 {
    1.0
}

impl TileLayerConfig {
    /// Standard OpenStreetMap tiles
    pub fn openstreetmap() -> Self {
        Self {
            url_template: OSM_TILE_URL.to_string(),
            min_zoom: 0,
            max_zoom: OSM_MAX_ZOOM,
            extent: None,
            attribution: OSM_ATTRIBUTION.to_string(),
            preload: Preload::default(),
            opacity: 1.0,
        }
    }

    /// The Montmorillon 1840 historical tileset
    pub fn historical() -> Self {
        Self {
            url_template: HISTORICAL_TILE_URL.to_string(),
            min_zoom: HISTORICAL_MIN_ZOOM,
            max_zoom: HISTORICAL_MAX_ZOOM,
            extent: Some(Extent::from_array(HISTORICAL_EXTENT)),
            attribution: HISTORICAL_ATTRIBUTION.to_string(),
            preload: Preload::Unbounded,
            opacity: 1.0,
        }
    }
}

/// Configuration for the GeoJSON overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Path of the feature collection relative to the base path
    pub file: String,
    pub attribution: String,
    pub opacity: f32,
    pub data_projection: DataProjection,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            file: OVERLAY_FILE.to_string(),
            attribution: OVERLAY_ATTRIBUTION.to_string(),
            opacity: OVERLAY_OPACITY,
            data_projection: DataProjection::default(),
        }
    }
}

/// Geolocation tracking options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub tracking: bool,
    pub enable_high_accuracy: bool,
    /// Fixed `[lon, lat, accuracy_m]` reported by the static provider, if any
    pub static_position: Option<[f64; 3]>,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            tracking: true,
            enable_high_accuracy: true,
            static_position: None,
        }
    }
}

/// Attribution control options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    pub collapsible: bool,
    pub collapsed: bool,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            collapsible: true,
            collapsed: true,
        }
    }
}

/// Top-level viewer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Base path or URL the overlay file is resolved against
    pub base_url: String,
    pub view: ViewConfig,
    pub base_layer: TileLayerConfig,
    pub historical_layer: TileLayerConfig,
    pub overlay: OverlayConfig,
    pub geolocation: GeolocationConfig,
    pub attribution: AttributionConfig,
    /// Maximum number of tiles kept in memory
    pub tile_cache_size: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            view: ViewConfig::default(),
            base_layer: TileLayerConfig::openstreetmap(),
            historical_layer: TileLayerConfig::historical(),
            overlay: OverlayConfig::default(),
            geolocation: GeolocationConfig::default(),
            attribution: AttributionConfig::default(),
            tile_cache_size: 1024,
        }
    }
}

impl ViewerConfig {
    /// Parses a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let config: ViewerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Applies environment overrides (`BASE_URL`)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.is_empty() {
                log::debug!("base url overridden from environment: {}", base_url);
                self.base_url = base_url;
            }
        }
        self
    }

    /// Checks the values a map cannot be composed with
    pub fn validate(&self) -> Result<()> {
        for layer in [&self.base_layer, &self.historical_layer] {
            if layer.min_zoom > layer.max_zoom {
                return Err(MapError::Config(format!(
                    "tile layer {} has min_zoom {} above max_zoom {}",
                    layer.url_template, layer.min_zoom, layer.max_zoom
                )));
            }
            if !(layer.url_template.contains("{z}")
                && layer.url_template.contains("{x}")
                && layer.url_template.contains("{y}"))
            {
                return Err(MapError::Config(format!(
                    "tile url template {} needs {{z}}, {{x}} and {{y}}",
                    layer.url_template
                )));
            }
        }
        if self.view.min_zoom > self.view.max_zoom {
            return Err(MapError::Config("view min_zoom above max_zoom".to_string()));
        }
        if !(0.0..=1.0).contains(&self.overlay.opacity) {
            return Err(MapError::Config("overlay opacity must be within 0..=1".to_string()));
        }
        Ok(())
    }

    /// URL (or filesystem path) of the overlay feature collection
    pub fn overlay_url(&self) -> String {
        resolve_asset_url(&self.base_url, &self.overlay.file)
    }
}

/// Joins a base path and a relative asset path with exactly one separator
pub fn resolve_asset_url(base: &str, file: &str) -> String {
    if base.is_empty() {
        return file.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        file.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_builtin_viewer() {
        let config = ViewerConfig::default();
        assert_eq!(config.view.center, [5852008.3243, 92896.8792]);
        assert_eq!(config.view.zoom, 12.0);
        assert_eq!(config.historical_layer.min_zoom, 11);
        assert_eq!(config.historical_layer.max_zoom, 21);
        assert_eq!(config.historical_layer.preload, Preload::Unbounded);
        assert_eq!(config.overlay.opacity, 0.5);
        assert!(config.geolocation.enable_high_accuracy);
        assert!(config.attribution.collapsed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json(r#"{ "base_url": "https://example.org/viewer/" }"#)
            .unwrap();
        assert_eq!(config.base_url, "https://example.org/viewer/");
        assert_eq!(config.overlay_url(), "https://example.org/viewer/merged.geojson");
        assert_eq!(config.view.zoom, 12.0);
    }

    #[test]
    fn test_extent_deserialises_from_array() {
        let config = ViewerConfig::from_json(
            r#"{ "historical_layer": {
                "url_template": "https://tiles.example/{z}/{x}/{y}.png",
                "min_zoom": 3, "max_zoom": 5,
                "extent": [10.0, 20.0, 0.0, 0.0],
                "attribution": "x",
                "preload": { "levels": 2 }
            } }"#,
        )
        .unwrap();
        let layer = config.historical_layer;
        assert_eq!(layer.extent, Some(Extent::new(0.0, 0.0, 10.0, 20.0)));
        assert_eq!(layer.preload, Preload::Levels(2));
    }

    #[test]
    fn test_invalid_zoom_range_rejected() {
        let result = ViewerConfig::from_json(
            r#"{ "base_layer": {
                "url_template": "https://t/{z}/{x}/{y}.png",
                "min_zoom": 9, "max_zoom": 2, "attribution": ""
            } }"#,
        );
        assert!(matches!(result, Err(MapError::Config(_))));
    }

    #[test]
    fn test_resolve_asset_url() {
        assert_eq!(resolve_asset_url("./", "merged.geojson"), "./merged.geojson");
        assert_eq!(resolve_asset_url("/base", "/merged.geojson"), "/base/merged.geojson");
        assert_eq!(resolve_asset_url("", "merged.geojson"), "merged.geojson");
    }

    #[test]
    fn test_preload_levels() {
        assert_eq!(Preload::Unbounded.levels_below(7), 7);
        assert_eq!(Preload::Levels(2).levels_below(7), 2);
        assert_eq!(Preload::Levels(9).levels_below(3), 3);
    }
}
