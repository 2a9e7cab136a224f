//! # chronomap
//!
//! An interactive historical map viewer built on a small, Rust-native map model.
//!
//! The crate composes four layers into a single [`Map`]: an OpenStreetMap base
//! layer, a historical XYZ tile overlay restricted to a zoom range and extent,
//! a GeoJSON overlay whose features are styled from their `class` attribute,
//! and a geolocation overlay that follows the device position. Rendering is
//! produced as a per-frame display list ([`RenderContext`]) that a host such
//! as the egui viewer turns into pixels.

pub mod core;
pub mod data;
pub mod geolocation;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod rendering;
pub mod runtime;
pub mod style;
pub mod tiles;
pub mod ui;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    builder::MapBuilder,
    config::ViewerConfig,
    geo::{Coordinate, Extent, LonLat, Size, TileCoord},
    map::Map,
    viewport::View,
};

pub use layers::{base::LayerTrait, tile::TileLayer, vector::VectorLayer};

pub use input::{events::MapEvent, handler::EventManager};

pub use geolocation::{Geolocation, GeolocationError, PositionFix, TrackingOptions};

pub use rendering::context::{DrawCommand, RenderContext};

pub use style::{resolve_style, Classification, Color, Style};

pub use data::{feature::Feature, geojson::GeoJson};

pub use ui::controls::{Attribution, LoadingFlag, LoadingIndicator};

#[cfg(feature = "egui")]
pub use ui::widget::MapWidget;

/// Initialises `env_logger` from `RUST_LOG`, defaulting to `info` for this crate
#[cfg(feature = "debug")]
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("chronomap=info");
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("logger already initialised");
    }
}

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Geolocation error: {0}")]
    Geolocation(#[from] GeolocationError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Error type alias for convenience
pub type Error = MapError;
