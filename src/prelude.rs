//! Prelude module for common chronomap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use chronomap::prelude::*;`

pub use crate::core::{
    builder::MapBuilder,
    config::{DataProjection, Preload, TileLayerConfig, ViewerConfig},
    geo::{Coordinate, Extent, LonLat, Size, TileCoord},
    map::Map,
    viewport::{Padding, View},
};

pub use crate::layers::{
    base::LayerTrait,
    manager::LayerManager,
    tile::TileLayer,
    vector::{SourceState, VectorLayer, VectorSource},
};

pub use crate::data::{feature::Feature, geojson::GeoJson};

pub use crate::input::{
    events::{EventKind, InputEvent, MapEvent},
    handler::{EventManager, InputHandler},
};

pub use crate::geolocation::{
    Geolocation, GeolocationError, PositionFix, PositionProvider, TrackingOptions,
};

pub use crate::runtime::{runtime, spawn, AsyncSpawner};

pub use crate::tiles::{
    cache::TileCache,
    loader::{Fetcher, TileLoader},
    source::TileSource,
};

pub use crate::rendering::context::{DrawCommand, RenderContext};

pub use crate::style::{resolve_style, Classification, Color, Style};

pub use crate::ui::controls::{Attribution, LoadingFlag, LoadingIndicator};

#[cfg(feature = "egui")]
pub use crate::ui::widget::MapWidget;

pub use crate::{Error as MapError, Result};

pub use std::{collections::VecDeque, pin::Pin, sync::Arc};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;
