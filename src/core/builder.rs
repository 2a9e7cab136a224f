//! Map builder for fluent configuration
//!
//! [`MapBuilder`] turns a [`ViewerConfig`] into a ready [`Map`]: the base and
//! historical tile layers, the classified overlay, the position layer and the
//! one-shot lifecycle hooks.

use crate::{
    core::{
        config::ViewerConfig,
        constants::{HISTORICAL_LAYER_ID, OSM_LAYER_ID, OVERLAY_LAYER_ID, POSITION_LAYER_ID},
        geo::Size,
        map::{fit_on_first_load, hide_loading_on_first_render, Map, ACCURACY_FEATURE_ID, POSITION_FEATURE_ID},
        viewport::{Padding, View},
    },
    data::feature::Feature,
    geolocation::{Geolocation, PositionProvider, TrackingOptions},
    layers::{
        base::LayerTrait,
        tile::TileLayer,
        vector::{VectorLayer, VectorSource},
    },
    style::{position_style, resolve_style},
    tiles::{
        cache::TileCache,
        loader::{DefaultFetcher, Fetcher},
    },
    ui::controls::LoadingIndicator,
    Result,
};
use std::sync::Arc;

/// Builder for creating and configuring Map instances
pub struct MapBuilder {
    config: ViewerConfig,
    size: Size,
    fetcher: Option<Arc<dyn Fetcher>>,
    position_provider: Option<Box<dyn PositionProvider>>,
    loading: Option<Box<dyn LoadingIndicator>>,
}

impl MapBuilder {
    /// A builder for the stock viewer
    pub fn new() -> Self {
        Self::from_config(ViewerConfig::default())
    }

    pub fn from_config(config: ViewerConfig) -> Self {
        Self {
            config,
            size: Size::default(),
            fetcher: None,
            position_provider: None,
            loading: None,
        }
    }

    /// Set the initial render target size
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    /// Replace the fetcher used for tiles and overlay data
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replace the position provider picked from the configuration
    pub fn with_position_provider(mut self, provider: Box<dyn PositionProvider>) -> Self {
        self.position_provider = Some(provider);
        self
    }

    pub fn with_loading_indicator(mut self, indicator: Box<dyn LoadingIndicator>) -> Self {
        self.loading = Some(indicator);
        self
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Build the map. Nothing is fetched until [`Map::start_loading`].
    pub fn build(self) -> Result<Map> {
        let config = self.config;
        config.validate()?;

        let mut view = View::new(config.view.center(), config.view.zoom, self.size);
        view.set_zoom_limits(config.view.min_zoom, config.view.max_zoom);

        let fetcher = self.fetcher.unwrap_or_else(|| Arc::new(DefaultFetcher));
        let mut map = Map::new(view, fetcher);
        let cache = TileCache::new(config.tile_cache_size);
        map.set_tile_cache(cache.clone());
        if let Some(indicator) = self.loading {
            map.set_loading_indicator(indicator);
        }

        let mut base = TileLayer::from_config(
            OSM_LAYER_ID.to_string(),
            "OpenStreetMap".to_string(),
            &config.base_layer,
        )
        .with_cache(cache.clone());
        base.set_z_index(0);
        map.add_layer(Box::new(base))?;

        let mut historical = TileLayer::from_config(
            HISTORICAL_LAYER_ID.to_string(),
            "Montmorillon 1840".to_string(),
            &config.historical_layer,
        )
        .with_cache(cache);
        historical.set_z_index(1);
        map.add_layer(Box::new(historical))?;

        let source = VectorSource::with_url(config.overlay_url(), config.overlay.data_projection);
        let mut overlay = VectorLayer::with_source(
            OVERLAY_LAYER_ID.to_string(),
            "Land use".to_string(),
            source,
        )
        .with_style_function(resolve_style)
        .with_attribution(config.overlay.attribution.clone());
        overlay.set_opacity(config.overlay.opacity);
        overlay.set_z_index(2);
        map.add_layer(Box::new(overlay))?;

        map.add_layer(Box::new(position_layer()))?;

        let geolocation = match self.position_provider {
            Some(provider) => Geolocation::new(
                provider,
                TrackingOptions {
                    enable_high_accuracy: config.geolocation.enable_high_accuracy,
                    ..TrackingOptions::default()
                },
            ),
            None => Geolocation::from_config(&config.geolocation),
        };
        map.set_geolocation(
            geolocation,
            Some(POSITION_LAYER_ID.to_string()),
            config.geolocation.tracking,
        );

        fit_on_first_load(&mut map, OVERLAY_LAYER_ID, Padding::uniform(config.view.fit_padding));
        hide_loading_on_first_render(&mut map);

        log::debug!("map built with layers {:?}", map.list_layers());
        Ok(map)
    }
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Layer holding the accuracy circle and the position marker, drawn last
fn position_layer() -> VectorLayer {
    let mut layer = VectorLayer::new(POSITION_LAYER_ID.to_string(), "Position".to_string());
    layer.set_z_index(3);

    let source = layer.source_mut();
    source.add_feature(Feature::empty().with_id(serde_json::Value::from(ACCURACY_FEATURE_ID)));
    let mut position = Feature::empty().with_id(serde_json::Value::from(POSITION_FEATURE_ID));
    position.set_style(Some(position_style()));
    source.add_feature(position);
    layer
}
