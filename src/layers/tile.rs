use crate::{
    core::{
        config::{Preload, TileLayerConfig},
        geo::{Coordinate, TileCoord},
        viewport::View,
    },
    impl_layer_trait,
    layers::base::{properties_options, LayerProperties, LayerTrait, LayerType},
    prelude::{HashMap, HashSet},
    rendering::context::RenderContext,
    tiles::{
        cache::{TileCache, TileKey},
        grid::tiles_for_extent,
        source::{TileSource, XyzSource},
    },
    Result,
};
use std::sync::Arc;

/// A tile the loader should fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    pub layer_id: String,
    pub coord: TileCoord,
    pub url: String,
}

/// Load state of a single tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Loading,
    Loaded,
    /// The fetch failed; the tile stays a gap and is not requested again
    Error,
}

/// A tile-based layer that displays raster tiles from an XYZ source.
///
/// The layer never fetches by itself: [`LayerTrait::request_tiles`] hands
/// the missing tiles of a view to the map, which drives the loader and
/// reports back through [`TileLayer::tile_loaded`] / [`TileLayer::tile_failed`].
pub struct TileLayer {
    properties: LayerProperties,
    key: Arc<str>,
    source: Box<dyn TileSource>,
    preload: Preload,
    cache: TileCache,
    tiles: HashMap<TileCoord, TileState>,
}

impl TileLayer {
    pub fn new(id: String, name: String, source: Box<dyn TileSource>) -> Self {
        let mut properties = LayerProperties::new(id.clone(), name, LayerType::Tile);
        if !source.attribution().is_empty() {
            properties.attribution = Some(source.attribution().to_string());
        }

        Self {
            properties,
            key: Arc::from(id),
            source,
            preload: Preload::default(),
            cache: TileCache::default(),
            tiles: HashMap::default(),
        }
    }

    /// Create a tile layer from its configuration
    pub fn from_config(id: String, name: String, config: &TileLayerConfig) -> Self {
        let mut layer = Self::new(id, name, Box::new(XyzSource::from_config(config)))
            .with_preload(config.preload);
        layer.set_opacity(config.opacity);
        layer
    }

    pub fn with_preload(mut self, preload: Preload) -> Self {
        self.preload = preload;
        self
    }

    /// Share a cache with other layers
    pub fn with_cache(mut self, cache: TileCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn source(&self) -> &dyn TileSource {
        self.source.as_ref()
    }

    pub fn preload(&self) -> Preload {
        self.preload
    }

    pub fn tile_state(&self, coord: &TileCoord) -> Option<TileState> {
        self.tiles.get(coord).copied()
    }

    /// Tile zoom levels needed for a view, coarsest first
    pub fn levels_for_view(&self, view: &View) -> Vec<u8> {
        let z = self.source.tile_zoom(view.zoom);
        let below = self.preload.levels_below(z - self.source.min_zoom());
        (z - below..=z).collect()
    }

    /// Tiles covering the view at every needed level, coarsest first
    pub fn tiles_for_view(&self, view: &View) -> Vec<TileCoord> {
        if view.size.is_empty() {
            return Vec::new();
        }
        let visible = view.calculate_extent();
        let envelope = self.source.extent();

        self.levels_for_view(view)
            .into_iter()
            .flat_map(|z| tiles_for_extent(&visible, z, envelope.as_ref()))
            .filter(|coord| self.source.covers(*coord))
            .collect()
    }

    /// Stores a fetched tile
    pub fn tile_loaded(&mut self, coord: TileCoord, data: Vec<u8>) {
        self.cache.insert(self.cache_key(coord), data);
        self.tiles.insert(coord, TileState::Loaded);
    }

    /// Marks a tile as failed; it will not be requested again
    pub fn tile_failed(&mut self, coord: TileCoord) {
        self.tiles.insert(coord, TileState::Error);
    }

    /// Number of tiles in each state, for diagnostics
    pub fn tile_counts(&self) -> (usize, usize, usize) {
        self.tiles.values().fold((0, 0, 0), |(loading, loaded, failed), state| match state {
            TileState::Loading => (loading + 1, loaded, failed),
            TileState::Loaded => (loading, loaded + 1, failed),
            TileState::Error => (loading, loaded, failed + 1),
        })
    }

    /// Forgets settled tiles outside `wanted`. Loaded bytes stay in the
    /// cache; in-flight tiles are kept until their result arrives.
    fn prune(&mut self, wanted: &[TileCoord]) {
        let wanted: HashSet<TileCoord> = wanted.iter().copied().collect();
        self.tiles
            .retain(|coord, state| *state == TileState::Loading || wanted.contains(coord));
    }

    fn cache_key(&self, coord: TileCoord) -> TileKey {
        TileKey::new(Arc::clone(&self.key), coord)
    }

    fn screen_bounds(view: &View, coord: &TileCoord) -> (Coordinate, Coordinate) {
        let extent = coord.extent();
        (
            view.coordinate_to_pixel(&Coordinate::new(extent.min_x, extent.max_y)),
            view.coordinate_to_pixel(&Coordinate::new(extent.max_x, extent.min_y)),
        )
    }
}

impl LayerTrait for TileLayer {
    impl_layer_trait!(TileLayer, properties);

    fn render(&mut self, context: &mut RenderContext, view: &View) -> Result<()> {
        let opacity = self.opacity();
        for coord in self.tiles_for_view(view) {
            if self.tile_state(&coord) != Some(TileState::Loaded) {
                continue;
            }
            match self.cache.get(&self.cache_key(coord)) {
                Some(data) => {
                    let bounds = Self::screen_bounds(view, &coord);
                    if let Err(e) = context.render_tile(Arc::clone(&self.key), coord, data, bounds, opacity) {
                        log::debug!("skipping tile {} of {}: {}", coord, self.key, e);
                    }
                }
                None => {
                    // Evicted from the cache: forget it so it is fetched again.
                    self.tiles.remove(&coord);
                }
            }
        }
        Ok(())
    }

    fn request_tiles(&mut self, view: &View) -> Vec<TileRequest> {
        let wanted = self.tiles_for_view(view);
        self.prune(&wanted);

        let mut requests = Vec::new();
        for coord in wanted {
            if self.tiles.contains_key(&coord) {
                continue;
            }
            if self.cache.contains(&self.cache_key(coord)) {
                self.tiles.insert(coord, TileState::Loaded);
                continue;
            }
            if let Some(url) = self.source.url(coord) {
                self.tiles.insert(coord, TileState::Loading);
                requests.push(TileRequest {
                    layer_id: self.properties.id.clone(),
                    coord,
                    url,
                });
            }
        }
        requests
    }

    fn extent(&self) -> Option<crate::core::geo::Extent> {
        self.source.extent()
    }

    fn options(&self) -> serde_json::Value {
        let mut options = properties_options(&self.properties);
        options["min_zoom"] = self.source.min_zoom().into();
        options["max_zoom"] = self.source.max_zoom().into();
        options["preload"] = serde_json::to_value(self.preload).unwrap_or_default();
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::{LonLat, Size};

    fn historical_layer() -> TileLayer {
        TileLayer::from_config(
            "montmorillon-1840".to_string(),
            "Montmorillon 1840".to_string(),
            &TileLayerConfig::historical(),
        )
    }

    fn view_at(center: Coordinate, zoom: f64) -> View {
        View::new(center, zoom, Size::new(800.0, 600.0))
    }

    #[test]
    fn test_requests_stay_inside_envelope() {
        let mut layer = historical_layer();
        let extent = layer.source().extent().unwrap();

        for zoom in [2.0, 9.0, 11.0, 14.3, 18.0, 21.0, 23.0, 28.0] {
            let view = view_at(extent.center(), zoom);
            for request in layer.request_tiles(&view) {
                assert!((11..=21).contains(&request.coord.z), "zoom {}", request.coord.z);
                assert!(extent.overlaps(&request.coord.extent()));
            }
        }
    }

    #[test]
    fn test_town_centre_gets_historical_tiles() {
        let mut layer = historical_layer();
        let town = LonLat::new(0.8706, 46.4264).to_mercator();
        assert!(layer.source().extent().unwrap().contains(&town));

        let requests = layer.request_tiles(&view_at(town, 15.0));
        assert!(requests.iter().any(|request| request.coord.z == 15));
        assert!(requests
            .iter()
            .all(|request| request.url.contains("/montmorillon-1840/")));
    }

    #[test]
    fn test_view_outside_extent_requests_nothing() {
        let mut layer = historical_layer();
        let view = view_at(Coordinate::new(-5_000_000.0, -5_000_000.0), 15.0);
        assert!(layer.request_tiles(&view).is_empty());
    }

    #[test]
    fn test_unbounded_preload_reaches_min_zoom() {
        let layer = historical_layer();
        let view = view_at(layer.source().extent().unwrap().center(), 15.0);
        assert_eq!(layer.levels_for_view(&view), (11..=15).collect::<Vec<u8>>());

        let osm = TileLayer::from_config(
            "osm".to_string(),
            "OpenStreetMap".to_string(),
            &TileLayerConfig::openstreetmap(),
        );
        assert_eq!(osm.levels_for_view(&view), vec![15]);
    }

    #[test]
    fn test_tiles_are_requested_once() {
        let mut layer = historical_layer();
        let view = view_at(layer.source().extent().unwrap().center(), 13.0);

        let first = layer.request_tiles(&view);
        assert!(!first.is_empty());
        assert!(layer.request_tiles(&view).is_empty());

        let failed = first[0].coord;
        layer.tile_failed(failed);
        assert_eq!(layer.tile_state(&failed), Some(TileState::Error));
        assert!(layer.request_tiles(&view).is_empty());
    }

    #[test]
    fn test_settled_tiles_are_forgotten_off_view() {
        let mut layer = historical_layer();
        let extent = layer.source().extent().unwrap();
        let here = view_at(Coordinate::new(extent.min_x + 500.0, extent.min_y + 500.0), 17.0);
        let there = view_at(Coordinate::new(extent.max_x - 500.0, extent.max_y - 500.0), 17.0);

        // Coarse preload levels are shared by both views; the finest are not.
        let finest: Vec<TileCoord> = layer
            .request_tiles(&here)
            .into_iter()
            .map(|request| request.coord)
            .filter(|coord| coord.z == 17)
            .collect();
        let (loaded, failed, in_flight) = (finest[0], finest[1], finest[2]);
        layer.tile_loaded(loaded, vec![1]);
        layer.tile_failed(failed);

        layer.request_tiles(&there);
        assert_eq!(layer.tile_state(&loaded), None);
        assert_eq!(layer.tile_state(&failed), None);
        assert_eq!(layer.tile_state(&in_flight), Some(TileState::Loading));

        // Coming back reuses the cached bytes instead of fetching again.
        let again = layer.request_tiles(&here);
        assert_eq!(layer.tile_state(&loaded), Some(TileState::Loaded));
        assert!(again.iter().all(|request| request.coord != loaded));
    }

    #[test]
    fn test_loaded_tiles_are_rendered() {
        let mut layer = historical_layer();
        layer.set_opacity(0.8);
        let view = view_at(layer.source().extent().unwrap().center(), 12.0);

        let requests = layer.request_tiles(&view);
        for request in &requests {
            layer.tile_loaded(request.coord, vec![1, 2, 3]);
        }

        let mut context = RenderContext::new(800, 600);
        layer.render(&mut context, &view).unwrap();
        assert_eq!(context.get_drawing_queue().len(), requests.len());
        assert_eq!(layer.tile_counts(), (0, requests.len(), 0));
    }

    #[test]
    fn test_attribution_from_source() {
        let layer = historical_layer();
        assert_eq!(
            layer.attribution(),
            Some("© Archives départementales des Deux-Sèvres et Vienne")
        );
        assert_eq!(layer.options()["preload"], serde_json::json!("unbounded"));
    }
}
