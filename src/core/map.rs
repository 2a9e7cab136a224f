use crate::{
    core::{
        geo::{Coordinate, Extent, Size},
        viewport::{Padding, View},
    },
    data::feature::Feature,
    geolocation::Geolocation,
    input::{EventKind, EventManager, InputEvent, InputHandler, MapEvent},
    layers::{
        base::LayerTrait,
        manager::LayerManager,
        tile::{TileLayer, TileRequest},
        vector::{SourceState, VectorLayer},
    },
    rendering::context::RenderContext,
    tiles::{
        cache::TileCache,
        loader::{FetchResult, Fetcher, TileLoader},
    },
    ui::controls::{LoadingFlag, LoadingIndicator},
    Result,
};
use geo_types::{Geometry, Point};
use std::sync::Arc;

/// Id of the feature marking the current position in the position layer
pub const POSITION_FEATURE_ID: &str = "position";
/// Id of the feature drawing the accuracy circle in the position layer
pub const ACCURACY_FEATURE_ID: &str = "accuracy";

/// The map: view, layers, events and the background loaders feeding them.
///
/// All state lives on the thread that owns the map. Fetches and sensor
/// updates run elsewhere and are applied by [`Map::update`]; events they
/// produce are dispatched by [`Map::process_events`].
pub struct Map {
    pub view: View,
    initial_view: View,
    layer_manager: LayerManager,
    event_manager: EventManager,
    input_handler: InputHandler,
    loader: TileLoader,
    tile_cache: TileCache,
    geolocation: Option<Geolocation>,
    position_layer: Option<String>,
    track_position: bool,
    loading: Box<dyn LoadingIndicator>,
    frame: u64,
}

impl Map {
    pub fn new(view: View, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            initial_view: view.clone(),
            view,
            layer_manager: LayerManager::new(),
            event_manager: EventManager::new(),
            input_handler: InputHandler::new(),
            loader: TileLoader::new(fetcher),
            tile_cache: TileCache::default(),
            geolocation: None,
            position_layer: None,
            track_position: false,
            loading: Box::new(LoadingFlag::new()),
            frame: 0,
        }
    }

    pub(crate) fn set_tile_cache(&mut self, cache: TileCache) {
        self.tile_cache = cache;
    }

    /// Cache shared by the tile layers of this map
    pub fn tile_cache(&self) -> &TileCache {
        &self.tile_cache
    }

    /// Sets the element hidden after the first render
    pub fn set_loading_indicator(&mut self, indicator: Box<dyn LoadingIndicator>) {
        self.loading = indicator;
    }

    pub fn loading_indicator(&self) -> &dyn LoadingIndicator {
        self.loading.as_ref()
    }

    pub fn hide_loading(&mut self) {
        self.loading.hide();
    }

    /// Attaches a position source. `layer_id` names the vector layer holding
    /// the position and accuracy features; tracking starts with
    /// [`Map::start_loading`] when `track` is set.
    pub fn set_geolocation(&mut self, geolocation: Geolocation, layer_id: Option<String>, track: bool) {
        self.geolocation = Some(geolocation);
        self.position_layer = layer_id;
        self.track_position = track;
    }

    pub fn geolocation(&self) -> Option<&Geolocation> {
        self.geolocation.as_ref()
    }

    pub fn geolocation_mut(&mut self) -> Option<&mut Geolocation> {
        self.geolocation.as_mut()
    }

    /// View the map was created with; kept when fitting is skipped
    pub fn initial_view(&self) -> &View {
        &self.initial_view
    }

    /// Number of completed render passes
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn add_layer(&mut self, layer: Box<dyn LayerTrait>) -> Result<()> {
        let layer_id = layer.id().to_string();
        self.layer_manager.add_layer(layer)?;
        self.event_manager.emit(MapEvent::LayerAdd { layer_id });
        Ok(())
    }

    pub fn remove_layer(&mut self, layer_id: &str) -> Option<Box<dyn LayerTrait>> {
        let removed = self.layer_manager.remove_layer(layer_id);
        if removed.is_some() {
            self.event_manager.emit(MapEvent::LayerRemove {
                layer_id: layer_id.to_string(),
            });
        }
        removed
    }

    pub fn get_layer(&self, layer_id: &str) -> Option<&dyn LayerTrait> {
        self.layer_manager.get_layer(layer_id)
    }

    pub fn with_layer_mut<F, R>(&mut self, layer_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut dyn LayerTrait) -> R,
    {
        self.layer_manager.with_layer_mut(layer_id, f)
    }

    pub fn layer_as<T: 'static>(&self, layer_id: &str) -> Option<&T> {
        self.layer_manager.get_as::<T>(layer_id)
    }

    pub fn layer_as_mut<T: 'static>(&mut self, layer_id: &str) -> Option<&mut T> {
        self.layer_manager.get_as_mut::<T>(layer_id)
    }

    /// Layer ids, bottom to top
    pub fn list_layers(&self) -> Vec<String> {
        self.layer_manager.list_layers()
    }

    /// Layers, bottom to top
    pub fn layers(&self) -> Vec<&dyn LayerTrait> {
        self.layer_manager.layers()
    }

    /// Register a persistent listener
    pub fn on<F>(&mut self, kind: EventKind, callback: F)
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.event_manager.on(kind, callback);
    }

    /// Register a hook that runs for the next event of `kind` only
    pub fn once<F>(&mut self, kind: EventKind, callback: F)
    where
        F: FnOnce(&mut Map, &MapEvent) + Send + 'static,
    {
        self.event_manager.once(kind, callback);
    }

    /// Register a hook that runs for the next event accepted by `matches` only
    pub fn once_matching<P, F>(&mut self, matches: P, callback: F)
    where
        P: Fn(&MapEvent) -> bool + Send + Sync + 'static,
        F: FnOnce(&mut Map, &MapEvent) + Send + 'static,
    {
        self.event_manager.once_matching(matches, callback);
    }

    pub fn events(&self) -> &EventManager {
        &self.event_manager
    }

    pub fn emit(&mut self, event: MapEvent) {
        self.event_manager.emit(event);
    }

    /// Dispatches queued events to listeners and hooks, including events
    /// emitted while dispatching. Returns the dispatched events.
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        let mut processed = Vec::new();
        while let Some(event) = self.event_manager.next_event() {
            self.event_manager.notify(&event);
            for hook in self.event_manager.take_once(&event) {
                hook(self, &event);
            }
            processed.push(event);
        }
        processed
    }

    /// Starts fetching the data of every vector layer with a remote source
    /// and starts position tracking when requested
    pub fn start_loading(&mut self) -> Result<()> {
        let mut requests = Vec::new();
        for layer_id in self.layer_manager.list_layers() {
            if let Some(layer) = self.layer_manager.get_as_mut::<VectorLayer>(&layer_id) {
                if let Some(url) = layer.source_mut().begin_load() {
                    requests.push((layer_id, url));
                }
            }
        }
        for (layer_id, url) in requests {
            if let Err(e) = self.loader.request_resource(&layer_id, url) {
                log::warn!("could not start loading {}: {}", layer_id, e);
                self.apply_fetch_result(FetchResult::Resource {
                    layer_id,
                    url: String::new(),
                    result: Err(e),
                });
            }
        }

        if self.track_position {
            if let Some(geolocation) = self.geolocation.as_mut() {
                if let Err(e) = geolocation.set_tracking(true) {
                    log::info!("geolocation unavailable: {}", e);
                }
            }
        }
        Ok(())
    }

    /// Applies finished fetches and sensor updates, requests the tiles the
    /// current view needs and dispatches the resulting events.
    ///
    /// Returns whether anything changed that needs a repaint.
    pub fn update(&mut self) -> Result<bool> {
        let mut changed = false;

        for result in self.loader.drain() {
            self.apply_fetch_result(result);
            changed = true;
        }

        if let Some(geolocation) = self.geolocation.as_mut() {
            let events = geolocation.poll();
            if !events.is_empty() {
                self.sync_position_features();
                for event in events {
                    self.event_manager.emit(event);
                }
                changed = true;
            }
        }

        self.request_tiles();
        changed |= !self.process_events().is_empty();
        Ok(changed)
    }

    /// Applies a single finished fetch to its layer
    pub fn apply_fetch_result(&mut self, result: FetchResult) {
        match result {
            FetchResult::Tile {
                layer_id,
                coord,
                result,
            } => {
                let Some(layer) = self.layer_manager.get_as_mut::<TileLayer>(&layer_id) else {
                    return;
                };
                match result {
                    Ok(data) => {
                        layer.tile_loaded(coord, data);
                        self.event_manager.emit(MapEvent::TileLoadEnd { layer_id, coord });
                    }
                    Err(e) => {
                        log::debug!("tile {} of {} left empty: {}", coord, layer_id, e);
                        layer.tile_failed(coord);
                        self.event_manager.emit(MapEvent::TileLoadError {
                            layer_id,
                            coord,
                            message: e.to_string(),
                        });
                    }
                }
            }
            FetchResult::Resource {
                layer_id, result, ..
            } => {
                let Some(layer) = self.layer_manager.get_as_mut::<VectorLayer>(&layer_id) else {
                    return;
                };
                let state = layer.source_mut().finish_load(result);
                self.event_manager.emit(MapEvent::SourceChange { layer_id, state });
            }
        }
    }

    fn request_tiles(&mut self) {
        let mut requests: Vec<TileRequest> = Vec::new();
        let view = &self.view;
        self.layer_manager.for_each_layer_mut(|layer| {
            if layer.is_visible() {
                requests.extend(layer.request_tiles(view));
            }
        });

        for TileRequest { layer_id, coord, url } in requests {
            match self.loader.request_tile(&layer_id, coord, url) {
                Ok(()) => self.event_manager.emit(MapEvent::TileLoadStart { layer_id, coord }),
                Err(e) => self.apply_fetch_result(FetchResult::Tile {
                    layer_id,
                    coord,
                    result: Err(e),
                }),
            }
        }
    }

    /// Copies the tracked position and accuracy into the position layer
    fn sync_position_features(&mut self) {
        let (Some(geolocation), Some(layer_id)) = (&self.geolocation, &self.position_layer) else {
            return;
        };
        let position = geolocation
            .position()
            .map(|p| Geometry::Point(Point::new(p.x, p.y)));
        let accuracy = geolocation.accuracy_geometry().cloned().map(Geometry::Polygon);

        if let Some(layer) = self.layer_manager.get_as_mut::<VectorLayer>(layer_id) {
            let source = layer.source_mut();
            for (id, geometry) in [(POSITION_FEATURE_ID, position), (ACCURACY_FEATURE_ID, accuracy)] {
                match source.feature_by_id_mut(id) {
                    Some(feature) => feature.set_geometry(geometry),
                    None => {
                        let mut feature = Feature::empty().with_id(serde_json::Value::from(id));
                        feature.set_geometry(geometry);
                        source.add_feature(feature);
                    }
                }
            }
        }
    }

    /// Renders every visible layer into `context` and emits `PostRender`
    pub fn render(&mut self, context: &mut RenderContext) -> Result<()> {
        context.begin_frame();
        let (width, height) = (self.view.size.width as u32, self.view.size.height as u32);
        if context.width != width || context.height != height {
            context.resize(width, height);
        }
        self.layer_manager.render(context, &self.view)?;

        self.frame += 1;
        self.event_manager.emit(MapEvent::PostRender { frame: self.frame });
        self.process_events();
        Ok(())
    }

    pub fn set_size(&mut self, size: Size) {
        self.view.set_size(size);
    }

    pub fn set_view(&mut self, center: Coordinate, zoom: f64) {
        let before = self.view.clone();
        self.view.set_center(center);
        self.view.set_zoom(zoom);
        self.view_changed(&before);
    }

    /// Pans by a pixel delta
    pub fn pan(&mut self, delta: Coordinate) {
        let before = self.view.clone();
        self.view.pan(delta);
        self.view_changed(&before);
    }

    pub fn zoom_to(&mut self, zoom: f64, anchor: Option<Coordinate>) {
        let before = self.view.clone();
        self.view.zoom_to(zoom, anchor);
        self.view_changed(&before);
    }

    /// Fits the view to `extent` with `padding` pixels free on each side
    pub fn fit_extent(&mut self, extent: &Extent, padding: Padding) -> bool {
        let before = self.view.clone();
        let fitted = self.view.fit(extent, padding);
        self.view_changed(&before);
        fitted
    }

    /// Fits the view to the features of a vector layer. Returns `false` and
    /// keeps the current view when the layer has no feature to fit.
    pub fn fit_layer(&mut self, layer_id: &str, padding: Padding) -> bool {
        let extent = self
            .layer_as::<VectorLayer>(layer_id)
            .filter(|layer| layer.source().feature_count() > 0)
            .and_then(|layer| layer.source().extent());
        match extent {
            Some(extent) => self.fit_extent(&extent, padding),
            None => false,
        }
    }

    /// Applies pointer input; returns whether the view changed
    pub fn handle_input(&mut self, input: &InputEvent) -> bool {
        let before = self.view.clone();
        let changed = self.input_handler.handle_event(input, &mut self.view);
        if changed {
            self.view_changed(&before);
        }
        changed
    }

    pub fn input_handler_mut(&mut self) -> &mut InputHandler {
        &mut self.input_handler
    }

    fn view_changed(&mut self, before: &View) {
        if self.view.center != before.center || self.view.zoom != before.zoom {
            self.event_manager.emit(MapEvent::ViewChanged {
                center: self.view.center,
                zoom: self.view.zoom,
            });
        }
    }
}

/// Registers the hook fitting the view to the first successful load of a
/// vector layer. Fires once: an error, an empty collection or a second load
/// leave the view alone.
pub fn fit_on_first_load(map: &mut Map, layer_id: &str, padding: Padding) {
    let watched = layer_id.to_string();
    let target = layer_id.to_string();
    map.once_matching(
        move |event| {
            matches!(event, MapEvent::SourceChange { layer_id, .. } if *layer_id == watched)
        },
        move |map, event| {
            if !matches!(event, MapEvent::SourceChange { state: SourceState::Ready, .. }) {
                log::warn!("{} did not load, keeping the initial view", target);
                return;
            }
            if map.fit_layer(&target, padding) {
                log::debug!("view fitted to {}: zoom {:.2}", target, map.view.zoom);
            } else {
                log::warn!("{} has no features to fit, keeping the initial view", target);
            }
        },
    );
}

/// Registers the hook hiding the loading indicator after the first render
pub fn hide_loading_on_first_render(map: &mut Map) {
    map.once(EventKind::PostRender, |map, _| map.hide_loading());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::context::DrawCommand;
    use crate::tiles::loader::Fetcher;
    use crate::MapError;
    use async_trait::async_trait;

    struct NoFetch;

    #[async_trait]
    impl Fetcher for NoFetch {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(MapError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    fn map() -> Map {
        let view = View::new(Coordinate::new(0.0, 0.0), 12.0, Size::new(800.0, 600.0));
        Map::new(view, Arc::new(NoFetch))
    }

    fn resource(layer_id: &str, body: &str) -> FetchResult {
        FetchResult::Resource {
            layer_id: layer_id.to_string(),
            url: "merged.geojson".to_string(),
            result: Ok(body.as_bytes().to_vec()),
        }
    }

    fn with_overlay(map: &mut Map) {
        let source = crate::layers::vector::VectorSource::with_url(
            "merged.geojson",
            crate::core::config::DataProjection::WebMercator,
        );
        map.add_layer(Box::new(VectorLayer::with_source(
            "merged".to_string(),
            "Merged".to_string(),
            source,
        )))
        .unwrap();
    }

    const ONE_SQUARE: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"class": "built"},
         "geometry": {"type": "Polygon", "coordinates": [[[1000, 1000], [3000, 1000], [3000, 2000], [1000, 1000]]]}}
    ]}"#;

    #[test]
    fn test_hooks_run_with_map_access() {
        let mut map = map();
        hide_loading_on_first_render(&mut map);
        assert!(map.loading_indicator().is_visible());

        let mut context = RenderContext::new(800, 600);
        map.render(&mut context).unwrap();
        assert!(!map.loading_indicator().is_visible());
        assert_eq!(map.frame_count(), 1);
        assert_eq!(map.events().pending_hooks(), 0);
    }

    #[test]
    fn test_fit_on_first_load() {
        let mut map = map();
        with_overlay(&mut map);
        fit_on_first_load(&mut map, "merged", Padding::uniform(50.0));
        map.process_events();

        map.apply_fetch_result(resource("merged", ONE_SQUARE));
        let events = map.process_events();
        assert!(events.contains(&MapEvent::SourceChange {
            layer_id: "merged".to_string(),
            state: SourceState::Ready,
        }));
        assert_eq!(map.view.center, Coordinate::new(2000.0, 1500.0));
        assert!(events.iter().any(|e| e.kind() == EventKind::ViewChanged));
    }

    #[test]
    fn test_empty_collection_keeps_view() {
        let mut map = map();
        with_overlay(&mut map);
        fit_on_first_load(&mut map, "merged", Padding::uniform(50.0));

        map.apply_fetch_result(resource(
            "merged",
            r#"{"type": "FeatureCollection", "features": []}"#,
        ));
        map.process_events();
        assert_eq!(&map.view, map.initial_view());
        assert_eq!(map.events().pending_hooks(), 0);
    }

    /// Layer that queues a point, or a tile with empty bounds when `broken`
    struct StubLayer {
        properties: crate::layers::base::LayerProperties,
        broken: bool,
    }

    impl StubLayer {
        fn boxed(id: &str, z_index: i32, broken: bool) -> Box<dyn LayerTrait> {
            let mut properties = crate::layers::base::LayerProperties::new(
                id.to_string(),
                id.to_string(),
                crate::layers::base::LayerType::Tile,
            );
            properties.z_index = z_index;
            Box::new(Self { properties, broken })
        }
    }

    impl LayerTrait for StubLayer {
        crate::impl_layer_trait!(StubLayer, properties);

        fn render(&mut self, context: &mut RenderContext, _view: &View) -> Result<()> {
            let corner = Coordinate::new(10.0, 10.0);
            if self.broken {
                return context.render_tile(
                    Arc::from(self.properties.id.as_str()),
                    crate::core::geo::TileCoord::new(0, 0, 0),
                    Arc::new(Vec::new()),
                    (corner, corner),
                    1.0,
                );
            }
            context.render_point(&corner, &crate::rendering::context::PointRenderStyle {
                fill_color: crate::style::Color::WHITE,
                stroke_color: crate::style::Color::WHITE,
                stroke_width: 1.0,
                radius: 3.0,
                opacity: 1.0,
            });
            Ok(())
        }

        fn options(&self) -> serde_json::Value {
            crate::layers::base::properties_options(&self.properties)
        }
    }

    #[test]
    fn test_failing_layer_does_not_abort_frame() {
        let mut map = map();
        map.add_layer(StubLayer::boxed("broken", 0, true)).unwrap();
        map.add_layer(StubLayer::boxed("points", 1, false)).unwrap();
        hide_loading_on_first_render(&mut map);

        let mut context = RenderContext::new(800, 600);
        map.render(&mut context).unwrap();

        assert_eq!(context.get_drawing_queue().len(), 1);
        assert!(matches!(context.get_drawing_queue()[0], DrawCommand::Point { .. }));
        assert_eq!(map.frame_count(), 1);
        assert!(!map.loading_indicator().is_visible());
    }

    #[test]
    fn test_view_changes_are_reported() {
        let mut map = map();
        map.pan(Coordinate::new(0.0, 0.0));
        assert!(map.process_events().is_empty());

        map.zoom_to(13.0, None);
        assert_eq!(
            map.process_events(),
            vec![MapEvent::ViewChanged {
                center: Coordinate::new(0.0, 0.0),
                zoom: 13.0
            }]
        );
    }

    #[test]
    fn test_layer_add_and_remove_events() {
        let mut map = map();
        with_overlay(&mut map);
        assert!(map.remove_layer("merged").is_some());
        assert!(map.remove_layer("merged").is_none());
        let kinds: Vec<EventKind> = map.process_events().iter().map(MapEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::LayerAdd, EventKind::LayerRemove]);
    }
}
