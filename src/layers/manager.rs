use crate::core::viewport::View;
use crate::layers::base::LayerTrait;
use crate::prelude::HashMap;
use crate::rendering::context::RenderContext;
use crate::{MapError, Result};

/// Manages layers for the map, handling ordering and rendering
pub struct LayerManager {
    /// All layers indexed by ID
    layers: HashMap<String, Box<dyn LayerTrait>>,
    /// Ordered list of layer IDs for rendering (sorted by z-index)
    render_order: Vec<String>,
}

impl LayerManager {
    pub fn new() -> Self {
        Self {
            layers: HashMap::default(),
            render_order: Vec::new(),
        }
    }

    /// Adds a layer above every layer with the same or lower z-index
    pub fn add_layer(&mut self, layer: Box<dyn LayerTrait>) -> Result<()> {
        let layer_id = layer.id().to_string();
        if self.layers.contains_key(&layer_id) {
            return Err(MapError::Layer(format!("layer {} already exists", layer_id)));
        }
        let z_index = layer.z_index();

        self.layers.insert(layer_id.clone(), layer);

        let insert_pos = self
            .render_order
            .iter()
            .position(|id| {
                self.layers
                    .get(id)
                    .map(|l| l.z_index() > z_index)
                    .unwrap_or(false)
            })
            .unwrap_or(self.render_order.len());

        self.render_order.insert(insert_pos, layer_id);
        Ok(())
    }

    pub fn remove_layer(&mut self, layer_id: &str) -> Option<Box<dyn LayerTrait>> {
        self.render_order.retain(|id| id != layer_id);
        self.layers.remove(layer_id)
    }

    pub fn get_layer(&self, layer_id: &str) -> Option<&dyn LayerTrait> {
        self.layers.get(layer_id).map(|l| l.as_ref())
    }

    /// Applies a function to a specific layer mutably
    pub fn with_layer_mut<F, R>(&mut self, layer_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut dyn LayerTrait) -> R,
    {
        self.layers.get_mut(layer_id).map(|layer| f(layer.as_mut()))
    }

    /// Downcasts a layer to its concrete type
    pub fn get_as<T: 'static>(&self, layer_id: &str) -> Option<&T> {
        self.layers.get(layer_id)?.as_any().downcast_ref::<T>()
    }

    /// Downcasts a layer to its concrete type, mutably
    pub fn get_as_mut<T: 'static>(&mut self, layer_id: &str) -> Option<&mut T> {
        self.layers.get_mut(layer_id)?.as_any_mut().downcast_mut::<T>()
    }

    /// Layer ids, bottom to top
    pub fn list_layers(&self) -> Vec<String> {
        self.render_order.clone()
    }

    /// Gets all layers in render order
    pub fn layers(&self) -> Vec<&dyn LayerTrait> {
        self.render_order
            .iter()
            .filter_map(|id| self.layers.get(id).map(|l| l.as_ref()))
            .collect()
    }

    /// Applies a function to each layer mutably in render order
    pub fn for_each_layer_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut dyn LayerTrait),
    {
        for id in &self.render_order {
            if let Some(layer) = self.layers.get_mut(id) {
                f(layer.as_mut());
            }
        }
    }

    /// Renders all visible layers, bottom to top
    pub fn render(&mut self, context: &mut RenderContext, view: &View) -> Result<()> {
        let visible_extent = view.calculate_extent();

        for layer_id in &self.render_order {
            if let Some(layer) = self.layers.get_mut(layer_id) {
                if layer.is_visible() && layer.intersects_extent(&visible_extent) {
                    // Keep drawing the remaining layers.
                    if let Err(e) = layer.render(context, view) {
                        log::warn!("layer {} failed to render: {}", layer_id, e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Updates the render order based on current z-indices
    pub fn update_render_order(&mut self) {
        let layers = &self.layers;
        self.render_order
            .sort_by_key(|id| layers.get(id).map(|l| l.z_index()).unwrap_or(0));
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::vector::VectorLayer;

    fn layer(id: &str, z_index: i32) -> Box<dyn LayerTrait> {
        let mut layer = VectorLayer::new(id.to_string(), id.to_string());
        layer.set_z_index(z_index);
        Box::new(layer)
    }

    #[test]
    fn test_render_order_follows_z_index() {
        let mut manager = LayerManager::new();
        manager.add_layer(layer("top", 3)).unwrap();
        manager.add_layer(layer("bottom", 0)).unwrap();
        manager.add_layer(layer("middle", 1)).unwrap();
        manager.add_layer(layer("middle-2", 1)).unwrap();

        assert_eq!(manager.list_layers(), vec!["bottom", "middle", "middle-2", "top"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut manager = LayerManager::new();
        manager.add_layer(layer("osm", 0)).unwrap();
        assert!(matches!(manager.add_layer(layer("osm", 1)), Err(MapError::Layer(_))));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_downcast_and_remove() {
        let mut manager = LayerManager::new();
        manager.add_layer(layer("merged", 2)).unwrap();
        assert!(manager.get_as::<VectorLayer>("merged").is_some());
        assert!(manager.get_as_mut::<VectorLayer>("missing").is_none());

        manager.with_layer_mut("merged", |layer| layer.set_z_index(-1));
        manager.update_render_order();
        assert!(manager.remove_layer("merged").is_some());
        assert!(manager.is_empty());
        assert!(manager.list_layers().is_empty());
    }
}
