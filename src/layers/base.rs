use crate::core::geo::Extent;
use crate::core::viewport::View;
use crate::layers::tile::TileRequest;
use crate::rendering::context::RenderContext;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerType {
    Tile,
    Vector,
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerType::Tile => write!(f, "tile"),
            LayerType::Vector => write!(f, "vector"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerProperties {
    pub id: String,
    pub name: String,
    pub layer_type: LayerType,
    pub z_index: i32,
    pub opacity: f32,
    pub visible: bool,
    /// Credit shown by the attribution control while the layer is visible
    pub attribution: Option<String>,
}

impl LayerProperties {
    pub fn new(id: String, name: String, layer_type: LayerType) -> Self {
        Self {
            id,
            name,
            layer_type,
            z_index: 0,
            opacity: 1.0,
            visible: true,
            attribution: None,
        }
    }
}

/// JSON view of the properties shared by every layer
pub fn properties_options(properties: &LayerProperties) -> serde_json::Value {
    serde_json::json!({
        "id": properties.id,
        "name": properties.name,
        "layer_type": properties.layer_type.to_string(),
        "z_index": properties.z_index,
        "opacity": properties.opacity,
        "visible": properties.visible,
        "attribution": properties.attribution,
    })
}

/// Common behaviour of every map layer
pub trait LayerTrait: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn layer_type(&self) -> LayerType;

    fn is_visible(&self) -> bool;

    fn set_visible(&mut self, visible: bool);

    /// Get layer opacity (0.0 to 1.0)
    fn opacity(&self) -> f32;

    fn set_opacity(&mut self, opacity: f32);

    /// Get layer z-index for ordering
    fn z_index(&self) -> i32;

    fn set_z_index(&mut self, z_index: i32);

    fn attribution(&self) -> Option<&str>;

    /// Push the draw commands of this layer for the current view
    fn render(&mut self, context: &mut RenderContext, view: &View) -> Result<()>;

    /// Tiles this layer needs for `view` that have not been requested yet
    fn request_tiles(&mut self, _view: &View) -> Vec<TileRequest> {
        Vec::new()
    }

    /// Get layer extent if applicable
    fn extent(&self) -> Option<Extent> {
        None
    }

    /// Check if layer intersects with the given extent
    fn intersects_extent(&self, extent: &Extent) -> bool {
        self.extent()
            .map_or(true, |layer_extent| layer_extent.intersects(extent))
    }

    /// Layer options as JSON, for diagnostics
    fn options(&self) -> serde_json::Value;

    /// Dynamic casting support
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_properties() {
        let props = LayerProperties::new(
            "merged".to_string(),
            "Merged".to_string(),
            LayerType::Vector,
        );

        assert_eq!(props.id, "merged");
        assert_eq!(props.layer_type, LayerType::Vector);
        assert_eq!(props.z_index, 0);
        assert_eq!(props.opacity, 1.0);
        assert!(props.visible);
        assert!(props.attribution.is_none());
    }

    #[test]
    fn test_layer_type_display() {
        assert_eq!(LayerType::Tile.to_string(), "tile");
        assert_eq!(LayerType::Vector.to_string(), "vector");
    }
}
