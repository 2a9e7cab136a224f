use crate::core::geo::{Coordinate, TileCoord};
use crate::layers::vector::SourceState;
use serde::{Deserialize, Serialize};

/// Pointer input forwarded by the host to the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Drag in progress, in pixels
    Drag { delta: Coordinate },
    /// Scroll wheel or pinch zoom; positive `delta` zooms in
    Scroll { delta: f64, position: Coordinate },
    /// Render target resize
    Resize { width: f64, height: f64 },
}

/// Map event types that can be emitted by the map
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// A render pass of the whole map completed
    PostRender { frame: u64 },
    /// A vector source settled into a new state
    SourceChange { layer_id: String, state: SourceState },
    TileLoadStart { layer_id: String, coord: TileCoord },
    TileLoadEnd { layer_id: String, coord: TileCoord },
    TileLoadError {
        layer_id: String,
        coord: TileCoord,
        message: String,
    },
    /// The tracked position changed; `None` when the fix carried no coordinates
    PositionChange { position: Option<Coordinate> },
    AccuracyGeometryChange,
    GeolocationError { message: String },
    /// Map view has changed (center or zoom)
    ViewChanged { center: Coordinate, zoom: f64 },
    LayerAdd { layer_id: String },
    LayerRemove { layer_id: String },
}

/// Discriminant of [`MapEvent`] used to register listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PostRender,
    SourceChange,
    TileLoadStart,
    TileLoadEnd,
    TileLoadError,
    PositionChange,
    AccuracyGeometryChange,
    GeolocationError,
    ViewChanged,
    LayerAdd,
    LayerRemove,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PostRender => "postrender",
            EventKind::SourceChange => "change",
            EventKind::TileLoadStart => "tileloadstart",
            EventKind::TileLoadEnd => "tileloadend",
            EventKind::TileLoadError => "tileloaderror",
            EventKind::PositionChange => "change:position",
            EventKind::AccuracyGeometryChange => "change:accuracyGeometry",
            EventKind::GeolocationError => "error",
            EventKind::ViewChanged => "viewchanged",
            EventKind::LayerAdd => "layeradd",
            EventKind::LayerRemove => "layerremove",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MapEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MapEvent::PostRender { .. } => EventKind::PostRender,
            MapEvent::SourceChange { .. } => EventKind::SourceChange,
            MapEvent::TileLoadStart { .. } => EventKind::TileLoadStart,
            MapEvent::TileLoadEnd { .. } => EventKind::TileLoadEnd,
            MapEvent::TileLoadError { .. } => EventKind::TileLoadError,
            MapEvent::PositionChange { .. } => EventKind::PositionChange,
            MapEvent::AccuracyGeometryChange => EventKind::AccuracyGeometryChange,
            MapEvent::GeolocationError { .. } => EventKind::GeolocationError,
            MapEvent::ViewChanged { .. } => EventKind::ViewChanged,
            MapEvent::LayerAdd { .. } => EventKind::LayerAdd,
            MapEvent::LayerRemove { .. } => EventKind::LayerRemove,
        }
    }

    /// Layer the event concerns, if any
    pub fn layer_id(&self) -> Option<&str> {
        match self {
            MapEvent::SourceChange { layer_id, .. }
            | MapEvent::TileLoadStart { layer_id, .. }
            | MapEvent::TileLoadEnd { layer_id, .. }
            | MapEvent::TileLoadError { layer_id, .. }
            | MapEvent::LayerAdd { layer_id }
            | MapEvent::LayerRemove { layer_id } => Some(layer_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind() {
        let event = MapEvent::SourceChange {
            layer_id: "merged".to_string(),
            state: SourceState::Ready,
        };
        assert_eq!(event.kind(), EventKind::SourceChange);
        assert_eq!(event.layer_id(), Some("merged"));
        assert_eq!(EventKind::PostRender.to_string(), "postrender");
        assert_eq!(MapEvent::PostRender { frame: 1 }.layer_id(), None);
    }
}
