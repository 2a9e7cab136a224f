use crate::core::geo::Coordinate;
use crate::core::map::Map;
use crate::core::viewport::View;
use crate::input::events::{EventKind, InputEvent, MapEvent};
use crate::prelude::{HashMap, VecDeque};

/// Event listener callback type
pub type EventCallback = Box<dyn Fn(&MapEvent) + Send + Sync>;

/// One-shot hook run with mutable access to the map
pub type OnceCallback = Box<dyn FnOnce(&mut Map, &MapEvent) + Send>;

struct OnceHook {
    matches: Box<dyn Fn(&MapEvent) -> bool + Send + Sync>,
    callback: OnceCallback,
}

/// Event management system for the map.
///
/// Persistent listeners observe every event of their kind. One-shot hooks
/// are removed from the manager before they run, so each fires at most once
/// even when the hook itself emits further events.
#[derive(Default)]
pub struct EventManager {
    listeners: HashMap<EventKind, Vec<EventCallback>>,
    once_hooks: Vec<OnceHook>,
    event_queue: VecDeque<MapEvent>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persistent event listener
    pub fn on<F>(&mut self, kind: EventKind, callback: F)
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.listeners.entry(kind).or_default().push(Box::new(callback));
    }

    /// Register a hook for the next event of `kind`
    pub fn once<F>(&mut self, kind: EventKind, callback: F)
    where
        F: FnOnce(&mut Map, &MapEvent) + Send + 'static,
    {
        self.once_matching(move |event| event.kind() == kind, callback);
    }

    /// Register a hook for the next event accepted by `matches`
    pub fn once_matching<P, F>(&mut self, matches: P, callback: F)
    where
        P: Fn(&MapEvent) -> bool + Send + Sync + 'static,
        F: FnOnce(&mut Map, &MapEvent) + Send + 'static,
    {
        self.once_hooks.push(OnceHook {
            matches: Box::new(matches),
            callback: Box::new(callback),
        });
    }

    /// Emit an event to the queue
    pub fn emit(&mut self, event: MapEvent) {
        self.event_queue.push_back(event);
    }

    /// Pop the next queued event
    pub fn next_event(&mut self) -> Option<MapEvent> {
        self.event_queue.pop_front()
    }

    /// Run the persistent listeners registered for the event's kind
    pub fn notify(&self, event: &MapEvent) {
        if let Some(callbacks) = self.listeners.get(&event.kind()) {
            for callback in callbacks {
                callback(event);
            }
        }
    }

    /// Remove and return the one-shot hooks that accept `event`
    pub fn take_once(&mut self, event: &MapEvent) -> Vec<OnceCallback> {
        let (ready, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.once_hooks)
            .into_iter()
            .partition(|hook| (hook.matches)(event));
        self.once_hooks = pending;
        ready.into_iter().map(|hook| hook.callback).collect()
    }

    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }

    /// Number of one-shot hooks that have not fired yet
    pub fn pending_hooks(&self) -> usize {
        self.once_hooks.len()
    }
}

/// Translates pointer input into view changes
#[derive(Debug, Clone)]
pub struct InputHandler {
    pub enabled: bool,
    pub pan_on_drag: bool,
    pub zoom_on_wheel: bool,
    /// Zoom levels per scroll unit
    pub wheel_zoom_rate: f64,
}

impl InputHandler {
    pub fn new() -> Self {
        Self {
            enabled: true,
            pan_on_drag: true,
            zoom_on_wheel: true,
            wheel_zoom_rate: 1.0 / 120.0,
        }
    }

    /// Applies an input event to the view; returns whether the view changed
    pub fn handle_event(&self, event: &InputEvent, view: &mut View) -> bool {
        if !self.enabled {
            return false;
        }

        match event {
            InputEvent::Drag { delta } if self.pan_on_drag => {
                if delta.x == 0.0 && delta.y == 0.0 {
                    return false;
                }
                view.pan(*delta);
                true
            }
            InputEvent::Scroll { delta, position } if self.zoom_on_wheel => {
                let before = view.zoom;
                view.zoom_to(before + delta * self.wheel_zoom_rate, Some(*position));
                (view.zoom - before).abs() > f64::EPSILON
            }
            InputEvent::Resize { width, height } => {
                let size = crate::core::geo::Size::new(*width, *height);
                if view.size == size {
                    return false;
                }
                view.set_size(size);
                true
            }
            _ => false,
        }
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Pixel under which a scroll zoom is anchored when the pointer position is unknown
pub fn view_center_pixel(view: &View) -> Coordinate {
    Coordinate::new(view.size.width / 2.0, view.size.height / 2.0)
}
