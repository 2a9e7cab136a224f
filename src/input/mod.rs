pub mod events;
pub mod handler;

// Re-export the essential types
pub use events::{EventKind, InputEvent, MapEvent};
pub use handler::{EventCallback, EventManager, InputHandler, OnceCallback};
