pub mod controls;

#[cfg(feature = "egui")]
pub mod widget;

pub use controls::{Attribution, LoadingFlag, LoadingIndicator};

#[cfg(feature = "egui")]
pub use widget::MapWidget;
