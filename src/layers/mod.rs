pub mod base;
pub mod macros;
pub mod manager;
pub mod tile;
pub mod vector;

pub use base::{LayerProperties, LayerTrait, LayerType};
pub use manager::LayerManager;
pub use tile::{TileLayer, TileRequest, TileState};
pub use vector::{SourceState, StyleFunction, VectorLayer, VectorSource};
