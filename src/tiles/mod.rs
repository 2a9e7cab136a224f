pub mod cache;
pub mod grid;
pub mod loader;
pub mod source;

// Re-exports for convenience
pub use cache::{TileCache, TileKey};
pub use grid::{tiles_for_extent, TileRange};
pub use loader::{DefaultFetcher, FetchResult, Fetcher, FileFetcher, HttpFetcher, TileLoader};
pub use source::{OpenStreetMapSource, TileSource, XyzSource};
