pub mod cache;
pub mod entry;
pub mod fetcher;
pub mod loader;
pub mod source;
pub mod tile_set;

// Re-exports for convenience
pub use cache::TileCache;
pub use entry::{CacheEntry, EntrySnapshot, LoadState};
pub use fetcher::{HttpFetcher, TileFetcher};
pub use loader::{LoadCompletion, TileLoader, WakeHook};
pub use source::{OpenStreetMapSource, TemplateSource, TileSource};
pub use tile_set::{Tile, TileSet, TileSetCalculator, Zooming};
