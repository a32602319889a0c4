//! # tileview
//!
//! A slippy-map tile engine: Web Mercator projection math, viewport tile-set
//! computation, an LRU tile cache with cancellable loads, and a renderer that
//! composites loaded tiles onto any [`RenderSurface`](rendering::RenderSurface).
//!
//! The [`MapController`] owns the view and drives one or more renderers. Tile
//! fetches run on an [`AsyncSpawner`](runtime::AsyncSpawner) and report back
//! through a channel that the host drains on its control thread.

pub mod core;
pub mod input;
pub mod prelude;
pub mod rendering;
pub mod runtime;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    config::MapConfig,
    geo::{LatLng, Position, TileCoord, ViewportSize},
    map::{MapController, MapEvents},
    projection::ScaleMode,
};

pub use input::events::{InputEvent, KeyCode};

pub use rendering::{
    context::RecordingSurface, raster::RasterSurface, renderer::MapRenderer,
    renderer::TileRenderer, surface::RenderSurface,
};

pub use tiles::{
    cache::TileCache, fetcher::HttpFetcher, loader::TileLoader, source::TileSource,
    tile_set::TileSetCalculator,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Rendering unavailable: {0}")]
    RenderUnavailable(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs `env_logger`, honouring `RUST_LOG`. Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(cfg!(test))
        .try_init();
}
