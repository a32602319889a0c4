//! Prelude module for common tileview types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tileview::prelude::*;`

pub use crate::core::{
    config::{AnimationConfig, InteractionConfig, MapConfig, TileLoadingConfig},
    geo::{LatLng, Position, TileCoord, ViewportSize},
    map::{MapController, MapEvents},
    projection::ScaleMode,
};

pub use crate::input::events::{InputEvent, KeyCode, TouchPhase, TouchPoint};

pub use crate::rendering::{
    context::RecordingSurface,
    raster::RasterSurface,
    renderer::{MapRenderer, RedrawState, TileRenderer},
    surface::{DecodedImage, FrameScheduler, RenderSurface, TextureFilter, TextureHandle},
};

pub use crate::runtime::{AsyncHandle, AsyncSpawner, ManualSpawner};

#[cfg(feature = "tokio-runtime")]
pub use crate::runtime::TokioSpawner;

pub use crate::tiles::{
    cache::TileCache,
    entry::{CacheEntry, LoadState},
    fetcher::{HttpFetcher, TileFetcher},
    loader::TileLoader,
    source::{OpenStreetMapSource, TemplateSource, TileSource},
    tile_set::{Tile, TileSet, TileSetCalculator, Zooming},
};

pub use crate::{Error as MapError, Result};

pub use std::{
    pin::Pin,
    sync::{Arc, Mutex},
    time::Duration,
};

pub use instant::Instant;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;
