//! Core constants derived from OpenStreetMap slippy-map conventions.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Lowest zoom level the controller accepts by default.
pub const DEFAULT_MIN_ZOOM: f64 = 0.0;

/// Highest zoom level the controller accepts by default (OSM serves up to 18 or 19).
pub const DEFAULT_MAX_ZOOM: f64 = 18.0;

/// Highest integer level the tile math will compute tiles for.
pub const MAX_TILE_LEVEL: u8 = 30;

/// Extra columns/rows computed around the viewport so fast pans don't show edges.
pub const DEFAULT_TILE_MARGIN: u32 = 2;

/// Number of tile textures kept alive by the LRU cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 150;

/// Degrees moved per animation step when gliding toward a target.
pub const DEFAULT_PAN_STEP: f64 = 0.001;

/// Degrees added to the animation target per arrow key press.
pub const DEFAULT_KEY_PAN_DELTA: f64 = 0.005;

/// Zoom delta applied per wheel notch.
pub const DEFAULT_ZOOM_STEP: f64 = 0.1;

/// Milliseconds between two animation steps.
pub const DEFAULT_ANIMATION_INTERVAL_MS: u64 = 100;

/// Pixels of pinch distance that correspond to one zoom level.
pub const PINCH_PIXELS_PER_ZOOM: f64 = 100.0;

/// RGBA colour of the placeholder texture shown while a tile loads.
pub const PLACEHOLDER_RGBA: [u8; 4] = [0, 0, 0, 30];

/// Default initial view (Winnipeg), the same centre the viewer has always opened on.
pub const DEFAULT_CENTER: (f64, f64) = (49.8951, -97.1384);

/// Default initial zoom level.
pub const DEFAULT_ZOOM: f64 = 15.0;

/// Default OpenStreetMap tile endpoint.
pub const OSM_BASE_URL: &str = "https://tile.openstreetmap.org";
