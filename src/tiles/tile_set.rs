//! Viewport to tile-set computation
//!
//! Given a centre, a zoom and a viewport size, works out every tile needed to
//! fill the viewport (plus a margin) and where each one lands on screen.

use crate::core::constants::MAX_TILE_LEVEL;
use crate::core::geo::{Position, TileCoord, ViewportSize};
use crate::core::projection::{scale_factor, tile_coordinates, tile_extent, ScaleMode};
use crate::prelude::{Arc, HashMap};
use crate::tiles::source::TileSource;

/// Direction of the zoom change that produced a position update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zooming {
    #[default]
    Flat,
    In,
    Out,
}

impl Zooming {
    /// Classifies a move from `from` to `to`.
    pub fn between(from: f64, to: f64) -> Self {
        if to > from {
            Zooming::In
        } else if to < from {
            Zooming::Out
        } else {
            Zooming::Flat
        }
    }
}

/// One tile to draw during a single render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub zoom_level: u8,
    pub tile_x: i64,
    pub tile_y: i64,
    /// Offset of the tile's top-left corner from the viewport centre, in pixels
    pub screen_dx: i32,
    pub screen_dy: i32,
    pub scale: f64,
    /// Cache key; the URL the tile source produced for this tile
    pub source_key: String,
}

impl Tile {
    pub fn coord(&self) -> TileCoord {
        TileCoord::new(self.tile_x, self.tile_y, self.zoom_level)
    }

    /// Screen rectangle `(x, y, extent)` inside a viewport of the given size.
    pub fn screen_rect(&self, viewport: ViewportSize, tile_size: u32) -> (i32, i32, i32) {
        let (cx, cy) = viewport.center();
        (
            cx + self.screen_dx,
            cy + self.screen_dy,
            tile_extent(tile_size, self.scale),
        )
    }
}

/// Tiles for one render pass, unique by `source_key`, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TileSet {
    tiles: Vec<Tile>,
    index: HashMap<String, usize>,
}

impl TileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tile; a tile whose key is already present is ignored.
    pub fn insert(&mut self, tile: Tile) -> bool {
        if self.index.contains_key(&tile.source_key) {
            return false;
        }
        self.index.insert(tile.source_key.clone(), self.tiles.len());
        self.tiles.push(tile);
        true
    }

    pub fn extend(&mut self, other: TileSet) {
        for tile in other.tiles {
            self.insert(tile);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Tile> {
        self.index.get(key).map(|&i| &self.tiles[i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tiles.iter().map(|t| t.source_key.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tile> {
        self.tiles.iter()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Coarser zoom levels first so finer tiles paint over them during transitions.
    pub fn draw_order(&self) -> Vec<&Tile> {
        let mut ordered: Vec<&Tile> = self.tiles.iter().collect();
        ordered.sort_by_key(|t| t.zoom_level);
        ordered
    }

    pub fn zoom_levels(&self) -> Vec<u8> {
        let mut levels: Vec<u8> = self.tiles.iter().map(|t| t.zoom_level).collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }
}

impl<'a> IntoIterator for &'a TileSet {
    type Item = &'a Tile;
    type IntoIter = std::slice::Iter<'a, Tile>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.iter()
    }
}

/// Computes the tiles needed to cover a viewport.
#[derive(Clone)]
pub struct TileSetCalculator {
    source: Arc<dyn TileSource>,
    tile_size: u32,
    margin: u32,
    scale_mode: ScaleMode,
    min_zoom: f64,
    max_zoom: f64,
}

impl TileSetCalculator {
    pub fn new(source: Arc<dyn TileSource>, tile_size: u32) -> Self {
        Self {
            source,
            tile_size,
            margin: crate::core::constants::DEFAULT_TILE_MARGIN,
            scale_mode: ScaleMode::default(),
            min_zoom: crate::core::constants::DEFAULT_MIN_ZOOM,
            max_zoom: crate::core::constants::DEFAULT_MAX_ZOOM,
        }
    }

    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_scale_mode(mut self, scale_mode: ScaleMode) -> Self {
        self.scale_mode = scale_mode;
        self
    }

    pub fn with_zoom_limits(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.scale_mode
    }

    /// Every tile needed to fill `viewport` around `position`.
    pub fn tiles_for_viewport(&self, position: &Position, viewport: ViewportSize) -> TileSet {
        self.tiles_for_level(position, Self::level_of(position.zoom), viewport)
    }

    fn level_of(zoom: f64) -> u8 {
        zoom.floor().clamp(0.0, MAX_TILE_LEVEL as f64) as u8
    }

    /// Tiles of `level` laid out for display at `position.zoom`. Each level away
    /// from `floor(zoom)` halves or doubles the extent, so every level puts a
    /// given coordinate on the same screen pixel.
    pub fn tiles_for_level(&self, position: &Position, level: u8, viewport: ViewportSize) -> TileSet {
        let mut tiles = TileSet::new();
        if viewport.is_empty() {
            return tiles;
        }

        let scale = scale_factor(position.zoom, self.scale_mode)
            * 2_f64.powf(position.zoom.floor() - level as f64);
        let extent = tile_extent(self.tile_size, scale);

        let (cx, cy) = tile_coordinates(level as f64, position.lat, position.lon);
        if !cx.is_finite() || !cy.is_finite() {
            log::debug!("centre {:?} has no finite tile coordinate", position);
            return tiles;
        }
        let tx = cx.floor();
        let ty = cy.floor();

        // Pixel offset of the viewport centre inside the centre tile.
        let px = ((cx - tx) * extent as f64).floor() as i32;
        let py = ((cy - ty) * extent as f64).floor() as i32;

        let columns = (viewport.width as f64 / extent as f64).ceil() as i32 + self.margin as i32;
        let rows = (viewport.height as f64 / extent as f64).ceil() as i32 + self.margin as i32;

        let start_x = -(columns / 2);
        let start_y = -(rows / 2);
        let (tx, ty) = (tx as i64, ty as i64);

        for gx in start_x..start_x + columns {
            for gy in start_y..start_y + rows {
                let coord = TileCoord::new(tx + gx as i64, ty + gy as i64, level);
                tiles.insert(Tile {
                    zoom_level: level,
                    tile_x: coord.x,
                    tile_y: coord.y,
                    screen_dx: gx * extent - px,
                    screen_dy: gy * extent - py,
                    scale,
                    source_key: self.source.url(coord),
                });
            }
        }

        tiles
    }

    /// The tile set for a position update. While zooming, the tiles of the level
    /// being left are kept alongside the new one so the view never flashes blank.
    pub fn tiles_for_transition(
        &self,
        position: &Position,
        viewport: ViewportSize,
        zooming: Zooming,
    ) -> TileSet {
        let (zoom_start, zoom_end) = match zooming {
            Zooming::Flat => (position.zoom, position.zoom),
            Zooming::In => (position.zoom - 1.0, position.zoom),
            Zooming::Out => (position.zoom, position.zoom + 1.0),
        };

        let mut tiles = TileSet::new();
        let mut zoom = zoom_start;
        while zoom <= zoom_end {
            if zoom >= self.min_zoom.floor() && zoom <= self.max_zoom {
                tiles.extend(self.tiles_for_level(position, Self::level_of(zoom), viewport));
            }
            zoom += 1.0;
        }
        tiles
    }
}

impl std::fmt::Debug for TileSetCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileSetCalculator")
            .field("tile_size", &self.tile_size)
            .field("margin", &self.margin)
            .field("scale_mode", &self.scale_mode)
            .field("min_zoom", &self.min_zoom)
            .field("max_zoom", &self.max_zoom)
            .finish()
    }
}
