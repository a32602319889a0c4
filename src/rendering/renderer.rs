//! Tile renderer: keeps the cache in step with the visible tile set and draws
//! whatever has loaded.

use crate::core::geo::ViewportSize;
use crate::prelude::Arc;
use crate::rendering::surface::{FrameScheduler, RenderSurface};
use crate::tiles::cache::TileCache;
use crate::tiles::entry::{CacheEntry, LoadState};
use crate::tiles::loader::TileLoader;
use crate::tiles::tile_set::TileSet;
use crate::{MapError, Result};
use std::cell::RefCell;
use std::rc::Rc;

/// Anything the map controller can hand a tile set to.
pub trait TileRenderer {
    fn render_tiles(&mut self, tiles: &TileSet);

    fn viewport_size(&self) -> ViewportSize;
}

impl<R: TileRenderer> TileRenderer for Rc<RefCell<R>> {
    fn render_tiles(&mut self, tiles: &TileSet) {
        self.borrow_mut().render_tiles(tiles)
    }

    fn viewport_size(&self) -> ViewportSize {
        self.borrow().viewport_size()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedrawState {
    #[default]
    Idle,
    /// A frame has been requested and not yet run
    PendingRedraw,
}

pub struct MapRenderer<S: RenderSurface> {
    surface: S,
    cache: TileCache,
    loader: TileLoader,
    scheduler: Box<dyn FrameScheduler>,
    current: TileSet,
    redraw: RedrawState,
}

impl<S: RenderSurface> MapRenderer<S> {
    /// Takes ownership of `surface` and initializes it. A surface that cannot
    /// render is reported as [`MapError::RenderUnavailable`].
    pub fn new<F>(mut surface: S, loader: TileLoader, cache: TileCache, scheduler: F) -> Result<Self>
    where
        F: FrameScheduler + 'static,
    {
        surface.initialize().map_err(|e| match e {
            MapError::RenderUnavailable(msg) => MapError::RenderUnavailable(msg),
            other => MapError::RenderUnavailable(other.to_string()),
        })?;
        log::debug!("map renderer ready (cache capacity {})", cache.capacity());
        Ok(Self {
            surface,
            cache,
            loader,
            scheduler: Box::new(scheduler),
            current: TileSet::new(),
            redraw: RedrawState::Idle,
        })
    }

    fn request_redraw(&mut self) {
        if self.redraw == RedrawState::Idle {
            self.redraw = RedrawState::PendingRedraw;
            self.scheduler.request_frame();
        }
    }

    fn release(&mut self, entry: &CacheEntry) {
        self.surface.delete_texture(entry.texture());
    }

    /// Applies finished loads. Each newly loaded tile asks for a frame; requests
    /// made before the frame runs collapse into one.
    pub fn process_completions(&mut self) -> usize {
        let loaded = self.loader.process_completions(&mut self.surface);
        for _ in &loaded {
            self.request_redraw();
        }
        loaded.len()
    }

    /// The frame callback: clears and draws every loaded tile of the current
    /// set, coarser levels first.
    pub fn on_frame(&mut self) {
        self.redraw = RedrawState::Idle;
        self.surface.clear();
        let viewport = self.surface.viewport_size();
        let tile_size = self.loader.tile_size();
        for tile in self.current.draw_order() {
            let Some(entry) = self.cache.peek(&tile.source_key) else {
                continue;
            };
            let snapshot = entry.snapshot();
            if snapshot.state != LoadState::Loaded {
                continue;
            }
            let (x, y, extent) = tile.screen_rect(viewport, tile_size);
            self.surface.draw_texture(snapshot.texture, x, y, extent);
        }
    }

    pub fn redraw_state(&self) -> RedrawState {
        self.redraw
    }

    pub fn current_tiles(&self) -> &TileSet {
        &self.current
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn cached_entry(&self, key: &str) -> Option<Arc<CacheEntry>> {
        self.cache.peek(key)
    }

    pub fn loader(&self) -> &TileLoader {
        &self.loader
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

impl<S: RenderSurface> TileRenderer for MapRenderer<S> {
    fn render_tiles(&mut self, tiles: &TileSet) {
        // loads nobody will draw any more
        let stale: Vec<String> = self
            .current
            .keys()
            .filter(|key| !tiles.contains_key(key))
            .map(str::to_string)
            .collect();
        for key in stale {
            let Some(entry) = self.cache.peek(&key) else {
                continue;
            };
            if self.loader.cancel(&entry) {
                self.cache.remove(&key);
                self.release(&entry);
            }
        }

        // a set that evicts its own members would refetch itself on every pass
        if self.cache.grow_to(tiles.len()) {
            log::debug!("tile cache grown to {} for the visible set", tiles.len());
        }

        for tile in tiles {
            let needs_load = match self.cache.get(&tile.source_key) {
                Some(entry) => entry.state() == LoadState::Cancelled,
                None => true,
            };
            if !needs_load {
                continue;
            }
            match self.loader.load(&tile.source_key, &mut self.surface) {
                Ok(entry) => {
                    if let Some(displaced) = self.cache.insert(entry) {
                        self.release(&displaced);
                    }
                }
                Err(e) => log::warn!("could not start load for {}: {}", tile.source_key, e),
            }
        }

        self.current = tiles.clone();
        self.request_redraw();
    }

    fn viewport_size(&self) -> ViewportSize {
        self.surface.viewport_size()
    }
}

impl<S: RenderSurface> std::fmt::Debug for MapRenderer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapRenderer")
            .field("tiles", &self.current.len())
            .field("cached", &self.cache.len())
            .field("redraw", &self.redraw)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Position;
    use crate::rendering::context::RecordingSurface;
    use crate::rendering::surface::{DecodedImage, TextureHandle};
    use crate::runtime::ManualSpawner;
    use crate::tiles::fetcher::TileFetcher;
    use crate::tiles::source::OpenStreetMapSource;
    use crate::tiles::tile_set::TileSetCalculator;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SolidFetcher;

    #[async_trait]
    impl TileFetcher for SolidFetcher {
        async fn fetch(&self, _url: &str) -> Result<DecodedImage> {
            Ok(DecodedImage::solid(256, 256, [120, 120, 120, 255]))
        }
    }

    struct Harness {
        renderer: MapRenderer<RecordingSurface>,
        spawner: Arc<ManualSpawner>,
        frames: Arc<AtomicUsize>,
        calculator: TileSetCalculator,
    }

    fn harness(capacity: usize) -> Harness {
        let spawner = Arc::new(ManualSpawner::new());
        let loader = TileLoader::new(Arc::new(SolidFetcher), spawner.clone());
        let frames = Arc::new(AtomicUsize::new(0));
        let counter = frames.clone();
        let renderer = MapRenderer::new(
            RecordingSurface::new(800, 600),
            loader,
            TileCache::new(capacity),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();
        let calculator = TileSetCalculator::new(Arc::new(OpenStreetMapSource::default()), 256);
        Harness {
            renderer,
            spawner,
            frames,
            calculator,
        }
    }

    fn winnipeg() -> Position {
        Position::new(15.0, 49.8951, -97.1384)
    }

    #[test]
    fn test_render_starts_loads_for_every_tile() {
        let mut h = harness(150);
        let tiles = h
            .calculator
            .tiles_for_viewport(&winnipeg(), h.renderer.viewport_size());
        h.renderer.render_tiles(&tiles);

        assert_eq!(h.renderer.cache().len(), tiles.len());
        assert_eq!(h.spawner.pending(), tiles.len());
        assert_eq!(h.renderer.redraw_state(), RedrawState::PendingRedraw);
        assert_eq!(h.frames.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_completions_coalesce_into_one_frame() {
        let mut h = harness(150);
        let tiles = h
            .calculator
            .tiles_for_viewport(&winnipeg(), h.renderer.viewport_size());
        h.renderer.render_tiles(&tiles);
        h.renderer.on_frame();
        assert_eq!(h.renderer.redraw_state(), RedrawState::Idle);
        assert!(h.renderer.surface().drawn_textures().is_empty());

        h.spawner.run_pending();
        let loaded = h.renderer.process_completions();
        assert_eq!(loaded, tiles.len());
        // one frame for render_tiles, one for the whole batch of loads
        assert_eq!(h.frames.load(Ordering::SeqCst), 2);

        h.renderer.on_frame();
        let drawn = h.renderer.surface().drawn_textures().len();
        let culled = h.renderer.surface().culled_count();
        assert_eq!(drawn + culled, tiles.len());
        assert!(drawn > 0);
    }

    #[test]
    fn test_cached_tiles_are_not_reloaded() {
        let mut h = harness(150);
        let tiles = h
            .calculator
            .tiles_for_viewport(&winnipeg(), h.renderer.viewport_size());
        h.renderer.render_tiles(&tiles);
        h.spawner.run_pending();
        h.renderer.process_completions();

        h.renderer.render_tiles(&tiles);
        assert_eq!(h.spawner.pending(), 0);
    }

    #[test]
    fn test_moving_away_cancels_pending_loads() {
        let mut h = harness(150);
        let viewport = h.renderer.viewport_size();
        let first = h.calculator.tiles_for_viewport(&winnipeg(), viewport);
        h.renderer.render_tiles(&first);

        let elsewhere = Position::new(15.0, -33.8688, 151.2093);
        let second = h.calculator.tiles_for_viewport(&elsewhere, viewport);
        h.renderer.render_tiles(&second);

        for key in first.keys() {
            assert!(h.renderer.cached_entry(key).is_none());
        }
        assert_eq!(h.renderer.cache().len(), second.len());
        // only the second set's fetches survive
        assert_eq!(h.spawner.run_pending(), second.len());
    }

    #[test]
    fn test_loaded_tiles_survive_moving_away() {
        let mut h = harness(150);
        let viewport = h.renderer.viewport_size();
        let first = h.calculator.tiles_for_viewport(&winnipeg(), viewport);
        h.renderer.render_tiles(&first);
        h.spawner.run_pending();
        h.renderer.process_completions();

        let elsewhere = Position::new(15.0, -33.8688, 151.2093);
        let second = h.calculator.tiles_for_viewport(&elsewhere, viewport);
        h.renderer.render_tiles(&second);

        let key = first.keys().next().unwrap();
        assert!(h.renderer.cached_entry(key).unwrap().is_loaded());
    }

    #[test]
    fn test_late_completion_after_cancel_requests_nothing() {
        let mut h = harness(150);
        let viewport = h.renderer.viewport_size();
        let first = h.calculator.tiles_for_viewport(&winnipeg(), viewport);
        h.renderer.render_tiles(&first);
        let entry = h.renderer.cached_entry(first.keys().next().unwrap()).unwrap();
        h.renderer.on_frame();

        // fetches finish, but the view moves before the control thread drains them
        h.spawner.run_pending();
        let elsewhere = Position::new(15.0, -33.8688, 151.2093);
        h.renderer
            .render_tiles(&h.calculator.tiles_for_viewport(&elsewhere, viewport));
        h.renderer.on_frame();
        let frames = h.frames.load(Ordering::SeqCst);

        assert_eq!(h.renderer.process_completions(), 0);
        assert_eq!(entry.state(), LoadState::Cancelled);
        assert_eq!(h.renderer.surface().upload_count(), 0);
        assert_eq!(h.frames.load(Ordering::SeqCst), frames);
        assert_eq!(h.renderer.redraw_state(), RedrawState::Idle);
    }

    #[test]
    fn test_eviction_releases_texture() {
        let mut h = harness(30);
        let viewport = h.renderer.viewport_size();
        let first = h.calculator.tiles_for_viewport(&winnipeg(), viewport);
        assert_eq!(first.len(), 30);
        h.renderer.render_tiles(&first);
        h.spawner.run_pending();
        h.renderer.process_completions();

        // the loaded first set is pushed out by the second
        let elsewhere = Position::new(15.0, -33.8688, 151.2093);
        h.renderer
            .render_tiles(&h.calculator.tiles_for_viewport(&elsewhere, viewport));

        assert_eq!(h.renderer.cache().capacity(), 30);
        assert_eq!(h.renderer.cache().len(), 30);
        assert_eq!(h.renderer.surface().texture_count(), 30);
    }

    #[test]
    fn test_oversized_set_is_fetched_once() {
        let mut h = harness(10);
        let tiles = h
            .calculator
            .tiles_for_viewport(&winnipeg(), h.renderer.viewport_size());
        h.renderer.render_tiles(&tiles);
        assert_eq!(h.renderer.cache().capacity(), tiles.len());
        assert_eq!(h.spawner.run_pending(), tiles.len());
        assert_eq!(h.renderer.process_completions(), tiles.len());

        h.renderer.render_tiles(&tiles);
        assert_eq!(h.spawner.pending(), 0);
        for key in tiles.keys() {
            assert!(h.renderer.cached_entry(key).unwrap().is_loaded());
        }
    }

    #[test]
    fn test_cancelled_entry_is_reloaded() {
        let mut h = harness(150);
        let tiles = h
            .calculator
            .tiles_for_viewport(&winnipeg(), h.renderer.viewport_size());
        h.renderer.render_tiles(&tiles);
        h.spawner.run_pending();
        assert_eq!(h.renderer.process_completions(), tiles.len());

        // a still-pending entry that got cancelled in place, e.g. by a racing eviction
        let key = tiles.keys().next().unwrap().to_string();
        let stale = Arc::new(CacheEntry::pending(
            key.as_str(),
            TextureHandle(999),
            256,
            256,
        ));
        assert!(stale.cancel());
        h.renderer.cache.insert(stale.clone());

        h.renderer.render_tiles(&tiles);
        assert_eq!(h.spawner.pending(), 1);
        let fresh = h.renderer.cached_entry(&key).unwrap();
        assert!(!Arc::ptr_eq(&fresh, &stale));
        assert_eq!(fresh.state(), LoadState::Pending);
        assert_eq!(h.renderer.cache().len(), tiles.len());

        h.spawner.run_pending();
        assert_eq!(h.renderer.process_completions(), 1);
        assert!(h.renderer.cached_entry(&key).unwrap().is_loaded());
    }

    #[test]
    fn test_unavailable_surface_is_reported() {
        let spawner = Arc::new(ManualSpawner::new());
        let loader = TileLoader::new(Arc::new(SolidFetcher), spawner);
        let result = MapRenderer::new(
            RecordingSurface::unavailable(),
            loader,
            TileCache::default(),
            || {},
        );
        assert!(matches!(result, Err(MapError::RenderUnavailable(_))));
    }

    #[test]
    fn test_shared_renderer_through_rc() {
        let h = harness(150);
        let shared = Rc::new(RefCell::new(h.renderer));
        let mut handle: Box<dyn TileRenderer> = Box::new(shared.clone());
        let tiles = h
            .calculator
            .tiles_for_viewport(&winnipeg(), handle.viewport_size());
        handle.render_tiles(&tiles);
        assert_eq!(shared.borrow().current_tiles().len(), tiles.len());
    }
}
