use crate::core::constants::{PLACEHOLDER_RGBA, TILE_SIZE};
use crate::prelude::Arc;
use crate::rendering::surface::{DecodedImage, RenderSurface, TextureFilter};
use crate::runtime::AsyncSpawner;
use crate::tiles::entry::CacheEntry;
use crate::tiles::fetcher::TileFetcher;
use crate::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Called from the fetch task after it queued a completion, so the host can
/// schedule [`TileLoader::process_completions`] on its control thread.
pub type WakeHook = Arc<dyn Fn() + Send + Sync>;

/// Outcome of one fetch, handed back to the control thread.
pub struct LoadCompletion {
    pub entry: Arc<CacheEntry>,
    pub result: Result<DecodedImage>,
}

/// Starts tile fetches on a spawner and applies their results.
///
/// Fetch tasks never touch the render surface; they only push a
/// [`LoadCompletion`] through the channel. Uploads happen in
/// `process_completions`, on whichever thread owns the surface.
pub struct TileLoader {
    fetcher: Arc<dyn TileFetcher>,
    spawner: Arc<dyn AsyncSpawner>,
    tx: Sender<LoadCompletion>,
    rx: Receiver<LoadCompletion>,
    wake: Option<WakeHook>,
    tile_size: u32,
    placeholder: DecodedImage,
}

impl TileLoader {
    pub fn new(fetcher: Arc<dyn TileFetcher>, spawner: Arc<dyn AsyncSpawner>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            fetcher,
            spawner,
            tx,
            rx,
            wake: None,
            tile_size: TILE_SIZE,
            placeholder: DecodedImage::solid(TILE_SIZE, TILE_SIZE, PLACEHOLDER_RGBA),
        }
    }

    /// Loader on the default runtime (see [`crate::runtime::default_spawner`]).
    pub fn with_default_spawner(fetcher: Arc<dyn TileFetcher>) -> Result<Self> {
        Ok(Self::new(fetcher, crate::runtime::default_spawner()?))
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size.max(1);
        self.placeholder = DecodedImage::solid(self.tile_size, self.tile_size, PLACEHOLDER_RGBA);
        self
    }

    pub fn with_wake<F>(mut self, wake: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.wake = Some(Arc::new(wake));
        self
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Creates a pending entry for `key` with a placeholder texture and starts
    /// fetching it. The key is the tile URL.
    pub fn load(&self, key: &str, surface: &mut dyn RenderSurface) -> Result<Arc<CacheEntry>> {
        let filter = TextureFilter::for_dimensions(self.tile_size, self.tile_size);
        let texture = surface.create_texture(&self.placeholder, filter)?;
        let entry = Arc::new(CacheEntry::pending(key, texture, self.tile_size, self.tile_size));

        let fetcher = self.fetcher.clone();
        let tx = self.tx.clone();
        let wake = self.wake.clone();
        let task_entry = entry.clone();
        let url = key.to_string();
        let task = self.spawner.spawn_boxed(Box::pin(async move {
            let result = fetcher.fetch(&url).await;
            if tx.send(LoadCompletion { entry: task_entry, result }).is_ok() {
                if let Some(wake) = wake {
                    wake();
                }
            }
        }));
        entry.attach_task(task);

        log::debug!("loading tile {}", key);
        Ok(entry)
    }

    /// Applies every queued completion. Returns the entries that became Loaded.
    pub fn process_completions(&self, surface: &mut dyn RenderSurface) -> Vec<Arc<CacheEntry>> {
        let mut loaded = Vec::new();
        for LoadCompletion { entry, result } in self.rx.try_iter() {
            match result {
                Ok(image) => match entry.complete(&image, surface) {
                    Ok(true) => {
                        log::debug!("tile {} loaded ({}x{})", entry.key(), image.width, image.height);
                        loaded.push(entry);
                    }
                    Ok(false) => {
                        log::trace!("discarding completion for {} ({:?})", entry.key(), entry.state());
                    }
                    Err(e) => {
                        log::warn!("failed to upload tile {}: {}", entry.key(), e);
                        entry.release_task();
                    }
                },
                Err(e) => {
                    if entry.is_pending() {
                        log::warn!("failed to load tile {}: {}", entry.key(), e);
                    } else {
                        log::trace!("discarding failed completion for {}: {}", entry.key(), e);
                    }
                    entry.release_task();
                }
            }
        }
        loaded
    }

    /// Cancels a pending load. Returns `false` for loaded or already cancelled entries.
    pub fn cancel(&self, entry: &CacheEntry) -> bool {
        let cancelled = entry.cancel();
        if cancelled {
            log::debug!("cancelled tile {}", entry.key());
        }
        cancelled
    }

    /// Completions waiting for `process_completions`.
    pub fn queued_completions(&self) -> usize {
        self.rx.len()
    }
}

impl std::fmt::Debug for TileLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLoader")
            .field("tile_size", &self.tile_size)
            .field("queued", &self.rx.len())
            .field("wake", &self.wake.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::context::RecordingSurface;
    use crate::runtime::ManualSpawner;
    use crate::tiles::entry::LoadState;
    use crate::MapError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticFetcher;

    #[async_trait]
    impl TileFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<DecodedImage> {
            if url.contains("missing") {
                Err(MapError::Http {
                    status: 404,
                    url: url.to_string(),
                })
            } else {
                Ok(DecodedImage::solid(256, 256, [200, 200, 200, 255]))
            }
        }
    }

    fn loader() -> (TileLoader, Arc<ManualSpawner>) {
        let spawner = Arc::new(ManualSpawner::new());
        let loader = TileLoader::new(Arc::new(StaticFetcher), spawner.clone());
        (loader, spawner)
    }

    #[test]
    fn test_load_shows_placeholder_until_processed() {
        let (loader, spawner) = loader();
        let mut surface = RecordingSurface::new(512, 512);

        let entry = loader.load("https://t/1/0/0.png", &mut surface).unwrap();
        assert!(entry.is_pending());
        assert!(surface.has_texture(entry.texture()));
        assert_eq!(surface.upload_count(), 0);

        assert_eq!(spawner.run_pending(), 1);
        assert_eq!(loader.queued_completions(), 1);
        // nothing is applied until the control thread drains the queue
        assert!(entry.is_pending());

        let loaded = loader.process_completions(&mut surface);
        assert_eq!(loaded.len(), 1);
        assert!(entry.is_loaded());
        assert_eq!(surface.upload_count(), 1);
        assert_eq!(surface.last_filter(entry.texture()), Some(TextureFilter::Mipmap));
    }

    #[test]
    fn test_failed_fetch_keeps_placeholder() {
        let (loader, spawner) = loader();
        let mut surface = RecordingSurface::new(512, 512);

        let entry = loader.load("https://t/missing.png", &mut surface).unwrap();
        spawner.run_pending();
        assert!(loader.process_completions(&mut surface).is_empty());
        assert_eq!(entry.state(), LoadState::Pending);
        assert_eq!(surface.upload_count(), 0);
    }

    #[test]
    fn test_cancel_before_run_skips_fetch() {
        let (loader, spawner) = loader();
        let mut surface = RecordingSurface::new(512, 512);

        let entry = loader.load("https://t/1/0/0.png", &mut surface).unwrap();
        assert!(loader.cancel(&entry));
        assert!(!loader.cancel(&entry));
        assert_eq!(spawner.run_pending(), 0);
        assert!(loader.process_completions(&mut surface).is_empty());
    }

    #[test]
    fn test_late_completion_is_discarded() {
        let (loader, spawner) = loader();
        let mut surface = RecordingSurface::new(512, 512);

        let entry = loader.load("https://t/1/0/0.png", &mut surface).unwrap();
        spawner.run_pending();
        assert!(loader.cancel(&entry));

        assert!(loader.process_completions(&mut surface).is_empty());
        assert_eq!(entry.state(), LoadState::Cancelled);
        assert_eq!(surface.upload_count(), 0);
    }

    #[test]
    fn test_wake_hook_fires_per_completion() {
        let spawner = Arc::new(ManualSpawner::new());
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = wakes.clone();
        let loader = TileLoader::new(Arc::new(StaticFetcher), spawner.clone()).with_wake(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut surface = RecordingSurface::new(512, 512);

        loader.load("https://t/a.png", &mut surface).unwrap();
        loader.load("https://t/b.png", &mut surface).unwrap();
        assert_eq!(wakes.load(Ordering::SeqCst), 0);
        spawner.run_pending();
        assert_eq!(wakes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_placeholder_matches_tile_size() {
        let spawner = Arc::new(ManualSpawner::new());
        let loader = TileLoader::new(Arc::new(StaticFetcher), spawner).with_tile_size(512);
        let mut surface = RecordingSurface::new(512, 512);

        let entry = loader.load("https://t/a.png", &mut surface).unwrap();
        let record = surface.texture(entry.texture()).unwrap();
        assert_eq!((record.width, record.height), (512, 512));
        assert_eq!(entry.snapshot().width, 512);
    }
}
