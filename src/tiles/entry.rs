//! Per-tile cache entry and its load state machine
//!
//! An entry is created `Pending` with a placeholder texture and moves exactly
//! once, to `Loaded` when its image arrives or to `Cancelled` when it is no
//! longer wanted. Both transitions happen under the entry's mutex, which is the
//! only lock the tile pipeline needs: a completion that races a cancellation
//! sees the state the other side left behind and backs off.

use crate::rendering::surface::{DecodedImage, RenderSurface, TextureFilter, TextureHandle};
use crate::runtime::AsyncHandle;
use crate::Result;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Loaded,
    Cancelled,
}

/// Point-in-time copy of an entry's mutable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub state: LoadState,
    pub width: u32,
    pub height: u32,
    pub texture: TextureHandle,
}

pub struct CacheEntry {
    key: String,
    inner: Mutex<EntryInner>,
}

struct EntryInner {
    state: LoadState,
    width: u32,
    height: u32,
    texture: TextureHandle,
    task: Option<Box<dyn AsyncHandle>>,
}

impl CacheEntry {
    /// A fresh entry waiting on its image, showing `placeholder` meanwhile.
    pub fn pending(key: impl Into<String>, placeholder: TextureHandle, width: u32, height: u32) -> Self {
        Self {
            key: key.into(),
            inner: Mutex::new(EntryInner {
                state: LoadState::Pending,
                width,
                height,
                texture: placeholder,
                task: None,
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn lock(&self) -> MutexGuard<'_, EntryInner> {
        // The guarded data stays consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> LoadState {
        self.lock().state
    }

    pub fn is_pending(&self) -> bool {
        self.state() == LoadState::Pending
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Loaded
    }

    pub fn texture(&self) -> TextureHandle {
        self.lock().texture
    }

    pub fn snapshot(&self) -> EntrySnapshot {
        let inner = self.lock();
        EntrySnapshot {
            state: inner.state,
            width: inner.width,
            height: inner.height,
            texture: inner.texture,
        }
    }

    /// Remembers the in-flight task so cancelling can abort it. If the entry was
    /// already cancelled the task is aborted on the spot.
    pub fn attach_task(&self, task: Box<dyn AsyncHandle>) {
        let mut inner = self.lock();
        match inner.state {
            LoadState::Pending => inner.task = Some(task),
            LoadState::Cancelled => task.cancel(),
            LoadState::Loaded => {}
        }
    }

    /// Drops the task handle once the task has reported back.
    pub(crate) fn release_task(&self) {
        self.lock().task = None;
    }

    /// Pending → Cancelled. Returns `false` (and changes nothing) for an entry
    /// that already loaded or was already cancelled.
    pub fn cancel(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != LoadState::Pending {
            return false;
        }
        inner.state = LoadState::Cancelled;
        if let Some(task) = inner.task.take() {
            task.cancel();
        }
        true
    }

    /// Pending → Loaded: uploads `image` into the entry's texture and records its
    /// real dimensions. Returns `Ok(false)` without touching the surface when the
    /// entry is no longer pending.
    pub fn complete(&self, image: &DecodedImage, surface: &mut dyn RenderSurface) -> Result<bool> {
        let mut inner = self.lock();
        if inner.state != LoadState::Pending {
            return Ok(false);
        }
        let filter = TextureFilter::for_dimensions(image.width, image.height);
        surface.update_texture(inner.texture, image, filter)?;
        inner.state = LoadState::Loaded;
        inner.width = image.width;
        inner.height = image.height;
        inner.task = None;
        Ok(true)
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("state", &snapshot.state)
            .field("width", &snapshot.width)
            .field("height", &snapshot.height)
            .field("texture", &snapshot.texture)
            .finish()
    }
}
