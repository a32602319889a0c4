//! Runtime abstraction layer for async operations
//!
//! Tile fetches run on whatever spawner the loader was given; the control
//! thread never awaits them. Tokio is the default, and a manually driven
//! spawner exists for hosts that pump futures from their own event loop.

use crate::prelude::{Arc, Future, Mutex, Pin};
use std::sync::atomic::{AtomicBool, Ordering};

/// Boxed future the spawners accept.
pub type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(&self, future: BoxedTask) -> Box<dyn AsyncHandle>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task. Never blocks; a task already past its last await still completes.
    fn cancel(&self);
}

/// Default spawner implementations
pub mod spawners {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use ::tokio::runtime::{Builder, Handle, Runtime};
        use ::tokio::task::JoinHandle;
        use once_cell::sync::Lazy;

        /// Runtime used when the host has none of its own.
        static FALLBACK_RUNTIME: Lazy<Option<Runtime>> = Lazy::new(|| {
            match Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("tileview-io")
                .enable_all()
                .build()
            {
                Ok(runtime) => Some(runtime),
                Err(e) => {
                    log::error!("failed to build fallback tokio runtime: {}", e);
                    None
                }
            }
        });

        /// Tokio-based async spawner
        #[derive(Debug, Clone)]
        pub struct TokioSpawner {
            handle: Handle,
        }

        impl TokioSpawner {
            pub fn new(handle: Handle) -> Self {
                Self { handle }
            }

            /// Uses the runtime the caller is inside of, or a shared background
            /// runtime when called from plain threads.
            pub fn current() -> Option<Self> {
                Handle::try_current()
                    .ok()
                    .or_else(|| FALLBACK_RUNTIME.as_ref().map(|rt| rt.handle().clone()))
                    .map(Self::new)
            }
        }

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(&self, future: BoxedTask) -> Box<dyn AsyncHandle> {
                Box::new(TokioHandle(self.handle.spawn(future)))
            }
        }

        struct TokioHandle(JoinHandle<()>);

        impl AsyncHandle for TokioHandle {
            fn is_finished(&self) -> bool {
                self.0.is_finished()
            }

            fn cancel(&self) {
                self.0.abort();
            }
        }
    }

    /// Spawner whose tasks only make progress when the host calls
    /// [`ManualSpawner::run_pending`]. Suits single-threaded embeddings and
    /// fetchers that need no reactor.
    #[derive(Default)]
    pub struct ManualSpawner {
        queue: Mutex<Vec<(Arc<TaskFlags>, BoxedTask)>>,
    }

    #[derive(Default)]
    struct TaskFlags {
        cancelled: AtomicBool,
        finished: AtomicBool,
    }

    impl ManualSpawner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of queued tasks, cancelled ones included.
        pub fn pending(&self) -> usize {
            self.queue.lock().map(|q| q.len()).unwrap_or(0)
        }

        /// Runs every queued, non-cancelled task to completion on the calling thread.
        /// Returns how many ran.
        pub fn run_pending(&self) -> usize {
            let tasks = match self.queue.lock() {
                Ok(mut queue) => std::mem::take(&mut *queue),
                Err(_) => return 0,
            };
            let mut ran = 0;
            for (flags, task) in tasks {
                if flags.cancelled.load(Ordering::Acquire) {
                    flags.finished.store(true, Ordering::Release);
                    continue;
                }
                futures::executor::block_on(task);
                flags.finished.store(true, Ordering::Release);
                ran += 1;
            }
            ran
        }
    }

    impl AsyncSpawner for ManualSpawner {
        fn spawn_boxed(&self, future: BoxedTask) -> Box<dyn AsyncHandle> {
            let flags = Arc::new(TaskFlags::default());
            if let Ok(mut queue) = self.queue.lock() {
                queue.push((flags.clone(), future));
            }
            Box::new(ManualHandle(flags))
        }
    }

    struct ManualHandle(Arc<TaskFlags>);

    impl AsyncHandle for ManualHandle {
        fn is_finished(&self) -> bool {
            self.0.finished.load(Ordering::Acquire)
        }

        fn cancel(&self) {
            self.0.cancelled.store(true, Ordering::Release);
        }
    }
}

pub use spawners::ManualSpawner;
#[cfg(feature = "tokio-runtime")]
pub use spawners::tokio_impl::TokioSpawner;

/// The spawner loaders use when none is supplied.
pub fn default_spawner() -> crate::Result<Arc<dyn AsyncSpawner>> {
    #[cfg(feature = "tokio-runtime")]
    {
        TokioSpawner::current()
            .map(|s| Arc::new(s) as Arc<dyn AsyncSpawner>)
            .ok_or_else(|| crate::MapError::Runtime("no tokio runtime available".into()))
    }

    #[cfg(not(feature = "tokio-runtime"))]
    {
        Err(crate::MapError::Runtime(
            "no default async runtime; enable 'tokio-runtime' or pass a spawner".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_manual_spawner_runs_on_demand() {
        let spawner = ManualSpawner::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let handle = spawner.spawn_boxed(Box::pin(async move {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(!handle.is_finished());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(spawner.run_pending(), 1);
        assert!(handle.is_finished());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_spawner_skips_cancelled() {
        let spawner = ManualSpawner::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let handle = spawner.spawn_boxed(Box::pin(async move {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        handle.cancel();
        assert_eq!(spawner.pending(), 1);
        assert_eq!(spawner.run_pending(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(spawner.pending(), 0);
    }

    #[cfg(feature = "tokio-runtime")]
    #[::tokio::test]
    async fn test_tokio_spawner() {
        let spawner = TokioSpawner::current().unwrap();
        let handle = spawner.spawn_boxed(Box::pin(async {
            ::tokio::time::sleep(::tokio::time::Duration::from_millis(10)).await;
        }));

        assert!(!handle.is_finished());

        ::tokio::time::sleep(::tokio::time::Duration::from_millis(50)).await;
        assert!(handle.is_finished());
    }
}
