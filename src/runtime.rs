//! Runtime abstraction for the download worker pool
//!
//! The downloader only needs somewhere to spawn futures. [`TokioSpawner`]
//! either owns a dedicated multi-threaded tokio runtime or borrows a handle
//! to one the application already runs.

use crate::{MapError, Result};
use std::future::Future;
use std::pin::Pin;
use tokio::runtime::{Builder, Handle, Runtime};

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and detach it
    fn spawn_boxed(&self, future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>);
}

/// Tokio-based async spawner
pub struct TokioSpawner {
    handle: Handle,
    runtime: Option<Runtime>,
}

impl TokioSpawner {
    /// Builds a dedicated runtime with `worker_threads` threads.
    pub fn new(worker_threads: usize) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("slippy-view-worker")
            .enable_all()
            .build()
            .map_err(|e| MapError::Runtime(format!("failed to start worker runtime: {e}")))?;
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    /// Spawns onto an existing runtime.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            runtime: None,
        }
    }

    /// Borrows the runtime of the calling context, if there is one.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::from_handle)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl AsyncSpawner for TokioSpawner {
    fn spawn_boxed(&self, future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>) {
        self.handle.spawn(future);
    }
}

impl Drop for TokioSpawner {
    fn drop(&mut self) {
        // A blocking shutdown would panic when the last owner lives inside async code.
        if let Some(runtime) = self.runtime.take() {
            log::debug!("shutting down worker runtime");
            runtime.shutdown_background();
        }
    }
}
