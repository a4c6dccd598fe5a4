use std::future::Future;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::oneshot;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};

/// Runs async exchange operations for synchronous callers.
///
/// Each call is spawned as its own task on a multi-threaded runtime and the
/// calling thread waits on a oneshot channel for the single result. A task
/// that panics drops its sender, which the caller sees as `Aborted`.
pub struct BlockingExecutor {
    runtime: Runtime,
}

impl BlockingExecutor {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        if config.worker_threads == Some(0) {
            return Err(GatewayError::Config(
                "worker_threads must be at least 1".to_string(),
            ));
        }

        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name(config.thread_name.clone());
        if let Some(threads) = config.worker_threads {
            builder.worker_threads(threads);
        }
        let runtime = builder
            .build()
            .map_err(|e| GatewayError::Runtime(e.to_string()))?;
        Ok(Self { runtime })
    }

    /// Run `future` to completion and return its output.
    ///
    /// Must not be called from inside an async runtime: blocking a runtime
    /// thread on its own work can deadlock, so that case returns `Reentrant`.
    pub fn block_on<F, T>(&self, future: F) -> GatewayResult<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(GatewayError::Reentrant);
        }

        let (tx, rx) = oneshot::channel();
        self.runtime.spawn(async move {
            // The receiver only goes away if the caller thread died.
            let _ = tx.send(future.await);
        });
        rx.blocking_recv().map_err(|_| GatewayError::Aborted)
    }
}

impl std::fmt::Debug for BlockingExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingExecutor").finish_non_exhaustive()
    }
}
