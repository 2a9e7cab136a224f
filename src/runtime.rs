//! Runtime abstraction layer for async operations
//!
//! Fetches are spawned through an [`AsyncSpawner`]. With the `tokio-runtime`
//! feature the spawner hands futures to the ambient tokio runtime; without
//! it each future is driven on its own thread by a single-threaded tokio
//! runtime, so reqwest always finds a reactor.

use crate::prelude::{Future, Pin};
use crate::Result;
use std::sync::OnceLock;

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future; it runs to completion in the background
    fn spawn_boxed(&self, future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>) -> Result<()>;
}

/// Spawn a future on the global runtime
pub fn spawn<F>(future: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    runtime().spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use crate::MapError;
        use ::tokio::runtime::Handle;

        /// Spawns onto the tokio runtime the calling thread has entered
        pub struct TokioSpawner;

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(
                &self,
                future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
            ) -> Result<()> {
                let handle = Handle::try_current().map_err(|e| {
                    MapError::Runtime(format!("no tokio runtime entered: {}", e))
                })?;
                handle.spawn(future);
                Ok(())
            }
        }
    }

    pub mod thread {
        use super::*;

        /// Drives each future on a detached thread with its own
        /// current-thread tokio runtime
        pub struct ThreadSpawner;

        impl AsyncSpawner for ThreadSpawner {
            fn spawn_boxed(
                &self,
                future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
            ) -> Result<()> {
                let runtime = ::tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                std::thread::Builder::new()
                    .name("chronomap-fetch".to_string())
                    .spawn(move || runtime.block_on(future))?;
                Ok(())
            }
        }
    }
}

/// Global runtime instance
static RUNTIME: OnceLock<Box<dyn AsyncSpawner>> = OnceLock::new();

/// Get the global runtime spawner
pub fn runtime() -> &'static dyn AsyncSpawner {
    RUNTIME
        .get_or_init(|| {
            #[cfg(feature = "tokio-runtime")]
            {
                Box::new(spawners::tokio_impl::TokioSpawner)
            }

            #[cfg(not(feature = "tokio-runtime"))]
            {
                Box::new(spawners::thread::ThreadSpawner)
            }
        })
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[cfg(feature = "tokio-runtime")]
    #[::tokio::test]
    async fn test_tokio_spawner() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        spawn(async move {
            ::tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(3);
        })
        .unwrap();

        assert!(rx.try_recv().is_err());
        ::tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(rx.try_recv(), Ok(3));
    }

    #[cfg(feature = "tokio-runtime")]
    #[test]
    fn test_tokio_spawner_needs_runtime() {
        let result = spawners::tokio_impl::TokioSpawner.spawn_boxed(Box::pin(async {}));
        assert!(matches!(result, Err(crate::MapError::Runtime(_))));
    }

    #[test]
    fn test_thread_spawner_provides_a_reactor() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        spawners::thread::ThreadSpawner
            .spawn_boxed(Box::pin(async move {
                // Timers and sockets panic without a tokio reactor.
                ::tokio::time::sleep(Duration::from_millis(5)).await;
                let _ = tx.send(7);
            }))
            .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok(7));
    }
}
