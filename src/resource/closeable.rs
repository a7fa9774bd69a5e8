//! Resources for handles that know how to close themselves.

use std::future::Future;
use std::sync::Arc;

use crate::effect::{Effect, EffectExt};
use crate::resource::Resource;

/// A handle with an asynchronous close operation.
///
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use sluice::prelude::*;
///
/// struct Conn { closed: AtomicBool }
///
/// impl Close for Conn {
///     type Error = String;
///
///     async fn close(&self) -> Result<(), String> {
///         self.closed.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let conn = Resource::from_closeable(pure::<_, String, ()>(Conn { closed: AtomicBool::new(false) }));
/// let handle = conn.use_(&(), |c| pure(c)).await.unwrap();
/// assert!(handle.closed.load(Ordering::SeqCst));
/// # });
/// ```
pub trait Close: Send + Sync + 'static {
    /// Error returned when closing fails.
    type Error: Send + std::fmt::Debug + 'static;

    /// Close the handle. Called exactly once by the owning resource.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

impl Close for tokio::fs::File {
    type Error = std::io::Error;

    async fn close(&self) -> Result<(), std::io::Error> {
        self.sync_all().await
    }
}

impl<H, Env> Resource<Arc<H>, H::Error, Env>
where
    H: Close,
    Env: Clone + Send + Sync + 'static,
{
    /// Build a resource whose release closes the acquired handle.
    ///
    /// The handle is shared as an `Arc` so the body can keep using it while
    /// the release action holds its own reference.
    pub fn from_closeable<Acq>(acquire: Acq) -> Self
    where
        Acq: Effect<Output = H, Error = H::Error, Env = Env> + 'static,
    {
        Resource::make(acquire.map(Arc::new), |handle: Arc<H>| async move {
            handle.close().await
        })
    }
}
