//! Testing utilities for code built on resources.
//!
//! [`Journal`] records timestamped events from acquire and release actions,
//! so tests can assert on ordering and, under a paused tokio clock, on
//! timing. The assertion macros cover the common shapes of
//! [`ResourceError`](crate::ResourceError).
//!
//! # Examples
//!
//! ## Journal
//!
//! ```rust
//! use sluice::prelude::*;
//! use sluice::testing::Journal;
//!
//! # tokio_test::block_on(async {
//! let journal = Journal::new();
//! let chain = journal
//!     .tracked::<String, ()>("a")
//!     .zip(journal.tracked("b"));
//!
//! chain.use_(&(), |_| pure(())).await.unwrap();
//!
//! assert_eq!(
//!     journal.events(),
//!     vec!["acquire a", "acquire b", "release b", "release a"]
//! );
//! # });
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use sluice::{assert_acquire_error, assert_canceled, ResourceError};
//!
//! let failed: Result<(), _> = Err(ResourceError::Acquire("refused"));
//! assert_acquire_error!(failed, "refused");
//!
//! let canceled: Result<(), ResourceError<&str>> = Err(ResourceError::Canceled { release: None });
//! assert_canceled!(canceled);
//! ```

use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::effect::{from_async, EffectExt};
use crate::resource::Resource;

/// A recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Time since the journal was created.
    pub at: Duration,
    /// What happened.
    pub event: String,
}

/// Shared, timestamped event log.
///
/// Clones share the same log. Timestamps use the tokio clock, so under
/// `#[tokio::test(start_paused = true)]` they are exact.
#[derive(Debug, Clone)]
pub struct Journal {
    start: Instant,
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal {
    /// Create an empty journal starting now.
    pub fn new() -> Self {
        Journal {
            start: Instant::now(),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an event at the current time.
    pub fn record(&self, event: impl Into<String>) {
        let entry = Entry {
            at: self.start.elapsed(),
            event: event.into(),
        };
        self.lock().push(entry);
    }

    /// Every recorded entry, oldest first.
    pub fn entries(&self) -> Vec<Entry> {
        self.lock().clone()
    }

    /// Every recorded event, oldest first.
    pub fn events(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.event.clone()).collect()
    }

    /// Events recorded during whole second `secs`.
    pub fn events_at(&self, secs: u64) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|e| e.at.as_secs() == secs)
            .map(|e| e.event.clone())
            .collect()
    }

    /// When `event` was first recorded.
    pub fn at(&self, event: &str) -> Option<Duration> {
        self.lock().iter().find(|e| e.event == event).map(|e| e.at)
    }

    /// Number of events starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.lock()
            .iter()
            .filter(|e| e.event.starts_with(prefix))
            .count()
    }

    /// Names of released resources, in release order.
    pub fn released(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| e.event.strip_prefix("release ").map(str::to_string))
            .collect()
    }

    /// A resource recording `acquire {name}` and `release {name}`.
    pub fn tracked<E, Env>(&self, name: &'static str) -> Resource<&'static str, E, Env>
    where
        E: Send + Debug + 'static,
        Env: Clone + Send + Sync + 'static,
    {
        self.tracked_after(name, Duration::ZERO)
    }

    /// Like [`Journal::tracked`], with an uninterruptible acquire step that
    /// takes `delay`.
    pub fn tracked_after<E, Env>(
        &self,
        name: &'static str,
        delay: Duration,
    ) -> Resource<&'static str, E, Env>
    where
        E: Send + Debug + 'static,
        Env: Clone + Send + Sync + 'static,
    {
        let acquired = self.clone();
        let released = self.clone();
        Resource::make(
            from_async(move |_: &Env| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                acquired.record(format!("acquire {}", name));
                Ok::<_, E>(name)
            }),
            move |name| async move {
                released.record(format!("release {}", name));
                Ok(())
            },
        )
    }

    /// A resource with an interruptible step taking `delay`, recording
    /// `finish {name}` if it completes. It registers no release.
    pub fn lifted_after<E, Env>(
        &self,
        name: &'static str,
        delay: Duration,
    ) -> Resource<&'static str, E, Env>
    where
        E: Send + Debug + 'static,
        Env: Clone + Send + Sync + 'static,
    {
        let journal = self.clone();
        Resource::eval(
            from_async(move |_: &Env| async move {
                tokio::time::sleep(delay).await;
                Ok::<_, E>(())
            })
            .map(move |()| {
                journal.record(format!("finish {}", name));
                name
            }),
        )
    }
}

/// Assert that a resource result failed during acquisition.
///
/// # Example
///
/// ```rust
/// use sluice::{assert_acquire_error, ResourceError};
///
/// let result: Result<(), _> = Err(ResourceError::Acquire("no socket"));
/// assert_acquire_error!(result, "no socket");
/// ```
#[macro_export]
macro_rules! assert_acquire_error {
    ($result:expr, $expected:expr) => {
        match $result {
            Err($crate::ResourceError::Acquire(e)) => assert_eq!(e, $expected),
            other => panic!("Expected Acquire error, got {:?}", other),
        }
    };
}

/// Assert that a resource result failed in the body with release succeeding.
///
/// # Example
///
/// ```rust
/// use sluice::{assert_use_error, ResourceError};
///
/// let result: Result<(), _> = Err(ResourceError::Use("bad query"));
/// assert_use_error!(result, "bad query");
/// ```
#[macro_export]
macro_rules! assert_use_error {
    ($result:expr, $expected:expr) => {
        match $result {
            Err($crate::ResourceError::Use(e)) => assert_eq!(e, $expected),
            other => panic!("Expected Use error, got {:?}", other),
        }
    };
}

/// Assert that a resource scope was cancelled.
///
/// # Example
///
/// ```rust
/// use sluice::{assert_canceled, ResourceError};
///
/// let result: Result<(), ResourceError<String>> = Err(ResourceError::Canceled { release: None });
/// assert_canceled!(result);
/// ```
#[macro_export]
macro_rules! assert_canceled {
    ($result:expr) => {
        match $result {
            Err($crate::ResourceError::Canceled { .. }) => {}
            other => panic!("Expected Canceled, got {:?}", other),
        }
    };
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl Arbitrary for crate::ExitCase {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            Just(crate::ExitCase::Succeeded),
            Just(crate::ExitCase::Errored),
            Just(crate::ExitCase::Canceled),
        ]
        .boxed()
    }
}
