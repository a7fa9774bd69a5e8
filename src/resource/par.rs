//! Parallel acquisition.
//!
//! [`Resource::par_zip`] acquires both sides concurrently, each on its own
//! branch with its own finalizer stack. When one side fails, the other is
//! asked to cancel: an uninterruptible acquire step in flight finishes first
//! and registers its release, an interruptible one is cut short. Both stacks
//! are released together, as one finalizer of the enclosing scope.

use std::convert::Infallible;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use futures::FutureExt;

use crate::resource::error::ReleaseErrors;
use crate::resource::scope::{finalizer, Finalizer, Panic, Scope};
use crate::resource::{Halt, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

type Outcome<T, E> = Result<Result<T, Halt<E>>, Panic>;

fn settled_ok<T, E>(outcome: &Outcome<T, E>) -> bool {
    matches!(outcome, Ok(Ok(_)))
}

fn settled_failed<T, E>(outcome: &Outcome<T, E>) -> bool {
    matches!(outcome, Ok(Err(Halt::Failed(_))) | Err(_))
}

/// Release both sides at once, keeping every failure.
fn joint_release<E>(left: Scope<E>, right: Scope<E>) -> Finalizer<E>
where
    E: Send + Debug + 'static,
{
    finalizer(move |case| async move {
        let (left, right) = futures::future::join(
            AssertUnwindSafe(left.drain(case)).catch_unwind(),
            AssertUnwindSafe(right.drain(case)).catch_unwind(),
        )
        .await;

        match (left, right) {
            (Err(payload), _) | (_, Err(payload)) => panic::resume_unwind(payload),
            (Ok(left), Ok(right)) => ReleaseErrors::merge(left, right),
        }
    })
}

/// Combine both outcomes. A panic wins, then a failure, then cancellation.
/// When both sides fail, the first to fail is kept.
fn settle<T, U, E>(
    left: Outcome<T, E>,
    right: Outcome<U, E>,
    first_failure: Option<Side>,
) -> Result<(T, U), Halt<E>>
where
    E: Debug,
{
    match (left, right) {
        (Err(payload), _) | (_, Err(payload)) => panic::resume_unwind(payload),
        (Ok(Ok(left)), Ok(Ok(right))) => Ok((left, right)),
        (Ok(Err(Halt::Failed(left))), Ok(Err(Halt::Failed(right)))) => {
            let (kept, other) = match first_failure {
                Some(Side::Right) => (right, left),
                _ => (left, right),
            };

            #[cfg(feature = "tracing")]
            tracing::warn!(error = ?other, "parallel acquisition: both sides failed");
            #[cfg(not(feature = "tracing"))]
            let _ = other;

            Err(Halt::Failed(kept))
        }
        (Ok(Err(Halt::Failed(error))), _) | (_, Ok(Err(Halt::Failed(error)))) => {
            Err(Halt::Failed(error))
        }
        _ => Err(Halt::Canceled),
    }
}

impl<T, E, Env> Resource<T, E, Env>
where
    T: Send + 'static,
    E: Send + Debug + 'static,
    Env: Clone + Send + Sync + 'static,
{
    /// Acquire `self` and `other` concurrently.
    ///
    /// Both sides are released together when the enclosing scope ends.
    /// If one side fails, the other is cancelled: an uninterruptible
    /// acquire step in flight (one built with [`Resource::make`]) finishes
    /// and is then released, an interruptible one (from
    /// [`Resource::eval`]) is dropped. The first failure is reported.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use sluice::prelude::*;
    ///
    /// fn slow(millis: u64) -> Resource<u64, String> {
    ///     Resource::make(
    ///         from_async(move |_: &()| async move {
    ///             tokio::time::sleep(Duration::from_millis(millis)).await;
    ///             Ok::<_, String>(millis)
    ///         }),
    ///         |_| async { Ok(()) },
    ///     )
    /// }
    ///
    /// # tokio_test::block_on(async {
    /// let both = slow(20).par_zip(slow(10));
    /// assert_eq!(both.use_(&(), |(a, b)| pure(a + b)).await, Ok(30));
    /// # });
    /// ```
    pub fn par_zip<U>(self, other: Resource<U, E, Env>) -> Resource<(T, U), E, Env>
    where
        U: Send + 'static,
    {
        Resource::from_acquire(move |env: Env, scope: Scope<E>| async move {
            let left_scope = scope.fork();
            let right_scope = scope.fork();
            scope.push(joint_release(left_scope.clone(), right_scope.clone()));

            let first_failure = OnceLock::new();

            let left = async {
                let outcome = AssertUnwindSafe(self.acquire_in(env.clone(), left_scope.clone()))
                    .catch_unwind()
                    .await;
                if settled_failed(&outcome) {
                    let _ = first_failure.set(Side::Left);
                }
                if !settled_ok(&outcome) {
                    right_scope.branch().request_cancel();
                }
                outcome
            };
            let right = async {
                let outcome = AssertUnwindSafe(other.acquire_in(env.clone(), right_scope.clone()))
                    .catch_unwind()
                    .await;
                if settled_failed(&outcome) {
                    let _ = first_failure.set(Side::Right);
                }
                if !settled_ok(&outcome) {
                    left_scope.branch().request_cancel();
                }
                outcome
            };
            let forward_cancel = async {
                scope.branch().interrupted().await;
                left_scope.branch().request_cancel();
                right_scope.branch().request_cancel();
                futures::future::pending::<Infallible>().await
            };

            let (left, right) = tokio::select! {
                outcomes = futures::future::join(left, right) => outcomes,
                never = forward_cancel => match never {},
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(
                left_ok = settled_ok(&left),
                right_ok = settled_ok(&right),
                "parallel acquisition settled"
            );

            settle(left, right, first_failure.get().copied())
        })
    }

    /// Acquire three resources concurrently.
    pub fn par_zip3<U, V>(
        self,
        second: Resource<U, E, Env>,
        third: Resource<V, E, Env>,
    ) -> Resource<(T, U, V), E, Env>
    where
        U: Send + 'static,
        V: Send + 'static,
    {
        self.par_zip(second.par_zip(third))
            .map(|(a, (b, c))| (a, b, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{fail, from_async, pure};
    use crate::resource::ResourceError;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    type Log = Arc<Mutex<Vec<(u64, String)>>>;

    fn at(log: &Log, start: Instant, event: String) {
        log.lock().unwrap().push((start.elapsed().as_secs(), event));
    }

    fn timed(log: &Log, start: Instant, name: &'static str, secs: u64) -> Resource<&'static str, String> {
        let open = Arc::clone(log);
        let close = Arc::clone(log);
        Resource::make(
            from_async(move |_: &()| async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                at(&open, start, format!("acquired {}", name));
                Ok::<_, String>(name)
            }),
            move |name| async move {
                at(&close, start, format!("released {}", name));
                Ok(())
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn sides_run_concurrently() {
        let log = Log::default();
        let start = Instant::now();

        let both = timed(&log, start, "a", 2).par_zip(timed(&log, start, "b", 1));
        let result = both.use_(&(), |pair| pure(pair)).await;

        assert_eq!(result, Ok(("a", "b")));
        assert_eq!(start.elapsed().as_secs(), 2);
        let log = log.lock().unwrap().clone();
        assert_eq!(&log[..2], &[(1, "acquired b".to_string()), (2, "acquired a".to_string())]);
        assert_eq!(log.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_waits_for_uninterruptible_sibling() {
        let log = Log::default();
        let start = Instant::now();
        let failing: Resource<&'static str, String> = Resource::eval(from_async(|_: &()| async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Err::<&'static str, _>("left failed".to_string())
        }));

        let result = failing
            .par_zip(timed(&log, start, "slow", 3))
            .use_(&(), |pair| pure(pair))
            .await;

        assert_eq!(result, Err(ResourceError::Acquire("left failed".to_string())));
        assert_eq!(
            *log.lock().unwrap(),
            vec![(3, "acquired slow".to_string()), (3, "released slow".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failure_interrupts_interruptible_sibling() {
        let log = Log::default();
        let start = Instant::now();
        let failing: Resource<(), String> = Resource::make(fail("boom".to_string()), |_| async { Ok(()) });
        let record = Arc::clone(&log);
        let lifted: Resource<(), String> = Resource::eval(from_async(move |_: &()| async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            at(&record, start, "lifted finished".to_string());
            Ok(())
        }));

        let result = failing.par_zip(lifted).use_(&(), |_| pure(())).await;

        assert_eq!(result, Err(ResourceError::Acquire("boom".to_string())));
        assert_eq!(start.elapsed().as_secs(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_failure_skips_sibling_acquire() {
        let log = Log::default();
        let start = Instant::now();
        let failing: Resource<(), String> = Resource::make(fail("boom".to_string()), |_| async { Ok(()) });

        let result = failing
            .par_zip(timed(&log, start, "late", 3))
            .use_(&(), |_| pure(()))
            .await;

        assert_eq!(result, Err(ResourceError::Acquire("boom".to_string())));
        assert_eq!(start.elapsed().as_secs(), 0);
        assert!(log.lock().unwrap().is_empty(), "sibling never acquired");
    }

    #[tokio::test]
    async fn both_failing_keeps_first_failure() {
        let left: Resource<(), String> = Resource::eval(fail("left".to_string()));
        let right: Resource<(), String> = Resource::eval(from_async(|_: &()| async {
            tokio::task::yield_now().await;
            Err::<(), _>("right".to_string())
        }));

        let result = left.par_zip(right).use_(&(), |_| pure(())).await;
        assert_eq!(result, Err(ResourceError::Acquire("left".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn par_zip3_releases_every_side() {
        let log = Log::default();
        let start = Instant::now();
        let all = timed(&log, start, "a", 1).par_zip3(timed(&log, start, "b", 2), timed(&log, start, "c", 3));

        let result = all.use_(&(), |triple| pure(triple)).await;

        assert_eq!(result, Ok(("a", "b", "c")));
        let released = log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, event)| event.starts_with("released"))
            .count();
        assert_eq!(released, 3);
    }

    #[tokio::test]
    async fn release_failures_from_both_sides_are_kept() {
        let left: Resource<(), String> = Resource::make(pure(()), |_| async { Err("left".to_string()) });
        let right: Resource<(), String> = Resource::make(pure(()), |_| async { Err("right".to_string()) });

        let result = left.par_zip(right).use_(&(), |_| pure(())).await;

        let errors = result.unwrap_err().release_errors().cloned().unwrap().into_vec();
        assert_eq!(errors, vec!["left".to_string(), "right".to_string()]);
    }
}
