//! Finalizer scopes.
//!
//! Acquisition steps never clean up after themselves. Each step that
//! acquires something pushes a finalizer onto the [`Scope`] it runs in, at
//! the moment acquisition completes, and only the owner of the scope drains
//! it. Draining runs finalizers last-in first-out, attempts every one of them
//! regardless of earlier failures or panics, and aggregates the failures.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;

use crate::effect::BoxFuture;
use crate::resource::branch::{Branch, BranchState};
use crate::resource::error::ReleaseErrors;
use crate::resource::exit::ExitCase;
use crate::Semigroup;

pub(crate) type Panic = Box<dyn Any + Send + 'static>;

/// A registered release action.
pub(crate) type Finalizer<E> =
    Box<dyn FnOnce(ExitCase) -> BoxFuture<'static, Result<(), ReleaseErrors<E>>> + Send>;

/// Box a release action as a [`Finalizer`].
pub(crate) fn finalizer<E, F, Fut>(release: F) -> Finalizer<E>
where
    F: FnOnce(ExitCase) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ReleaseErrors<E>>> + Send + 'static,
{
    Box::new(
        move |case: ExitCase| -> BoxFuture<'static, Result<(), ReleaseErrors<E>>> {
            Box::pin(release(case))
        },
    )
}

/// A stack of finalizers plus the branch its acquisition steps run on.
pub(crate) struct Scope<E> {
    finalizers: Arc<Mutex<Vec<Finalizer<E>>>>,
    branch: Branch,
}

impl<E> Clone for Scope<E> {
    fn clone(&self) -> Self {
        Scope {
            finalizers: Arc::clone(&self.finalizers),
            branch: self.branch.clone(),
        }
    }
}

impl<E> std::fmt::Debug for Scope<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("finalizers", &self.len())
            .field("branch", &self.branch)
            .finish()
    }
}

impl<E> Scope<E> {
    pub(crate) fn branch(&self) -> &Branch {
        &self.branch
    }

    fn stack(&self) -> MutexGuard<'_, Vec<Finalizer<E>>> {
        self.finalizers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of finalizers not yet run.
    pub(crate) fn len(&self) -> usize {
        self.stack().len()
    }

    pub(crate) fn push(&self, finalizer: Finalizer<E>) {
        self.stack().push(finalizer);
    }
}

impl<E: Send + 'static> Scope<E> {
    /// A root scope on a fresh branch.
    pub(crate) fn new() -> Self {
        Scope {
            finalizers: Arc::new(Mutex::new(Vec::new())),
            branch: Branch::new(),
        }
    }

    /// A separate stack, possibly of another error type, on the same branch.
    pub(crate) fn nested<E2: Send + 'static>(&self) -> Scope<E2> {
        Scope {
            finalizers: Arc::new(Mutex::new(Vec::new())),
            branch: self.branch.clone(),
        }
    }

    /// A separate stack on a new, independently cancellable branch.
    pub(crate) fn fork(&self) -> Self {
        Scope::new()
    }

    /// Register a user release action, wrapping its error.
    pub(crate) fn register<R, Fut>(&self, release: R)
    where
        R: FnOnce(ExitCase) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.push(finalizer(move |case| async move {
            release(case).await.map_err(ReleaseErrors::new)
        }));
    }

    /// Register a finalizer that drains `nested`, mapping its errors.
    pub(crate) fn adopt<E2, F>(&self, nested: Scope<E2>, map_err: F)
    where
        E2: Send + 'static,
        F: Fn(E2) -> E + Send + Sync + 'static,
    {
        self.push(finalizer(move |case| async move {
            nested.release_all(case).await.map_err(|r| r.map(map_err))
        }));
    }

    /// Run every finalizer, last registered first.
    ///
    /// All finalizers are attempted. Failures are aggregated; if any
    /// finalizer panics, the first panic resumes after the rest have run.
    pub(crate) async fn release_all(&self, case: ExitCase) -> Result<(), ReleaseErrors<E>> {
        let finalizers = std::mem::take(&mut *self.stack());
        let mut failures: Option<ReleaseErrors<E>> = None;
        let mut first_panic: Option<Panic> = None;

        for finalizer in finalizers.into_iter().rev() {
            let outcome = AssertUnwindSafe(async move { finalizer(case).await })
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(errors)) => {
                    failures = Some(match failures {
                        Some(earlier) => earlier.combine(errors),
                        None => errors,
                    });
                }
                Err(payload) => {
                    first_panic.get_or_insert(payload);
                }
            }
        }

        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
        failures.map_or(Ok(()), Err)
    }

    /// Drain this scope as its owner: marks the branch as releasing, runs
    /// every finalizer, then marks it done.
    pub(crate) async fn drain(&self, case: ExitCase) -> Result<(), ReleaseErrors<E>> {
        self.branch.enter(BranchState::Releasing);
        let released = AssertUnwindSafe(self.release_all(case)).catch_unwind().await;
        self.branch.enter(BranchState::Done);

        #[cfg(feature = "tracing")]
        tracing::debug!(%case, "resource scope drained");

        released.unwrap_or_else(|payload| panic::resume_unwind(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    type Order = Arc<StdMutex<Vec<&'static str>>>;

    fn recording(order: &Order, name: &'static str) -> Finalizer<String> {
        let order = Arc::clone(order);
        finalizer(move |_| async move {
            order.lock().unwrap().push(name);
            Ok(())
        })
    }

    #[tokio::test]
    async fn release_all_runs_in_reverse_order() {
        let order = Arc::new(StdMutex::new(Vec::new()));
        let scope = Scope::<String>::new();
        scope.push(recording(&order, "first"));
        scope.push(recording(&order, "second"));
        scope.push(recording(&order, "third"));

        assert_eq!(scope.release_all(ExitCase::Succeeded).await, Ok(()));
        assert_eq!(*order.lock().unwrap(), vec!["third", "second", "first"]);
        assert_eq!(scope.len(), 0);
    }

    #[tokio::test]
    async fn release_all_attempts_every_finalizer_after_failure() {
        let order = Arc::new(StdMutex::new(Vec::new()));
        let scope = Scope::<String>::new();
        scope.push(recording(&order, "first"));
        scope.register(|_| async { Err("second failed".to_string()) });
        scope.push(recording(&order, "third"));
        scope.register(|_| async { Err("fourth failed".to_string()) });

        let result = scope.release_all(ExitCase::Errored).await;

        assert_eq!(*order.lock().unwrap(), vec!["third", "first"]);
        let errors = result.unwrap_err().into_vec();
        assert_eq!(errors, vec!["fourth failed".to_string(), "second failed".to_string()]);
    }

    #[tokio::test]
    async fn release_all_passes_exit_case() {
        let seen = Arc::new(StdMutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let scope = Scope::<String>::new();
        scope.register(move |case| async move {
            *seen_clone.lock().unwrap() = Some(case);
            Ok(())
        });

        scope.release_all(ExitCase::Canceled).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(ExitCase::Canceled));
    }

    #[tokio::test]
    async fn panicking_finalizer_does_not_skip_the_rest() {
        let order = Arc::new(StdMutex::new(Vec::new()));
        let scope = Scope::<String>::new();
        scope.push(recording(&order, "first"));
        scope.push(finalizer(|_| async {
            if true {
                panic!("finalizer exploded");
            }
            Ok::<(), ReleaseErrors<String>>(())
        }));

        let outcome = AssertUnwindSafe(scope.release_all(ExitCase::Succeeded))
            .catch_unwind()
            .await;

        assert!(outcome.is_err(), "panic resumes after draining");
        assert_eq!(*order.lock().unwrap(), vec!["first"]);
    }

    #[tokio::test]
    async fn adopted_scope_maps_errors() {
        let outer = Scope::<String>::new();
        let inner = outer.nested::<u32>();
        inner.register(|_| async { Err(7_u32) });
        outer.adopt(inner, |code: u32| format!("code {}", code));

        let errors = outer.release_all(ExitCase::Succeeded).await.unwrap_err();
        assert_eq!(errors.into_vec(), vec!["code 7".to_string()]);
    }

    #[tokio::test]
    async fn drain_marks_branch_done() {
        let scope = Scope::<String>::new();
        scope.drain(ExitCase::Succeeded).await.unwrap();
        assert_eq!(scope.branch().state(), BranchState::Done);
    }
}
