//! Running resources: `use_`, `with` and `allocated`.
//!
//! Each driver owns a root scope and runs it on a spawned task. Dropping the
//! driver's future requests cancellation of the scope instead of abandoning
//! it, so release actions still run to completion on the runtime.

use std::fmt::Debug;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::effect::Effect;
use crate::resource::branch::Branch;
use crate::resource::error::{ReleaseErrors, ResourceError};
use crate::resource::exit::ExitCase;
use crate::resource::scope::Scope;
use crate::resource::{Halt, Resource};

/// Requests cancellation of a branch if dropped before being disarmed.
struct CancelOnDrop {
    branch: Option<Branch>,
}

impl CancelOnDrop {
    fn new(branch: Branch) -> Self {
        CancelOnDrop {
            branch: Some(branch),
        }
    }

    fn disarm(mut self) {
        self.branch = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(branch) = self.branch.take() {
            branch.request_cancel();
        }
    }
}

/// Run `task` on the runtime, cancelling `branch` if the caller goes away.
/// A panic inside the task resumes here. Returns `None` if the runtime
/// cancelled the task.
async fn supervise<T, F>(branch: Branch, task: F) -> Option<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let guard = CancelOnDrop::new(branch);
    let joined = tokio::spawn(task).await;
    guard.disarm();

    match joined {
        Ok(value) => Some(value),
        Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
        Err(_) => None,
    }
}

pub(crate) fn report_release_failure<E: Debug>(errors: &ReleaseErrors<E>) {
    #[cfg(feature = "tracing")]
    tracing::warn!(
        failures = errors.len(),
        first = ?errors.first(),
        "resource release failed"
    );
    #[cfg(not(feature = "tracing"))]
    eprintln!(
        "resource release failed ({} failures): {:?}",
        errors.len(),
        errors.first()
    );
}

async fn drain_reporting<E>(scope: &Scope<E>, case: ExitCase) -> Result<(), ReleaseErrors<E>>
where
    E: Send + Debug + 'static,
{
    let released = scope.drain(case).await;
    if let Err(errors) = &released {
        report_release_failure(errors);
    }
    released
}

/// Acquire `resource` into `scope`. On failure everything acquired so far is
/// released before returning; a panic releases and then resumes.
async fn acquire_root<T, E, Env>(
    resource: Resource<T, E, Env>,
    env: Env,
    scope: &Scope<E>,
) -> Result<T, ResourceError<E>>
where
    T: Send + 'static,
    E: Send + Debug + 'static,
    Env: Clone + Send + Sync + 'static,
{
    let acquired = AssertUnwindSafe(resource.acquire_in(env, scope.clone()))
        .catch_unwind()
        .await;

    match acquired {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(halt)) => {
            let released = drain_reporting(scope, halt.exit_case()).await;
            Err(match halt {
                Halt::Failed(error) => ResourceError::acquisition(error, released),
                Halt::Canceled => ResourceError::canceled(released),
            })
        }
        Err(payload) => {
            let _ = drain_reporting(scope, ExitCase::Errored).await;
            panic::resume_unwind(payload)
        }
    }
}

async fn use_scope<T, U, E, Env, F, Body>(
    resource: Resource<T, E, Env>,
    env: Env,
    scope: Scope<E>,
    f: F,
) -> Result<U, ResourceError<E>>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + Debug + 'static,
    Env: Clone + Send + Sync + 'static,
    F: FnOnce(T) -> Body + Send + 'static,
    Body: Effect<Output = U, Error = E, Env = Env> + 'static,
{
    let value = acquire_root(resource, env.clone(), &scope).await?;

    let env_ref = &env;
    let body = AssertUnwindSafe(async move { f(value).run(env_ref).await }).catch_unwind();

    match scope.branch().interruptible(body).await {
        Some(Ok(Ok(output))) => match drain_reporting(&scope, ExitCase::Succeeded).await {
            Ok(()) => Ok(output),
            Err(errors) => Err(ResourceError::Release(errors)),
        },
        Some(Ok(Err(error))) => {
            let released = drain_reporting(&scope, ExitCase::Errored).await;
            Err(ResourceError::body(error, released))
        }
        Some(Err(payload)) => {
            let _ = drain_reporting(&scope, ExitCase::Errored).await;
            panic::resume_unwind(payload)
        }
        None => {
            let released = drain_reporting(&scope, ExitCase::Canceled).await;
            Err(ResourceError::canceled(released))
        }
    }
}

impl<T, E, Env> Resource<T, E, Env>
where
    T: Send + 'static,
    E: Send + Debug + 'static,
    Env: Clone + Send + Sync + 'static,
{
    /// Acquire the resource, run `f` with it, then release.
    ///
    /// Release runs on every outcome of the body, last acquired first. The
    /// returned error names the phase that failed; when both the body and a
    /// release fail, both are reported in [`ResourceError::Both`].
    ///
    /// Dropping the returned future cancels the scope: an acquire step in
    /// progress finishes, the body is interrupted and everything acquired is
    /// released in the background.
    ///
    /// # Panics
    ///
    /// A panic in acquisition or in the body releases everything acquired
    /// and then resumes in the caller.
    pub async fn use_<U, F, Body>(self, env: &Env, f: F) -> Result<U, ResourceError<E>>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Body + Send + 'static,
        Body: Effect<Output = U, Error = E, Env = Env> + 'static,
    {
        let scope = Scope::new();
        let branch = scope.branch().clone();
        supervise(branch, use_scope(self, env.clone(), scope, f))
            .await
            .unwrap_or(Err(ResourceError::Canceled { release: None }))
    }

    /// Turn `use_` into an effect, for composing with other effects.
    ///
    /// ```rust
    /// use sluice::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let effect = Resource::<_, String>::pure(2)
    ///     .with(|n| pure(n * 21))
    ///     .map_err(|e| e.to_string());
    /// assert_eq!(effect.run(&()).await, Ok(42));
    /// # });
    /// ```
    pub fn with<U, F, Body>(self, f: F) -> ResourceWith<T, E, Env, F>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Body + Send + 'static,
        Body: Effect<Output = U, Error = E, Env = Env> + 'static,
    {
        ResourceWith {
            resource: self,
            use_fn: f,
        }
    }

    /// Acquire the resource and hand back the value with its release action,
    /// leaving the caller in charge of when to release.
    ///
    /// If acquisition fails, whatever was acquired is released before the
    /// error is returned. If the returned future is dropped while acquiring,
    /// everything acquired is released in the background.
    ///
    /// ```rust
    /// use sluice::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let resource = Resource::make(pure::<_, String, ()>(7), |_| async { Ok(()) });
    /// let (value, release) = resource.allocated(&()).await.unwrap();
    /// assert_eq!(value, 7);
    /// assert_eq!(release.pending(), 1);
    /// release.release().await.unwrap();
    /// # });
    /// ```
    pub async fn allocated(self, env: &Env) -> Result<(T, Release<E>), ResourceError<E>> {
        let scope = Scope::new();
        let task_scope = scope.clone();
        let env = env.clone();

        let task = tokio::spawn(async move {
            let value = acquire_root(self, env, &task_scope).await?;
            if task_scope.branch().is_cancel_requested() {
                drop(value);
                let released = drain_reporting(&task_scope, ExitCase::Canceled).await;
                return Err(ResourceError::canceled(released));
            }
            Ok(value)
        });

        match Allocation::new(task, scope.clone()).join().await {
            Some(Ok(value)) => Ok((value, Release::new(scope))),
            Some(Err(error)) => Err(error),
            None => Err(ResourceError::Canceled { release: None }),
        }
    }
}

/// An acquisition running on its own task, owned until its result reaches
/// the caller. Dropped early, it cancels the acquisition and releases
/// whatever the task hands back.
struct Allocation<T, E>
where
    T: Send + 'static,
    E: Send + Debug + 'static,
{
    task: Option<JoinHandle<Result<T, ResourceError<E>>>>,
    scope: Scope<E>,
}

impl<T, E> Allocation<T, E>
where
    T: Send + 'static,
    E: Send + Debug + 'static,
{
    fn new(task: JoinHandle<Result<T, ResourceError<E>>>, scope: Scope<E>) -> Self {
        Allocation {
            task: Some(task),
            scope,
        }
    }

    /// Wait for the task. A panic inside it resumes here; `None` if the
    /// runtime cancelled it.
    async fn join(mut self) -> Option<Result<T, ResourceError<E>>> {
        let joined = match self.task.as_mut() {
            Some(task) => task.await,
            None => return None,
        };
        self.task = None;

        match joined {
            Ok(outcome) => Some(outcome),
            Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
            Err(_) => None,
        }
    }
}

impl<T, E> Drop for Allocation<T, E>
where
    T: Send + 'static,
    E: Send + Debug + 'static,
{
    fn drop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        self.scope.branch().request_cancel();

        let scope = self.scope.clone();
        let cleanup = async move {
            // a task that saw the cancel has already released
            if let Ok(Ok(value)) = task.await {
                drop(value);
                let _ = drain_reporting(&scope, ExitCase::Canceled).await;
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(cleanup);
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("allocation dropped outside a runtime; resources may leak");
                #[cfg(not(feature = "tracing"))]
                eprintln!("allocation dropped outside a runtime; resources may leak");
            }
        }
    }
}

// ============================================================================
// ResourceWith
// ============================================================================

/// The effect returned by [`Resource::with`].
pub struct ResourceWith<T, E, Env, F> {
    resource: Resource<T, E, Env>,
    use_fn: F,
}

impl<T, E, Env, F> std::fmt::Debug for ResourceWith<T, E, Env, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceWith")
            .field("resource", &self.resource)
            .field("use_fn", &"<function>")
            .finish()
    }
}

impl<T, U, E, Env, F, Body> Effect for ResourceWith<T, E, Env, F>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + Debug + 'static,
    Env: Clone + Send + Sync + 'static,
    F: FnOnce(T) -> Body + Send + 'static,
    Body: Effect<Output = U, Error = E, Env = Env> + 'static,
{
    type Output = U;
    type Error = ResourceError<E>;
    type Env = Env;

    async fn run(self, env: &Env) -> Result<U, ResourceError<E>> {
        self.resource.use_(env, self.use_fn).await
    }
}

// ============================================================================
// Release
// ============================================================================

/// The deferred release action returned by [`Resource::allocated`].
///
/// Releasing runs every finalizer of the allocated resource in reverse
/// acquisition order. It must be invoked explicitly: dropping a `Release`
/// without invoking it leaks the resource and logs a warning.
#[must_use = "resources are only released when `release` is awaited"]
pub struct Release<E> {
    scope: Option<Scope<E>>,
}

impl<E> std::fmt::Debug for Release<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Release")
            .field("pending", &self.scope.as_ref().map_or(0, |s| s.len()))
            .finish()
    }
}

impl<E> Release<E> {
    pub(crate) fn new(scope: Scope<E>) -> Self {
        Release { scope: Some(scope) }
    }

    /// Number of release actions still to run.
    pub fn pending(&self) -> usize {
        self.scope.as_ref().map_or(0, |s| s.len())
    }
}

impl<E: Send + Debug + 'static> Release<E> {
    /// Release with [`ExitCase::Succeeded`].
    pub async fn release(self) -> Result<(), ReleaseErrors<E>> {
        self.release_with(ExitCase::Succeeded).await
    }

    /// Release, telling every release action how its use ended.
    pub async fn release_with(mut self, case: ExitCase) -> Result<(), ReleaseErrors<E>> {
        match self.scope.take() {
            Some(scope) => drain_reporting(&scope, case).await,
            None => Ok(()),
        }
    }
}

impl<E> Drop for Release<E> {
    fn drop(&mut self) {
        let pending = self.pending();
        if pending > 0 {
            #[cfg(feature = "tracing")]
            tracing::warn!(pending, "allocated resource dropped without being released");
            #[cfg(not(feature = "tracing"))]
            eprintln!(
                "allocated resource dropped without being released ({} pending)",
                pending
            );
        }
    }
}
