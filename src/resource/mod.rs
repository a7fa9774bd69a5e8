//! Scoped resources with guaranteed, ordered release.
//!
//! A [`Resource`] describes how to acquire a value and how to release it.
//! Nothing happens until the resource is run with [`Resource::use_`] (or
//! [`Resource::allocated`] / [`Resource::with`]):
//!
//! 1. acquisition runs, registering one release action per acquired value
//! 2. the body runs with the acquired value
//! 3. every registered release action runs, last acquired first
//!
//! Release happens whether the body succeeds, fails, panics or the scope is
//! cancelled. Resources compose sequentially with [`Resource::flat_map`],
//! [`Resource::combine_with`] and friends, and in parallel with
//! [`Resource::par_zip`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use sluice::prelude::*;
//!
//! type Log = Arc<Mutex<Vec<String>>>;
//!
//! fn track(log: &Log, name: &'static str) -> Resource<&'static str, String> {
//!     let (opened, closed) = (Arc::clone(log), Arc::clone(log));
//!     Resource::make(
//!         from_fn(move |_: &()| {
//!             opened.lock().unwrap().push(format!("open {}", name));
//!             Ok::<_, String>(name)
//!         }),
//!         move |name| async move {
//!             closed.lock().unwrap().push(format!("close {}", name));
//!             Ok(())
//!         },
//!     )
//! }
//!
//! # tokio_test::block_on(async {
//! let log = Log::default();
//! let inner_log = Arc::clone(&log);
//!
//! let pair = track(&log, "db")
//!     .flat_map(move |db| track(&inner_log, "cache").map(move |cache| (db, cache)));
//! let result = pair.use_(&(), |(db, cache)| pure(format!("{}+{}", db, cache))).await;
//!
//! assert_eq!(result, Ok("db+cache".to_string()));
//! assert_eq!(
//!     *log.lock().unwrap(),
//!     vec!["open db", "open cache", "close cache", "close db"]
//! );
//! # });
//! ```
//!
//! # Cancellation
//!
//! Acquire steps of resources built with [`Resource::make`] and
//! [`Resource::new`] are uninterruptible: a cancel request that arrives while
//! one is running waits for it to finish, and its release is registered
//! before the request is honoured. Steps lifted with [`Resource::eval`] and
//! the body of `use_` can be interrupted, and nothing is registered for an
//! interrupted step.

pub(crate) mod branch;
mod closeable;
mod combine;
mod error;
mod exit;
mod par;
mod run;
pub(crate) mod scope;

pub use closeable::Close;
pub use error::{ReleaseErrors, ResourceError};
pub use exit::ExitCase;
pub use run::{Release, ResourceWith};

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use crate::effect::{BoxFuture, Effect, EffectExt};
use crate::resource::scope::Scope;

/// Why an acquisition stopped short of producing a value.
#[derive(Debug)]
pub(crate) enum Halt<E> {
    Failed(E),
    Canceled,
}

impl<E> Halt<E> {
    pub(crate) fn map<E2>(self, f: impl FnOnce(E) -> E2) -> Halt<E2> {
        match self {
            Halt::Failed(e) => Halt::Failed(f(e)),
            Halt::Canceled => Halt::Canceled,
        }
    }

    pub(crate) fn exit_case(&self) -> ExitCase {
        match self {
            Halt::Failed(_) => ExitCase::Errored,
            Halt::Canceled => ExitCase::Canceled,
        }
    }
}

type Acquire<T, E, Env> =
    Box<dyn FnOnce(Env, Scope<E>) -> BoxFuture<'static, Result<T, Halt<E>>> + Send>;

/// A value of type `T` that must be released after use.
///
/// `E` is the error type shared by acquisition, release and the body run
/// against the resource; `Env` is the environment effects read from.
/// A `Resource` is a description: it can be run once.
pub struct Resource<T, E, Env = ()> {
    acquire: Acquire<T, E, Env>,
}

impl<T, E, Env> std::fmt::Debug for Resource<T, E, Env> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("acquire", &"<function>")
            .finish()
    }
}

impl<T, E, Env> Resource<T, E, Env>
where
    T: Send + 'static,
    E: Send + Debug + 'static,
    Env: Clone + Send + Sync + 'static,
{
    pub(crate) fn from_acquire<F, Fut>(acquire: F) -> Self
    where
        F: FnOnce(Env, Scope<E>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, Halt<E>>> + Send + 'static,
    {
        Resource {
            acquire: Box::new(
                move |env: Env, scope: Scope<E>| -> BoxFuture<'static, Result<T, Halt<E>>> {
                    Box::pin(acquire(env, scope))
                },
            ),
        }
    }

    /// Run acquisition, registering finalizers in `scope`.
    pub(crate) fn acquire_in(
        self,
        env: Env,
        scope: Scope<E>,
    ) -> BoxFuture<'static, Result<T, Halt<E>>> {
        (self.acquire)(env, scope)
    }

    /// Build a resource from an effect producing the value together with
    /// its release action.
    ///
    /// The release action receives the [`ExitCase`] of the scope. Unlike
    /// [`Resource::make`], the value does not need to be `Clone`. The acquire
    /// step is uninterruptible once started; it is skipped if the scope was
    /// already interrupted.
    ///
    /// ```rust
    /// use sluice::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let resource = Resource::new(pure::<_, String, ()>((
    ///     vec![1, 2, 3],
    ///     |case: ExitCase| async move {
    ///         assert!(case.is_succeeded());
    ///         Ok(())
    ///     },
    /// )));
    ///
    /// let sum = resource.use_(&(), |v| pure(v.iter().sum::<i32>())).await;
    /// assert_eq!(sum, Ok(6));
    /// # });
    /// ```
    pub fn new<Acq, R, RelFut>(acquire: Acq) -> Self
    where
        Acq: Effect<Output = (T, R), Error = E, Env = Env> + 'static,
        R: FnOnce(ExitCase) -> RelFut + Send + 'static,
        RelFut: Future<Output = Result<(), E>> + Send + 'static,
    {
        Self::from_acquire(move |env: Env, scope: Scope<E>| async move {
            if scope.branch().is_interrupted() {
                return Err(Halt::Canceled);
            }
            let (value, release) = scope
                .branch()
                .critical(acquire.run(&env))
                .await
                .map_err(Halt::Failed)?;
            scope.register(release);

            #[cfg(feature = "tracing")]
            tracing::debug!(resource = std::any::type_name::<T>(), "resource acquired");

            Ok(value)
        })
    }

    /// Build a resource from an acquire effect and a release function.
    ///
    /// The acquire step is uninterruptible. If it succeeds, `release` is
    /// guaranteed to run exactly once with the acquired value.
    ///
    /// ```rust
    /// use sluice::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let conn = Resource::make(
    ///     pure::<_, String, ()>("conn"),
    ///     |_conn| async { Ok(()) },
    /// );
    /// let len = conn.use_(&(), |c| pure(c.len())).await;
    /// assert_eq!(len, Ok(4));
    /// # });
    /// ```
    pub fn make<Acq, Rel, RelFut>(acquire: Acq, release: Rel) -> Self
    where
        T: Clone,
        Acq: Effect<Output = T, Error = E, Env = Env> + 'static,
        Rel: FnOnce(T) -> RelFut + Send + 'static,
        RelFut: Future<Output = Result<(), E>> + Send + 'static,
    {
        Self::make_case(acquire, move |value, _| release(value))
    }

    /// Like [`Resource::make`], but the release function also learns how the
    /// scope ended.
    ///
    /// ```rust
    /// use sluice::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let tx = Resource::make_case(pure::<_, String, ()>(1_u32), |_id, case| async move {
    ///     // commit on success, roll back otherwise
    ///     let _ = if case.is_succeeded() { "commit" } else { "rollback" };
    ///     Ok(())
    /// });
    /// assert_eq!(tx.use_(&(), |id| pure(id)).await, Ok(1));
    /// # });
    /// ```
    pub fn make_case<Acq, Rel, RelFut>(acquire: Acq, release: Rel) -> Self
    where
        T: Clone,
        Acq: Effect<Output = T, Error = E, Env = Env> + 'static,
        Rel: FnOnce(T, ExitCase) -> RelFut + Send + 'static,
        RelFut: Future<Output = Result<(), E>> + Send + 'static,
    {
        Self::new(acquire.map(move |value: T| {
            let handle = value.clone();
            (value, move |case: ExitCase| release(handle, case))
        }))
    }

    /// A resource that holds `value` and releases nothing.
    pub fn pure(value: T) -> Self {
        Self::from_acquire(move |_env: Env, _scope: Scope<E>| async move { Ok(value) })
    }

    /// Lift an effect into a resource with no release action.
    ///
    /// The effect runs during acquisition and can be interrupted. Using the
    /// lifted resource is equivalent to running the effect and passing its
    /// value to the body.
    #[doc(alias = "liftF")]
    pub fn eval<Eff>(effect: Eff) -> Self
    where
        Eff: Effect<Output = T, Error = E, Env = Env> + 'static,
    {
        Self::from_acquire(move |env: Env, scope: Scope<E>| async move {
            match scope.branch().interruptible(effect.run(&env)).await {
                Some(Ok(value)) => Ok(value),
                Some(Err(error)) => Err(Halt::Failed(error)),
                None => Err(Halt::Canceled),
            }
        })
    }

    /// Same as [`Resource::eval`].
    pub fn lift<Eff>(effect: Eff) -> Self
    where
        Eff: Effect<Output = T, Error = E, Env = Env> + 'static,
    {
        Self::eval(effect)
    }

    /// Acquire a second resource that depends on the value of this one.
    ///
    /// The second resource is released before the first. If its
    /// acquisition fails, the first is still released.
    pub fn flat_map<U, F>(self, f: F) -> Resource<U, E, Env>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Resource<U, E, Env> + Send + 'static,
    {
        Resource::from_acquire(move |env: Env, scope: Scope<E>| async move {
            let value = self.acquire_in(env.clone(), scope.clone()).await?;
            if scope.branch().is_interrupted() {
                return Err(Halt::Canceled);
            }
            f(value).acquire_in(env, scope).await
        })
    }

    /// Transform the acquired value. Release still sees the original.
    pub fn map<U, F>(self, f: F) -> Resource<U, E, Env>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        Resource::from_acquire(move |env: Env, scope: Scope<E>| async move {
            self.acquire_in(env, scope).await.map(f)
        })
    }

    /// Run this resource against an environment derived from an outer one.
    pub fn local<Env2, F>(self, f: F) -> Resource<T, E, Env2>
    where
        Env2: Clone + Send + Sync + 'static,
        F: FnOnce(&Env2) -> Env + Send + 'static,
    {
        Resource::from_acquire(move |env: Env2, scope: Scope<E>| {
            self.acquire_in(f(&env), scope)
        })
    }

    /// Convert acquisition and release errors.
    pub fn map_err<E2, F>(self, f: F) -> Resource<T, E2, Env>
    where
        E2: Send + Debug + 'static,
        F: Fn(E) -> E2 + Send + Sync + 'static,
    {
        self.map_k(|env: &Env| env.clone(), f)
    }

    /// Move the whole resource to another environment and error type.
    ///
    /// Acquire steps, release actions and their ordering are unchanged;
    /// release actions still receive the exit case of the outer scope.
    ///
    /// ```rust
    /// use sluice::prelude::*;
    ///
    /// #[derive(Clone)]
    /// struct App { pool_size: usize }
    ///
    /// # tokio_test::block_on(async {
    /// let pool: Resource<usize, &'static str, usize> = Resource::make(
    ///     from_fn(|size: &usize| Ok(*size)),
    ///     |_| async { Ok(()) },
    /// );
    ///
    /// let app_pool = pool.map_k(|app: &App| app.pool_size, |e: &str| e.to_string());
    /// let size = app_pool.use_(&App { pool_size: 8 }, |n| pure(n)).await;
    /// assert_eq!(size, Ok(8));
    /// # });
    /// ```
    pub fn map_k<Env2, E2, F, G>(self, env_fn: F, err_fn: G) -> Resource<T, E2, Env2>
    where
        Env2: Clone + Send + Sync + 'static,
        E2: Send + Debug + 'static,
        F: FnOnce(&Env2) -> Env + Send + 'static,
        G: Fn(E) -> E2 + Send + Sync + 'static,
    {
        let err_fn = Arc::new(err_fn);
        Resource::from_acquire(move |env: Env2, scope: Scope<E2>| async move {
            let inner = scope.nested::<E>();
            let release_err = Arc::clone(&err_fn);
            scope.adopt(inner.clone(), move |e| release_err(e));
            self.acquire_in(env_fn(&env), inner)
                .await
                .map_err(|halt| halt.map(|e| err_fn(e)))
        })
    }

    /// Run acquisition inside `span`.
    #[cfg(feature = "tracing")]
    pub fn instrument(self, span: tracing::Span) -> Self {
        use tracing::Instrument as _;
        Resource::from_acquire(move |env: Env, scope: Scope<E>| {
            self.acquire_in(env, scope).instrument(span)
        })
    }
}
