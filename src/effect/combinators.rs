//! Concrete effect types returned by the constructors and `EffectExt`.
//!
//! Each type stores only what it needs to run later; no boxing happens
//! until `.boxed()` is called.

use std::future::Future;
use std::marker::PhantomData;

use crate::effect::trait_def::Effect;

macro_rules! opaque_debug {
    ($name:ident < $($p:ident),+ >, $($field:literal),+) => {
        impl<$($p),+> std::fmt::Debug for $name<$($p),+> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    $(.field($field, &"<opaque>"))+
                    .finish()
            }
        }
    };
}

// ============================================================================
// Leaf effects
// ============================================================================

/// An effect that succeeds with a value it already holds.
#[derive(Debug, Clone)]
pub struct Pure<T, E, Env> {
    value: T,
    _phantom: PhantomData<fn() -> (E, Env)>,
}

impl<T, E, Env> Pure<T, E, Env> {
    /// Create a new `Pure` effect.
    pub fn new(value: T) -> Self {
        Pure {
            value,
            _phantom: PhantomData,
        }
    }
}

impl<T, E, Env> Effect for Pure<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    type Output = T;
    type Error = E;
    type Env = Env;

    async fn run(self, _env: &Self::Env) -> Result<T, E> {
        Ok(self.value)
    }
}

/// An effect that fails with an error it already holds.
#[derive(Debug, Clone)]
pub struct Fail<T, E, Env> {
    error: E,
    _phantom: PhantomData<fn() -> (T, Env)>,
}

impl<T, E, Env> Fail<T, E, Env> {
    /// Create a new `Fail` effect.
    pub fn new(error: E) -> Self {
        Fail {
            error,
            _phantom: PhantomData,
        }
    }
}

impl<T, E, Env> Effect for Fail<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    type Output = T;
    type Error = E;
    type Env = Env;

    async fn run(self, _env: &Self::Env) -> Result<T, E> {
        Err(self.error)
    }
}

/// An effect that replays a `Result` it already holds.
#[derive(Debug, Clone)]
pub struct FromResult<T, E, Env> {
    result: Result<T, E>,
    _phantom: PhantomData<fn() -> Env>,
}

impl<T, E, Env> FromResult<T, E, Env> {
    /// Create a new `FromResult` effect.
    pub fn new(result: Result<T, E>) -> Self {
        FromResult {
            result,
            _phantom: PhantomData,
        }
    }
}

impl<T, E, Env> Effect for FromResult<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    type Output = T;
    type Error = E;
    type Env = Env;

    async fn run(self, _env: &Self::Env) -> Result<T, E> {
        self.result
    }
}

/// An effect backed by a synchronous function of the environment.
pub struct FromFn<F, Env> {
    f: F,
    _phantom: PhantomData<fn(Env)>,
}

opaque_debug!(FromFn<F, Env>, "f");

impl<F, Env> FromFn<F, Env> {
    /// Create a new `FromFn` effect.
    pub fn new(f: F) -> Self {
        FromFn {
            f,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, E, Env> Effect for FromFn<F, Env>
where
    F: FnOnce(&Env) -> Result<T, E> + Send,
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    type Output = T;
    type Error = E;
    type Env = Env;

    async fn run(self, env: &Self::Env) -> Result<T, E> {
        (self.f)(env)
    }
}

/// An effect backed by an async function of the environment.
pub struct FromAsync<F, Env> {
    f: F,
    _phantom: PhantomData<fn(Env)>,
}

opaque_debug!(FromAsync<F, Env>, "f");

impl<F, Env> FromAsync<F, Env> {
    /// Create a new `FromAsync` effect.
    pub fn new(f: F) -> Self {
        FromAsync {
            f,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut, T, E, Env> Effect for FromAsync<F, Env>
where
    F: FnOnce(&Env) -> Fut + Send,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    type Output = T;
    type Error = E;
    type Env = Env;

    fn run(self, env: &Env) -> impl Future<Output = Result<T, E>> + Send {
        (self.f)(env)
    }
}

// ============================================================================
// Adapters
// ============================================================================

/// Transforms the success value of an inner effect.
pub struct Map<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
}

opaque_debug!(Map<Inner, F>, "inner", "f");

impl<Inner, F, U> Effect for Map<Inner, F>
where
    Inner: Effect,
    F: FnOnce(Inner::Output) -> U + Send,
    U: Send,
{
    type Output = U;
    type Error = Inner::Error;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<U, Self::Error> {
        self.inner.run(env).await.map(self.f)
    }
}

/// Transforms the error of an inner effect.
pub struct MapErr<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
}

opaque_debug!(MapErr<Inner, F>, "inner", "f");

impl<Inner, F, E2> Effect for MapErr<Inner, F>
where
    Inner: Effect,
    F: FnOnce(Inner::Error) -> E2 + Send,
    E2: Send,
{
    type Output = Inner::Output;
    type Error = E2;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, E2> {
        self.inner.run(env).await.map_err(self.f)
    }
}

/// Chains a dependent effect after an inner one.
///
/// The chained effect must share the error type; convert with `map_err`
/// first when it does not.
pub struct AndThen<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
}

opaque_debug!(AndThen<Inner, F>, "inner", "f");

impl<Inner, F, Next> Effect for AndThen<Inner, F>
where
    Inner: Effect,
    Next: Effect<Error = Inner::Error, Env = Inner::Env>,
    F: FnOnce(Inner::Output) -> Next + Send,
{
    type Output = Next::Output;
    type Error = Inner::Error;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        let value = self.inner.run(env).await?;
        (self.f)(value).run(env).await
    }
}

/// Runs an inner effect against an environment derived from the outer one.
pub struct Local<Inner, F, Env2> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
    pub(crate) _phantom: PhantomData<fn(Env2)>,
}

opaque_debug!(Local<Inner, F, Env2>, "inner", "f");

impl<Inner, F, Env2> Effect for Local<Inner, F, Env2>
where
    Inner: Effect,
    F: FnOnce(&Env2) -> Inner::Env + Send,
    Env2: Clone + Send + Sync,
{
    type Output = Inner::Output;
    type Error = Inner::Error;
    type Env = Env2;

    async fn run(self, env: &Env2) -> Result<Self::Output, Self::Error> {
        let inner_env = (self.f)(env);
        self.inner.run(&inner_env).await
    }
}
