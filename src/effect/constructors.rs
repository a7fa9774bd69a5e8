//! Constructor functions for effects.

use std::future::Future;

use crate::effect::combinators::{Fail, FromAsync, FromFn, FromResult, Pure};

/// Create an effect that succeeds with `value`.
///
/// ```rust
/// use sluice::effect::prelude::*;
///
/// # tokio_test::block_on(async {
/// assert_eq!(pure::<_, String, ()>(42).run(&()).await, Ok(42));
/// # });
/// ```
pub fn pure<T, E, Env>(value: T) -> Pure<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    Pure::new(value)
}

/// Create an effect that fails with `error`.
pub fn fail<T, E, Env>(error: E) -> Fail<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    Fail::new(error)
}

/// Create an effect from a `Result`.
pub fn from_result<T, E, Env>(result: Result<T, E>) -> FromResult<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    FromResult::new(result)
}

/// Create an effect from a synchronous function of the environment.
///
/// ```rust
/// use sluice::effect::prelude::*;
///
/// #[derive(Clone)]
/// struct Env { base: i32 }
///
/// # tokio_test::block_on(async {
/// let effect = from_fn(|env: &Env| Ok::<_, String>(env.base * 2));
/// assert_eq!(effect.run(&Env { base: 21 }).await, Ok(42));
/// # });
/// ```
pub fn from_fn<T, E, Env, F>(f: F) -> FromFn<F, Env>
where
    F: FnOnce(&Env) -> Result<T, E> + Send,
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    FromFn::new(f)
}

/// Create an effect from an async function of the environment.
///
/// The returned future may not borrow the environment; clone what it needs.
pub fn from_async<T, E, Env, F, Fut>(f: F) -> FromAsync<F, Env>
where
    F: FnOnce(&Env) -> Fut + Send,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    FromAsync::new(f)
}
