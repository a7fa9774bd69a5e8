//! Effect trait definition.
//!
//! An `Effect` is a deferred computation that:
//! - Produces a value of type `Output` on success
//! - May fail with an error of type `Error`
//! - Reads an environment of type `Env`
//!
//! Nothing happens until [`Effect::run`] is awaited. Resources use effects
//! for their acquisition steps and hand effects back from `use_` bodies, so
//! the environment is the ambient context a resource is built for.

use std::future::Future;

/// A deferred, environment-reading computation.
///
/// Combinators return concrete types, the same way `Future` and `Iterator`
/// adapters do. Call `.boxed()` when type erasure is needed.
///
/// # Example
///
/// ```rust
/// use sluice::effect::prelude::*;
///
/// # tokio_test::block_on(async {
/// let effect = pure::<_, String, ()>(20).map(|x| x + 1).and_then(|x| pure(x * 2));
/// assert_eq!(effect.run(&()).await, Ok(42));
/// # });
/// ```
pub trait Effect: Sized + Send {
    /// The success type produced by this effect.
    type Output: Send;

    /// The error type that may be produced.
    type Error: Send;

    /// The environment required to run this effect.
    ///
    /// `Clone` is needed so that boxed effects and spawned resource scopes
    /// can own a copy of it.
    type Env: Clone + Send + Sync;

    /// Execute this effect with the given environment.
    fn run(self, env: &Self::Env)
        -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}
