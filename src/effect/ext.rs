//! Extension methods available on every [`Effect`].

use std::future::Future;
use std::marker::PhantomData;

use crate::effect::boxed::BoxedEffect;
use crate::effect::combinators::{AndThen, Local, Map, MapErr};
use crate::effect::trait_def::Effect;

/// Combinator methods for all effects.
///
/// Implemented automatically for every type implementing [`Effect`].
pub trait EffectExt: Effect {
    /// Transform the success value.
    fn map<U, F>(self, f: F) -> Map<Self, F>
    where
        F: FnOnce(Self::Output) -> U + Send,
        U: Send,
    {
        Map { inner: self, f }
    }

    /// Transform the error value.
    fn map_err<E2, F>(self, f: F) -> MapErr<Self, F>
    where
        F: FnOnce(Self::Error) -> E2 + Send,
        E2: Send,
    {
        MapErr { inner: self, f }
    }

    /// Chain a dependent effect. Errors short-circuit.
    ///
    /// ```rust
    /// use sluice::effect::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let effect = pure::<_, String, ()>(21).and_then(|x| pure(x * 2));
    /// assert_eq!(effect.run(&()).await, Ok(42));
    /// # });
    /// ```
    fn and_then<Next, F>(self, f: F) -> AndThen<Self, F>
    where
        Next: Effect<Error = Self::Error, Env = Self::Env>,
        F: FnOnce(Self::Output) -> Next + Send,
    {
        AndThen { inner: self, f }
    }

    /// Run this effect against an environment derived from an outer one.
    fn local<F, Env2>(self, f: F) -> Local<Self, F, Env2>
    where
        F: FnOnce(&Env2) -> Self::Env + Send,
        Env2: Clone + Send + Sync,
    {
        Local {
            inner: self,
            f,
            _phantom: PhantomData,
        }
    }

    /// Erase the concrete type of this effect.
    fn boxed(self) -> BoxedEffect<Self::Output, Self::Error, Self::Env>
    where
        Self: 'static,
        Self::Output: 'static,
        Self::Error: 'static,
        Self::Env: 'static,
    {
        BoxedEffect::new(self)
    }
}

impl<E: Effect> EffectExt for E {}

/// Run effects that need no environment.
pub trait RunStandalone: Effect<Env = ()> {
    /// Run with the unit environment.
    fn run_standalone(self) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

impl<E: Effect<Env = ()>> RunStandalone for E {
    fn run_standalone(self) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send {
        self.run(&())
    }
}
