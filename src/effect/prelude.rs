//! Prelude for the effect primitive.
//!
//! ```rust
//! use sluice::effect::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let effect = pure::<_, String, ()>(42).map(|x| x * 2).and_then(|x| pure(x + 1));
//! assert_eq!(effect.run(&()).await, Ok(85));
//! # });
//! ```

pub use crate::effect::boxed::{BoxFuture, BoxedEffect};
pub use crate::effect::combinators::{
    AndThen, Fail, FromAsync, FromFn, FromResult, Local, Map, MapErr, Pure,
};
pub use crate::effect::constructors::{fail, from_async, from_fn, from_result, pure};
pub use crate::effect::ext::{EffectExt, RunStandalone};
pub use crate::effect::trait_def::Effect;

#[cfg(feature = "tracing")]
pub use crate::effect::tracing::EffectTracingExt;
