//! The asynchronous-computation primitive resources are built on.
//!
//! An [`Effect`] is a deferred computation reading an environment `Env` and
//! producing `Result<Output, Error>`. Combinators return concrete types and
//! allocate nothing; [`BoxedEffect`] erases the type when needed, cloning the
//! environment into a `'static` future.
//!
//! ```rust
//! use sluice::effect::prelude::*;
//!
//! #[derive(Clone)]
//! struct AppEnv { greeting: &'static str }
//!
//! # tokio_test::block_on(async {
//! let effect = from_fn(|env: &AppEnv| Ok::<_, String>(env.greeting))
//!     .map(|g| format!("{}, world", g));
//! assert_eq!(effect.run(&AppEnv { greeting: "hello" }).await, Ok("hello, world".to_string()));
//! # });
//! ```

pub mod boxed;
pub mod combinators;
pub mod constructors;
pub mod ext;
pub mod prelude;
#[cfg(feature = "tracing")]
pub mod tracing;
mod trait_def;

pub use trait_def::Effect;

pub use boxed::{BoxFuture, BoxedEffect};
pub use combinators::{AndThen, Fail, FromAsync, FromFn, FromResult, Local, Map, MapErr, Pure};
pub use constructors::{fail, from_async, from_fn, from_result, pure};
pub use ext::{EffectExt, RunStandalone};

#[cfg(feature = "tracing")]
pub use self::tracing::{EffectTracingExt, Instrument};
