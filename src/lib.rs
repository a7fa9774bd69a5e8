//! # Sluice
//!
//! Scoped resource acquisition with guaranteed, ordered release for async
//! Rust.
//!
//! A [`Resource`] pairs an acquire step with a release step. Resources
//! compose: sequentially with [`Resource::flat_map`] and
//! [`Resource::combine_with`], in parallel with [`Resource::par_zip`]. Whatever
//! happens while a composite is in use (success, error, panic or
//! cancellation), everything acquired is released exactly once, in reverse
//! order of acquisition.
//!
//! Acquire steps and bodies are [`Effect`]s: deferred async computations that
//! read an environment and return a `Result`.
//!
//! ## Quick Example
//!
//! ```rust
//! use sluice::prelude::*;
//!
//! #[derive(Clone)]
//! struct Config { url: &'static str }
//!
//! # tokio_test::block_on(async {
//! let pool = Resource::make(
//!     from_fn(|cfg: &Config| Ok::<_, String>(format!("pool({})", cfg.url))),
//!     |_pool| async { Ok(()) },
//! );
//! let conn = pool.flat_map(|pool| {
//!     Resource::make(
//!         pure(format!("conn from {}", pool)),
//!         |_conn| async { Ok(()) },
//!     )
//! });
//!
//! let result = conn
//!     .use_(&Config { url: "postgres://localhost" }, |c| pure(c.len()))
//!     .await;
//! assert_eq!(result, Ok("conn from pool(postgres://localhost)".len()));
//! # });
//! ```
//!
//! ## Features
//!
//! - `tracing` (default): log scope lifecycle and release failures with
//!   `tracing`, and enable `Resource::instrument`.
//! - `serde`: `Serialize`/`Deserialize` for [`ExitCase`].
//! - `proptest`: `Arbitrary` for [`ExitCase`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod effect;
pub mod monoid;
pub mod resource;
pub mod semigroup;
pub mod testing;

// Re-exports
pub use effect::{fail, from_async, from_fn, from_result, pure, BoxedEffect, Effect, EffectExt};
pub use monoid::Monoid;
pub use resource::{Close, ExitCase, Release, ReleaseErrors, Resource, ResourceError, ResourceWith};
pub use semigroup::Semigroup;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::effect::prelude::*;
    pub use crate::monoid::Monoid;
    pub use crate::resource::{
        Close, ExitCase, Release, ReleaseErrors, Resource, ResourceError, ResourceWith,
    };
    pub use crate::semigroup::Semigroup;
}
