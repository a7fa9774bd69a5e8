//! Sequential composition of independent resources.
//!
//! Combining acquires left then right and releases right then left. With
//! [`Resource::unit`] as identity, combination forms a monoid up to the
//! order of release actions.

use std::fmt::Debug;

use crate::monoid::Monoid;
use crate::resource::Resource;
use crate::semigroup::Semigroup;

impl<T, E, Env> Resource<T, E, Env>
where
    T: Send + 'static,
    E: Send + Debug + 'static,
    Env: Clone + Send + Sync + 'static,
{
    /// Acquire `self`, then `other`, and merge their values.
    ///
    /// If `other` fails to acquire, `self` is released. Release runs
    /// `other` first.
    ///
    /// ```rust
    /// use sluice::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let host = Resource::<_, String>::pure("localhost");
    /// let port = Resource::pure(5432);
    /// let addr = host.combine_with(port, |h, p| format!("{}:{}", h, p));
    /// assert_eq!(addr.use_(&(), |a| pure(a)).await, Ok("localhost:5432".to_string()));
    /// # });
    /// ```
    pub fn combine_with<U, V, F>(self, other: Resource<U, E, Env>, merge: F) -> Resource<V, E, Env>
    where
        U: Send + 'static,
        V: Send + 'static,
        F: FnOnce(T, U) -> V + Send + 'static,
    {
        self.flat_map(move |left| other.map(move |right| merge(left, right)))
    }

    /// Acquire `self`, then `other`, keeping both values.
    pub fn zip<U>(self, other: Resource<U, E, Env>) -> Resource<(T, U), E, Env>
    where
        U: Send + 'static,
    {
        self.combine_with(other, |left, right| (left, right))
    }
}

impl<E, Env> Resource<(), E, Env>
where
    E: Send + Debug + 'static,
    Env: Clone + Send + Sync + 'static,
{
    /// The resource that acquires and releases nothing.
    pub fn unit() -> Self {
        Resource::pure(())
    }
}

impl<T, E, Env> Semigroup for Resource<T, E, Env>
where
    T: Semigroup + Send + 'static,
    E: Send + Debug + 'static,
    Env: Clone + Send + Sync + 'static,
{
    fn combine(self, other: Self) -> Self {
        self.combine_with(other, T::combine)
    }
}

impl<T, E, Env> Monoid for Resource<T, E, Env>
where
    T: Monoid + Send + 'static,
    E: Send + Debug + 'static,
    Env: Clone + Send + Sync + 'static,
{
    fn empty() -> Self {
        Resource::pure(T::empty())
    }
}
