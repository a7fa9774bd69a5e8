//! Monoid trait: a [`Semigroup`] with an identity element.
//!
//! The identity resource (`Resource::unit`, or `Monoid::empty` for
//! resources of monoidal values) acquires and releases nothing.
//!
//! ```
//! use sluice::{Monoid, Semigroup};
//!
//! let v = vec![1, 2, 3];
//! let empty: Vec<i32> = Monoid::empty();
//! assert_eq!(v.clone().combine(empty), v);
//! ```

use crate::Semigroup;

/// A `Semigroup` with an identity element.
///
/// # Laws
///
/// ```text
/// a.combine(M::empty()) == a           (right identity)
/// M::empty().combine(a) == a           (left identity)
/// ```
pub trait Monoid: Semigroup {
    /// The identity element.
    fn empty() -> Self;
}

impl<T> Monoid for Vec<T> {
    fn empty() -> Self {
        Vec::new()
    }
}

impl Monoid for String {
    fn empty() -> Self {
        String::new()
    }
}

impl Monoid for () {
    fn empty() -> Self {}
}

impl<T: Semigroup> Monoid for Option<T> {
    fn empty() -> Self {
        None
    }
}

macro_rules! impl_monoid_tuple {
    ($($T:ident),+) => {
        impl<$($T: Monoid),+> Monoid for ($($T,)+) {
            fn empty() -> Self {
                ($($T::empty(),)+)
            }
        }
    };
}

impl_monoid_tuple!(T1, T2);
impl_monoid_tuple!(T1, T2, T3);
impl_monoid_tuple!(T1, T2, T3, T4);

/// Fold an iterator of monoid values, starting from `M::empty()`.
///
/// ```
/// use sluice::monoid::fold_all;
///
/// assert_eq!(fold_all(vec![vec![1], vec![2, 3]]), vec![1, 2, 3]);
/// ```
pub fn fold_all<M, I>(items: I) -> M
where
    M: Monoid,
    I: IntoIterator<Item = M>,
{
    items.into_iter().fold(M::empty(), M::combine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_all_of_nothing_is_empty() {
        let folded: Vec<u8> = fold_all(Vec::<Vec<u8>>::new());
        assert!(folded.is_empty());
    }

    #[test]
    fn tuple_empty_is_component_wise() {
        let empty: (Vec<i32>, String) = Monoid::empty();
        assert_eq!(empty, (vec![], String::new()));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_vec_identity(v: Vec<i32>) {
                let empty: Vec<i32> = Monoid::empty();
                prop_assert_eq!(v.clone().combine(empty.clone()), v.clone());
                prop_assert_eq!(empty.combine(v.clone()), v);
            }

            #[test]
            fn prop_string_identity(s: String) {
                let empty: String = Monoid::empty();
                prop_assert_eq!(s.clone().combine(empty.clone()), s.clone());
                prop_assert_eq!(empty.combine(s.clone()), s);
            }
        }
    }
}
