//! Semigroup trait for associative combination.
//!
//! Resources whose values form a semigroup combine into a resource holding
//! the combined value, and release errors from independent branches are
//! aggregated through the same trait.
//!
//! ```
//! use sluice::Semigroup;
//!
//! assert_eq!(vec![1, 2].combine(vec![3]), vec![1, 2, 3]);
//! assert_eq!("ab".to_string().combine("c".to_string()), "abc");
//! ```

/// A type with an associative binary operation.
///
/// # Laws
///
/// ```text
/// a.combine(b).combine(c) == a.combine(b.combine(c))
/// ```
///
/// `combine` takes both sides by value; clone first to keep the originals.
pub trait Semigroup: Sized {
    /// Combine this value with another.
    fn combine(self, other: Self) -> Self;
}

impl<T> Semigroup for Vec<T> {
    #[inline]
    fn combine(mut self, other: Self) -> Self {
        self.extend(other);
        self
    }
}

impl Semigroup for String {
    #[inline]
    fn combine(mut self, other: Self) -> Self {
        self.push_str(&other);
        self
    }
}

impl Semigroup for () {
    #[inline]
    fn combine(self, _other: Self) -> Self {}
}

// Some(a) + Some(b) combines the payloads; None is skipped.
impl<T: Semigroup> Semigroup for Option<T> {
    fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Some(a), Some(b)) => Some(a.combine(b)),
            (a @ Some(_), None) => a,
            (None, b) => b,
        }
    }
}

macro_rules! impl_semigroup_tuple {
    ($($idx:tt $T:ident),+) => {
        impl<$($T: Semigroup),+> Semigroup for ($($T,)+) {
            #[inline]
            fn combine(self, other: Self) -> Self {
                ($(self.$idx.combine(other.$idx),)+)
            }
        }
    };
}

impl_semigroup_tuple!(0 T1, 1 T2);
impl_semigroup_tuple!(0 T1, 1 T2, 2 T3);
impl_semigroup_tuple!(0 T1, 1 T2, 2 T3, 3 T4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_combine_appends() {
        assert_eq!(vec![1, 2].combine(vec![3, 4]), vec![1, 2, 3, 4]);
    }

    #[test]
    fn option_combine_keeps_present_side() {
        assert_eq!(Some(vec![1]).combine(None), Some(vec![1]));
        assert_eq!(None.combine(Some(vec![2])), Some(vec![2]));
        assert_eq!(Some(vec![1]).combine(Some(vec![2])), Some(vec![1, 2]));
    }

    #[test]
    fn tuple_combine_is_component_wise() {
        let left = (vec![1], "a".to_string());
        let right = (vec![2], "b".to_string());
        assert_eq!(left.combine(right), (vec![1, 2], "ab".to_string()));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_vec_associativity(a: Vec<i32>, b: Vec<i32>, c: Vec<i32>) {
                let left = a.clone().combine(b.clone()).combine(c.clone());
                let right = a.combine(b.combine(c));
                prop_assert_eq!(left, right);
            }

            #[test]
            fn prop_string_associativity(a: String, b: String, c: String) {
                let left = a.clone().combine(b.clone()).combine(c.clone());
                let right = a.combine(b.combine(c));
                prop_assert_eq!(left, right);
            }
        }
    }
}
