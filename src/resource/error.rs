//! Error types for resource scopes.

use std::fmt;

use crate::Semigroup;

// ============================================================================
// ReleaseErrors
// ============================================================================

/// One or more release actions that failed.
///
/// Independent branches (combined or parallel resources) each attempt their
/// release, so a single scope can report several failures. The collection is
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseErrors<E> {
    first: E,
    rest: Vec<E>,
}

impl<E> ReleaseErrors<E> {
    /// A single release failure.
    pub fn new(error: E) -> Self {
        ReleaseErrors {
            first: error,
            rest: Vec::new(),
        }
    }

    /// The first failure, in the order releases ran.
    pub fn first(&self) -> &E {
        &self.first
    }

    /// Number of failures (always at least one).
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    /// Iterate over all failures in the order releases ran.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }

    /// Convert into a `Vec`, first failure first.
    pub fn into_vec(self) -> Vec<E> {
        let mut all = Vec::with_capacity(self.len());
        all.push(self.first);
        all.extend(self.rest);
        all
    }

    /// Returns the first failure, dropping the rest.
    pub fn into_first(self) -> E {
        self.first
    }

    /// Map every failure.
    pub fn map<E2, F>(self, mut f: F) -> ReleaseErrors<E2>
    where
        F: FnMut(E) -> E2,
    {
        ReleaseErrors {
            first: f(self.first),
            rest: self.rest.into_iter().map(f).collect(),
        }
    }

    /// Merge two release outcomes, keeping every failure.
    pub(crate) fn merge(
        left: Result<(), ReleaseErrors<E>>,
        right: Result<(), ReleaseErrors<E>>,
    ) -> Result<(), ReleaseErrors<E>> {
        match (left, right) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(a), Err(b)) => Err(a.combine(b)),
        }
    }
}

impl<E> Semigroup for ReleaseErrors<E> {
    fn combine(mut self, other: Self) -> Self {
        self.rest.push(other.first);
        self.rest.extend(other.rest);
        self
    }
}

impl<E> IntoIterator for ReleaseErrors<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

impl<E: fmt::Display> fmt::Display for ReleaseErrors<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rest.is_empty() {
            return write!(f, "{}", self.first);
        }
        write!(f, "{} release actions failed: ", self.len())?;
        for (i, e) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

// ============================================================================
// ResourceError
// ============================================================================

/// Error returned by `Resource::use_` and `Resource::allocated`.
///
/// Each variant names the phase that failed. When the body (or acquisition)
/// fails and releasing fails too, both are kept in [`ResourceError::Both`];
/// the original error is never replaced by a release error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError<E> {
    /// Acquisition failed. Everything acquired before the failure was
    /// released without error.
    Acquire(E),
    /// The body failed; release succeeded.
    Use(E),
    /// The body succeeded; one or more releases failed.
    Release(ReleaseErrors<E>),
    /// Acquisition or the body failed, and releasing failed too.
    Both {
        /// The acquisition or body error.
        error: E,
        /// Every release failure.
        release: ReleaseErrors<E>,
    },
    /// The scope was cancelled before producing a value. Holds any release
    /// failures from the cleanup that followed.
    Canceled {
        /// Release failures, if releasing failed.
        release: Option<ReleaseErrors<E>>,
    },
}

impl<E> ResourceError<E> {
    /// Returns the acquisition error, if acquisition failed cleanly.
    pub fn acquire_error(&self) -> Option<&E> {
        match self {
            ResourceError::Acquire(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the body error, if the body failed and release succeeded.
    pub fn use_error(&self) -> Option<&E> {
        match self {
            ResourceError::Use(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the acquisition or body error, whatever release did.
    pub fn error(&self) -> Option<&E> {
        match self {
            ResourceError::Acquire(e)
            | ResourceError::Use(e)
            | ResourceError::Both { error: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Returns the release failures, if any.
    pub fn release_errors(&self) -> Option<&ReleaseErrors<E>> {
        match self {
            ResourceError::Release(r)
            | ResourceError::Both { release: r, .. }
            | ResourceError::Canceled { release: Some(r) } => Some(r),
            _ => None,
        }
    }

    /// Returns `true` if the scope was cancelled.
    pub fn is_canceled(&self) -> bool {
        matches!(self, ResourceError::Canceled { .. })
    }

    /// The error that caused the failure: the acquisition or body error if
    /// there was one, otherwise the first release failure. `None` when the
    /// scope was cancelled and released cleanly.
    pub fn into_cause(self) -> Option<E> {
        match self {
            ResourceError::Acquire(e)
            | ResourceError::Use(e)
            | ResourceError::Both { error: e, .. } => Some(e),
            ResourceError::Release(r) | ResourceError::Canceled { release: Some(r) } => {
                Some(r.into_first())
            }
            ResourceError::Canceled { release: None } => None,
        }
    }

    /// Map the error type.
    pub fn map<E2, F>(self, mut f: F) -> ResourceError<E2>
    where
        F: FnMut(E) -> E2,
    {
        match self {
            ResourceError::Acquire(e) => ResourceError::Acquire(f(e)),
            ResourceError::Use(e) => ResourceError::Use(f(e)),
            ResourceError::Release(r) => ResourceError::Release(r.map(f)),
            ResourceError::Both { error, release } => ResourceError::Both {
                error: f(error),
                release: release.map(f),
            },
            ResourceError::Canceled { release } => ResourceError::Canceled {
                release: release.map(|r| r.map(f)),
            },
        }
    }

    /// Build the error for a scope whose acquisition failed.
    pub(crate) fn acquisition(error: E, released: Result<(), ReleaseErrors<E>>) -> Self {
        match released {
            Ok(()) => ResourceError::Acquire(error),
            Err(release) => ResourceError::Both { error, release },
        }
    }

    /// Build the error for a scope whose body failed.
    pub(crate) fn body(error: E, released: Result<(), ReleaseErrors<E>>) -> Self {
        match released {
            Ok(()) => ResourceError::Use(error),
            Err(release) => ResourceError::Both { error, release },
        }
    }

    /// Build the error for a scope that was cancelled.
    pub(crate) fn canceled(released: Result<(), ReleaseErrors<E>>) -> Self {
        ResourceError::Canceled {
            release: released.err(),
        }
    }
}

impl<E: fmt::Display> fmt::Display for ResourceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Acquire(e) => write!(f, "acquire failed: {}", e),
            ResourceError::Use(e) => write!(f, "{}", e),
            ResourceError::Release(r) => write!(f, "release failed: {}", r),
            ResourceError::Both { error, release } => {
                write!(f, "{}; release also failed: {}", error, release)
            }
            ResourceError::Canceled { release: None } => f.write_str("resource scope canceled"),
            ResourceError::Canceled { release: Some(r) } => {
                write!(f, "resource scope canceled; release failed: {}", r)
            }
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ResourceError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Acquire(e)
            | ResourceError::Use(e)
            | ResourceError::Both { error: e, .. } => Some(e),
            ResourceError::Release(r) | ResourceError::Canceled { release: Some(r) } => {
                Some(r.first())
            }
            ResourceError::Canceled { release: None } => None,
        }
    }
}
