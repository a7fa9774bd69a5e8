//! How a resource scope ended.

use std::fmt;

/// The outcome of the scope a release action runs for.
///
/// Release actions built with `Resource::make_case` receive it, so they can
/// e.g. commit on success and roll back otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExitCase {
    /// The body (or the caller of `allocated`) finished normally.
    Succeeded,
    /// Acquisition or the body failed or panicked.
    Errored,
    /// The scope was cancelled before it could finish.
    Canceled,
}

impl ExitCase {
    /// Returns `true` for [`ExitCase::Succeeded`].
    pub fn is_succeeded(&self) -> bool {
        matches!(self, ExitCase::Succeeded)
    }

    /// Returns `true` for [`ExitCase::Errored`].
    pub fn is_errored(&self) -> bool {
        matches!(self, ExitCase::Errored)
    }

    /// Returns `true` for [`ExitCase::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, ExitCase::Canceled)
    }
}

impl fmt::Display for ExitCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCase::Succeeded => f.write_str("succeeded"),
            ExitCase::Errored => f.write_str("errored"),
            ExitCase::Canceled => f.write_str("canceled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_case_display() {
        assert_eq!(ExitCase::Succeeded.to_string(), "succeeded");
        assert_eq!(ExitCase::Canceled.to_string(), "canceled");
    }

    #[test]
    fn exit_case_predicates() {
        assert!(ExitCase::Succeeded.is_succeeded());
        assert!(ExitCase::Errored.is_errored());
        assert!(ExitCase::Canceled.is_canceled());
        assert!(!ExitCase::Canceled.is_succeeded());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn exit_case_serializes_as_variant_name() {
        let json = serde_json::to_string(&ExitCase::Canceled).unwrap();
        assert_eq!(json, "\"Canceled\"");
        let back: ExitCase = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ExitCase::Canceled);
    }
}
