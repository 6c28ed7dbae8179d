// ============================================================================
// spark-lists - Errors
// ============================================================================

use thiserror::Error;

/// Errors raised while reconciling updates or answering data-source queries.
///
/// The consistency variants mean a snapshot source or edit-script generator
/// broke its contract; they are fatal to the reconciler that observed them.
/// The query variants are returned to the caller and never change state.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// An update mixed a `Reload` marker with other changes
    #[error("update mixes reload with {changes} other change(s)")]
    MixedReload { changes: usize },

    /// An edit referenced a position outside the committed state
    #[error("{change} is out of bounds for a collection of {len} element(s)")]
    IndexOutOfBounds { change: String, len: usize },

    /// Applying the edit script did not produce the snapshot's length
    #[error("edit script yields {actual} element(s) but the snapshot has {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A query referenced an index that is not materialized
    #[error("index {index} is out of range ({len} available)")]
    OutOfRange { index: usize, len: usize },

    /// Queried before the first full bind
    #[error("queried before the first snapshot was bound")]
    NotBound,

    /// `bind` was called on an instance that is already bound
    #[error("already bound to a consumer")]
    AlreadyBound,
}

impl ReconcileError {
    /// Whether the error means the update stream broke its contract.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(
            self,
            ReconcileError::MixedReload { .. }
                | ReconcileError::IndexOutOfBounds { .. }
                | ReconcileError::LengthMismatch { .. }
        )
    }

    /// Whether the error comes from querying before the first bind.
    pub fn is_not_bound(&self) -> bool {
        matches!(self, ReconcileError::NotBound)
    }

    /// Whether the error is a query-time range miss.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, ReconcileError::OutOfRange { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(ReconcileError::MixedReload { changes: 2 }.is_consistency_violation());
        assert!(
            ReconcileError::LengthMismatch {
                expected: 1,
                actual: 2
            }
            .is_consistency_violation()
        );
        assert!(!ReconcileError::NotBound.is_consistency_violation());
        assert!(ReconcileError::NotBound.is_not_bound());
        assert!(ReconcileError::OutOfRange { index: 3, len: 1 }.is_out_of_range());
    }

    #[test]
    fn messages_name_the_offending_change() {
        let err = ReconcileError::IndexOutOfBounds {
            change: "delete(4)".to_string(),
            len: 2,
        };
        assert_eq!(
            err.to_string(),
            "delete(4) is out of bounds for a collection of 2 element(s)"
        );
    }
}
