//! Store error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A single-item condition expression evaluated to false.
    #[error("Conditional check failed")]
    ConditionFailed,

    /// A transaction was rejected; `failed` holds the indices of the operations
    /// whose condition evaluated to false.
    #[error("Transaction canceled (failed operations: {failed:?})")]
    TransactionCanceled { failed: Vec<usize> },

    /// Transport failure, throttling or timeout. Safe to retry.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// An item was read but one of its attributes could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request could not be built (bad key, oversized batch, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid continuation token: {0}")]
    InvalidToken(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    /// True when the operation at `index` of a canceled transaction failed its condition.
    pub fn failed_at(&self, index: usize) -> bool {
        match self {
            StoreError::TransactionCanceled { failed } => failed.contains(&index),
            _ => false,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_at_only_matches_transaction_errors() {
        let err = StoreError::TransactionCanceled { failed: vec![1] };
        assert!(err.failed_at(1));
        assert!(!err.failed_at(0));
        assert!(!StoreError::ConditionFailed.failed_at(0));
    }

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(StoreError::Unavailable("timeout".into()).is_retryable());
        assert!(!StoreError::ConditionFailed.is_retryable());
        assert!(!StoreError::Decode("x".into()).is_retryable());
    }
}
