// Error taxonomy for the budget consistency engine.
//
// Setting an amount to its current value is NOT an error: the write paths
// report it as Ok(0) rows affected.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Typed failures surfaced by the engine.
///
/// Every write path runs inside one transaction; any of these errors
/// aborts the whole operation and the transaction rolls back on drop, so
/// callers see either a fully-applied mutation or an untouched store.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A referenced code, identifier, or budget does not exist in scope.
    #[error("not found: {0}")]
    NotFound(String),

    /// A structural invariant would be violated: dangling foreign key
    /// during clone, missing parent or parent cycle during propagation.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The underlying store failed. Propagated unchanged after rollback.
    #[error(transparent)]
    Store(#[from] rusqlite::Error),

    /// A budget document could not be decoded.
    #[error("malformed budget document: {0}")]
    Document(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, EngineError::Integrity(_))
    }
}
