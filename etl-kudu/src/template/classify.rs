use std::fmt;

use crate::client::{OperationKind, RowErrorStatus};

/// How a rejected row is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowErrorClass {
    /// The target already reflects the intent of the operation. Logged, never retried.
    Benign,
    /// Marks the batch as failed and sends it through the retry loop.
    Retryable,
}

impl RowErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowErrorClass::Benign => "benign",
            RowErrorClass::Retryable => "retryable",
        }
    }
}

impl fmt::Display for RowErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a row error by the operation that caused it.
///
/// Inserting a row that is already present and deleting a row that is not found are benign;
/// everything else, upsert failures included, is retryable.
pub fn classify_row_error(kind: OperationKind, status: RowErrorStatus) -> RowErrorClass {
    match (kind, status) {
        (OperationKind::Insert, RowErrorStatus::AlreadyPresent)
        | (OperationKind::Delete, RowErrorStatus::NotFound) => RowErrorClass::Benign,
        _ => RowErrorClass::Retryable,
    }
}
