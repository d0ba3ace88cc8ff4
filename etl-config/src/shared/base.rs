use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// No Kudu master address was configured.
    #[error("`kudu.master_addresses` must contain at least one address")]
    MissingMasterAddresses,
    /// A master address was blank.
    #[error("`kudu.master_addresses` contains an empty address")]
    EmptyMasterAddress,
    /// A timeout was configured as zero.
    #[error("`{0}` must be greater than zero")]
    ZeroTimeout(&'static str),
    /// The mutation buffer cannot hold a single operation.
    #[error("`write.mutation_buffer_space` must be at least 3")]
    MutationBufferTooSmall,
    /// The retry budget is empty.
    #[error("`write_retry.max_attempts` cannot be zero")]
    RetryMaxAttemptsZero,
    /// Reconnecting every zero attempts is meaningless.
    #[error("`write_retry.reconnect_every` cannot be zero")]
    RetryReconnectEveryZero,
    /// The backoff multiplier would shrink delays.
    #[error("`write_retry.backoff_multiplier` must be >= 1.0")]
    RetryBackoffMultiplierTooSmall,
    /// A required mapping field was empty.
    #[error("mapping `{mapping}` has an empty `{field}`")]
    EmptyMappingField { mapping: String, field: &'static str },
    /// Commit batch size of zero would never flush.
    #[error("mapping `{0}` has `commit_batch` set to zero")]
    CommitBatchZero(String),
    /// Two mappings target the same source table.
    #[error("source table `{0}` is mapped more than once")]
    DuplicateMapping(String),
}
