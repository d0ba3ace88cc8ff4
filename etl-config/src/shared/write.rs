use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Session settings used for every write batch.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct WriteConfig {
    /// Number of operations a session buffers before it must be flushed.
    #[serde(default = "default_mutation_buffer_space")]
    pub mutation_buffer_space: usize,
    /// Timeout applied to session network operations, in milliseconds.
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
}

impl WriteConfig {
    pub const DEFAULT_MUTATION_BUFFER_SPACE: usize = 500;

    pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 60_000;

    /// Number of uncommitted operations above which an intermediate flush is forced.
    ///
    /// Two thirds of the buffer, computed with integer division (332 for a buffer of 500).
    pub fn flush_threshold(&self) -> usize {
        self.mutation_buffer_space / 3 * 2
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.mutation_buffer_space < 3 {
            return Err(ValidationError::MutationBufferTooSmall);
        }

        if self.session_timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout("write.session_timeout_ms"));
        }

        Ok(())
    }
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            mutation_buffer_space: default_mutation_buffer_space(),
            session_timeout_ms: default_session_timeout_ms(),
        }
    }
}

fn default_mutation_buffer_space() -> usize {
    WriteConfig::DEFAULT_MUTATION_BUFFER_SPACE
}

fn default_session_timeout_ms() -> u64 {
    WriteConfig::DEFAULT_SESSION_TIMEOUT_MS
}

/// Retry policy for batches that failed with row-level write errors.
///
/// Each failed batch gets a fresh budget of `max_attempts`. The connection is rebuilt before
/// an attempt whenever the remaining budget is a multiple of `reconnect_every`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct WriteRetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_reconnect_every")]
    pub reconnect_every: u32,
    /// Remaining-attempt count at or below which retry failures are logged as errors.
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: u32,
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl WriteRetryConfig {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

    pub const DEFAULT_RECONNECT_EVERY: u32 = 3;

    pub const DEFAULT_ESCALATION_THRESHOLD: u32 = 5;

    pub const DEFAULT_INITIAL_RETRY_DELAY_MS: u64 = 100;

    pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 5_000;

    pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

    /// Returns a policy with the same budget that never sleeps between attempts.
    pub fn without_delay(mut self) -> Self {
        self.initial_retry_delay_ms = 0;
        self.max_retry_delay_ms = 0;
        self
    }

    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initial_retry_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::RetryMaxAttemptsZero);
        }

        if self.reconnect_every == 0 {
            return Err(ValidationError::RetryReconnectEveryZero);
        }

        if self.backoff_multiplier < 1.0 {
            return Err(ValidationError::RetryBackoffMultiplierTooSmall);
        }

        Ok(())
    }
}

impl Default for WriteRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            reconnect_every: default_reconnect_every(),
            escalation_threshold: default_escalation_threshold(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

fn default_max_attempts() -> u32 {
    WriteRetryConfig::DEFAULT_MAX_ATTEMPTS
}

fn default_reconnect_every() -> u32 {
    WriteRetryConfig::DEFAULT_RECONNECT_EVERY
}

fn default_escalation_threshold() -> u32 {
    WriteRetryConfig::DEFAULT_ESCALATION_THRESHOLD
}

fn default_initial_retry_delay_ms() -> u64 {
    WriteRetryConfig::DEFAULT_INITIAL_RETRY_DELAY_MS
}

fn default_max_retry_delay_ms() -> u64 {
    WriteRetryConfig::DEFAULT_MAX_RETRY_DELAY_MS
}

fn default_backoff_multiplier() -> f64 {
    WriteRetryConfig::DEFAULT_BACKOFF_MULTIPLIER
}
