use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Connection settings for the Kudu cluster the sink writes to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct KuduConnectionConfig {
    /// Kudu master addresses (`host:port`).
    pub master_addresses: Vec<String>,
    /// Timeout for user operations such as writes and scans, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub operation_timeout_ms: u64,
    /// Timeout for admin operations such as table creation and alteration, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub admin_operation_timeout_ms: u64,
    /// Socket read timeout, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub socket_read_timeout_ms: u64,
}

impl KuduConnectionConfig {
    /// Default for every timeout in this configuration.
    pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

    /// Builds a configuration from a comma separated list of master addresses.
    pub fn from_masters(masters: &str) -> Self {
        let master_addresses = masters
            .split(',')
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(str::to_owned)
            .collect();

        Self {
            master_addresses,
            operation_timeout_ms: default_timeout_ms(),
            admin_operation_timeout_ms: default_timeout_ms(),
            socket_read_timeout_ms: default_timeout_ms(),
        }
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn admin_operation_timeout(&self) -> Duration {
        Duration::from_millis(self.admin_operation_timeout_ms)
    }

    pub fn socket_read_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_read_timeout_ms)
    }

    /// Validates the connection settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.master_addresses.is_empty() {
            return Err(ValidationError::MissingMasterAddresses);
        }

        if self
            .master_addresses
            .iter()
            .any(|address| address.trim().is_empty())
        {
            return Err(ValidationError::EmptyMasterAddress);
        }

        if self.operation_timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout("kudu.operation_timeout_ms"));
        }

        if self.admin_operation_timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout(
                "kudu.admin_operation_timeout_ms",
            ));
        }

        if self.socket_read_timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout("kudu.socket_read_timeout_ms"));
        }

        Ok(())
    }
}

fn default_timeout_ms() -> u64 {
    KuduConnectionConfig::DEFAULT_TIMEOUT_MS
}
