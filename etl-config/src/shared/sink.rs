use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::load::Config;
use crate::shared::{
    KuduConnectionConfig, MappingConfig, ValidationError, WriteConfig, WriteRetryConfig,
};

/// Top-level configuration of the Kudu sink.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SinkConfig {
    pub kudu: KuduConnectionConfig,
    #[serde(default)]
    pub write: WriteConfig,
    #[serde(default)]
    pub write_retry: WriteRetryConfig,
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

impl SinkConfig {
    /// Validates every section and rejects source tables mapped more than once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.kudu.validate()?;
        self.write.validate()?;
        self.write_retry.validate()?;

        let mut seen = HashSet::new();
        for mapping in &self.mappings {
            mapping.validate()?;

            if !seen.insert((mapping.database.as_str(), mapping.table.as_str())) {
                return Err(ValidationError::DuplicateMapping(mapping.source_name()));
            }
        }

        Ok(())
    }

    /// Finds the mapping configured for a source table.
    pub fn mapping_for(&self, database: &str, table: &str) -> Option<&MappingConfig> {
        self.mappings
            .iter()
            .find(|mapping| mapping.database == database && mapping.table == table)
    }
}

impl Config for SinkConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["kudu.master_addresses"];
}
