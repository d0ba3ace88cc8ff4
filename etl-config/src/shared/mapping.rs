use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Maps one source table onto one Kudu table.
///
/// Loaded once and treated as immutable afterwards.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MappingConfig {
    /// Source database name.
    pub database: String,
    /// Source table name.
    pub table: String,
    /// Fully qualified Kudu table name, e.g. `impala::shop.orders`.
    pub target_table: String,
    /// Primary-key columns of the source table, with an optional target column name.
    ///
    /// A key without a target name maps to its lowercased source name.
    #[serde(default)]
    pub target_pk: BTreeMap<String, Option<String>>,
    /// Columns whose values are stored as irreversible hashes.
    #[serde(default)]
    pub encryption_columns: Vec<String>,
    /// Number of rows written per flush unit.
    #[serde(default = "default_commit_batch")]
    pub commit_batch: usize,
}

impl MappingConfig {
    pub const DEFAULT_COMMIT_BATCH: usize = 3000;

    /// Creates a mapping with no key remapping, no hashed columns and the default batch size.
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        target_table: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            target_table: target_table.into(),
            target_pk: BTreeMap::new(),
            encryption_columns: Vec::new(),
            commit_batch: default_commit_batch(),
        }
    }

    /// `database.table` of the source side, used in logs.
    pub fn source_name(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }

    /// Returns the target column for `source_column` if it is a primary-key column.
    ///
    /// The lookup is case-insensitive on the source name.
    pub fn target_pk_column(&self, source_column: &str) -> Option<String> {
        self.target_pk
            .iter()
            .find(|(source, _)| source.eq_ignore_ascii_case(source_column))
            .map(|(source, target)| match target {
                Some(target) if !target.is_empty() => target.clone(),
                _ => source.to_lowercase(),
            })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.source_name();

        for (field, value) in [
            ("database", &self.database),
            ("table", &self.table),
            ("target_table", &self.target_table),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyMappingField {
                    mapping: name,
                    field,
                });
            }
        }

        if self.commit_batch == 0 {
            return Err(ValidationError::CommitBatchZero(name));
        }

        Ok(())
    }
}

fn default_commit_batch() -> usize {
    MappingConfig::DEFAULT_COMMIT_BATCH
}
