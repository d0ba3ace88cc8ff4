use std::collections::HashMap;
use std::fmt;

/// Physical type of a Kudu column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int8,
    Int16,
    Int32,
    Int64,
    Binary,
    String,
    Bool,
    Float,
    Double,
    UnixtimeMicros,
    Decimal,
    Varchar,
    Date,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int8 => "int8",
            ColumnType::Int16 => "int16",
            ColumnType::Int32 => "int32",
            ColumnType::Int64 => "int64",
            ColumnType::Binary => "binary",
            ColumnType::String => "string",
            ColumnType::Bool => "bool",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::UnixtimeMicros => "unixtime_micros",
            ColumnType::Decimal => "decimal",
            ColumnType::Varchar => "varchar",
            ColumnType::Date => "date",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A column of a Kudu table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
    pub is_key: bool,
    pub nullable: bool,
}

impl ColumnSchema {
    /// Creates a nullable, non-key column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            is_key: false,
            nullable: true,
        }
    }

    /// Creates a primary-key column. Key columns are never nullable.
    pub fn key(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            is_key: true,
            nullable: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Ordered column list of a Kudu table. Key columns come first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Finds a column by its exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Builds a lookup from lowercased column name to column.
    ///
    /// Rebuilt for every write so that a schema change on the cluster is picked up on the
    /// next batch.
    pub fn column_index(&self) -> HashMap<String, &ColumnSchema> {
        self.columns
            .iter()
            .map(|column| (column.name.to_lowercase(), column))
            .collect()
    }

    pub fn primary_key_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|column| column.is_key)
            .map(|column| column.name.clone())
            .collect()
    }
}

/// One level of hash partitioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashBucketSchema {
    pub columns: Vec<String>,
    pub num_buckets: u32,
    pub seed: u32,
}

/// Partitioning of a Kudu table: zero or more hash levels plus optional range columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionSchema {
    pub hash_bucket_schemas: Vec<HashBucketSchema>,
    pub range_partition_columns: Vec<String>,
}

impl PartitionSchema {
    pub fn hash(columns: Vec<String>, num_buckets: u32, seed: u32) -> Self {
        Self {
            hash_bucket_schemas: vec![HashBucketSchema {
                columns,
                num_buckets,
                seed,
            }],
            range_partition_columns: Vec::new(),
        }
    }

    pub fn total_hash_buckets(&self) -> u32 {
        self.hash_bucket_schemas
            .iter()
            .map(|level| level.num_buckets)
            .product()
    }
}
