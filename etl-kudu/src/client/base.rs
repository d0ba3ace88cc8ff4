use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use etl_config::shared::KuduConnectionConfig;

use crate::error::EtlResult;
use crate::types::{HashBucketSchema, PartitionSchema, TableSchema};

/// A typed value set on a [`PartialRow`].
#[derive(Debug, Clone, PartialEq)]
pub enum KuduValue {
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    String(String),
    Binary(Vec<u8>),
    /// Microseconds since the Unix epoch, UTC.
    UnixtimeMicros(i64),
}

impl KuduValue {
    pub fn is_null(&self) -> bool {
        matches!(self, KuduValue::Null)
    }
}

/// The column values of a single operation, keyed by schema column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRow {
    values: BTreeMap<String, KuduValue>,
}

impl PartialRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: KuduValue) {
        self.values.insert(column.into(), value);
    }

    pub fn set_null(&mut self, column: impl Into<String>) {
        self.set(column, KuduValue::Null);
    }

    pub fn get(&self, column: &str) -> Option<&KuduValue> {
        self.values.get(column)
    }

    pub fn is_set(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KuduValue)> {
        self.values
            .iter()
            .map(|(column, value)| (column.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Kind of a write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Insert,
    Upsert,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Upsert => "upsert",
            OperationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single row mutation against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    kind: OperationKind,
    table: String,
    row: PartialRow,
}

impl Operation {
    pub fn new(kind: OperationKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            row: PartialRow::new(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn row(&self) -> &PartialRow {
        &self.row
    }

    pub fn row_mut(&mut self) -> &mut PartialRow {
        &mut self.row
    }
}

/// Status attached to a rejected row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowErrorStatus {
    /// A row with the same primary key already exists.
    AlreadyPresent,
    /// No row with the given primary key exists.
    NotFound,
    /// The row is malformed, e.g. a key column is missing.
    InvalidArgument,
    /// Any other server-side rejection.
    Other,
}

impl fmt::Display for RowErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RowErrorStatus::AlreadyPresent => "Already present",
            RowErrorStatus::NotFound => "Not found",
            RowErrorStatus::InvalidArgument => "Invalid argument",
            RowErrorStatus::Other => "Runtime error",
        };

        f.write_str(name)
    }
}

/// A row the cluster refused to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub status: RowErrorStatus,
    pub message: String,
    pub operation: Operation,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({} on {})",
            self.status,
            self.message,
            self.operation.kind(),
            self.operation.table()
        )
    }
}

/// Outcome of one applied operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResponse {
    row_error: Option<RowError>,
}

impl OperationResponse {
    pub fn success() -> Self {
        Self { row_error: None }
    }

    pub fn failed(row_error: RowError) -> Self {
        Self {
            row_error: Some(row_error),
        }
    }

    pub fn has_row_error(&self) -> bool {
        self.row_error.is_some()
    }

    pub fn row_error(&self) -> Option<&RowError> {
        self.row_error.as_ref()
    }
}

/// When buffered operations are sent to the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Every `apply` is sent immediately and returns its response.
    AutoFlushSync,
    /// Operations are buffered until `flush` is called.
    ManualFlush,
}

/// An opened Kudu table.
#[derive(Debug, Clone, PartialEq)]
pub struct KuduTable {
    name: String,
    schema: TableSchema,
    partition_schema: PartitionSchema,
}

impl KuduTable {
    pub fn new(
        name: impl Into<String>,
        schema: TableSchema,
        partition_schema: PartitionSchema,
    ) -> Self {
        Self {
            name: name.into(),
            schema,
            partition_schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn partition_schema(&self) -> &PartitionSchema {
        &self.partition_schema
    }

    pub fn new_operation(&self, kind: OperationKind) -> Operation {
        Operation::new(kind, self.name.clone())
    }
}

/// Options for creating a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateTableOptions {
    partition_schema: PartitionSchema,
}

impl CreateTableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hash_partitions(mut self, columns: Vec<String>, num_buckets: u32, seed: u32) -> Self {
        self.partition_schema
            .hash_bucket_schemas
            .push(HashBucketSchema {
                columns,
                num_buckets,
                seed,
            });
        self
    }

    pub fn set_range_partition_columns(mut self, columns: Vec<String>) -> Self {
        self.partition_schema.range_partition_columns = columns;
        self
    }

    pub fn partition_schema(&self) -> &PartitionSchema {
        &self.partition_schema
    }
}

/// Options for altering a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlterTableOptions {
    new_name: Option<String>,
}

impl AlterTableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename_table(mut self, new_name: impl Into<String>) -> Self {
        self.new_name = Some(new_name.into());
        self
    }

    pub fn new_name(&self) -> Option<&str> {
        self.new_name.as_deref()
    }
}

/// Builds clients for a Kudu cluster.
pub trait KuduConnector: Send + Sync + 'static {
    type Client: KuduClient + fmt::Debug;

    /// Connects to the masters listed in `config`.
    fn connect(
        &self,
        config: &KuduConnectionConfig,
    ) -> impl Future<Output = EtlResult<Self::Client>> + Send;
}

/// A handle to a Kudu cluster.
///
/// Handles are cheap to clone and safe to share across tasks; every clone talks to the same
/// underlying connection. Errors whose kind is a connectivity kind signal that the handle is no
/// longer usable and must be replaced.
pub trait KuduClient: Clone + Send + Sync + 'static {
    type Session: KuduSession;

    fn open_table(&self, name: &str) -> impl Future<Output = EtlResult<KuduTable>> + Send;

    /// Opens a new session. Sessions start in [`FlushMode::AutoFlushSync`].
    fn new_session(&self) -> EtlResult<Self::Session>;

    fn table_exists(&self, name: &str) -> impl Future<Output = EtlResult<bool>> + Send;

    fn create_table(
        &self,
        name: &str,
        schema: &TableSchema,
        options: &CreateTableOptions,
    ) -> impl Future<Output = EtlResult<()>> + Send;

    fn delete_table(&self, name: &str) -> impl Future<Output = EtlResult<()>> + Send;

    fn alter_table(
        &self,
        name: &str,
        options: &AlterTableOptions,
    ) -> impl Future<Output = EtlResult<()>> + Send;

    /// Returns whether the last alteration of `name` has been applied on every tablet.
    fn is_alter_table_done(&self, name: &str) -> impl Future<Output = EtlResult<bool>> + Send;

    /// Counts the rows of `name` with a full scan.
    fn count_rows(&self, name: &str) -> impl Future<Output = EtlResult<u64>> + Send;

    /// Shuts the client down. Clones become unusable.
    fn close(&self) -> impl Future<Output = EtlResult<()>> + Send;
}

/// A write session.
///
/// A session buffers operations according to its [`FlushMode`] and must be closed once the
/// caller is done with it. Closing flushes operations that are still pending.
pub trait KuduSession: Send {
    fn set_flush_mode(&mut self, mode: FlushMode) -> EtlResult<()>;

    fn set_mutation_buffer_space(&mut self, operations: usize) -> EtlResult<()>;

    fn set_timeout(&mut self, timeout: Duration);

    /// Applies an operation.
    ///
    /// In [`FlushMode::ManualFlush`] the operation is buffered and `None` is returned; a full
    /// buffer is an error. In [`FlushMode::AutoFlushSync`] the response is returned directly.
    fn apply(
        &mut self,
        operation: Operation,
    ) -> impl Future<Output = EtlResult<Option<OperationResponse>>> + Send;

    /// Sends all buffered operations and returns one response per operation.
    fn flush(&mut self) -> impl Future<Output = EtlResult<Vec<OperationResponse>>> + Send;

    /// Flushes pending operations and closes the session.
    fn close(&mut self) -> impl Future<Output = EtlResult<Vec<OperationResponse>>> + Send;

    fn is_closed(&self) -> bool;

    /// Number of operations buffered and not yet flushed.
    fn pending_operations(&self) -> usize;
}
