use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use etl_config::shared::KuduConnectionConfig;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::bail;
use crate::client::{
    AlterTableOptions, CreateTableOptions, FlushMode, KuduClient, KuduConnector, KuduSession,
    KuduTable, Operation, OperationKind, OperationResponse, PartialRow, RowError, RowErrorStatus,
};
use crate::error::{ErrorKind, EtlResult};
use crate::types::{PartitionSchema, TableSchema};

/// Separator between key values in a stored row key.
const KEY_SEPARATOR: char = '\u{1f}';

#[derive(Debug, Clone)]
struct MemoryTable {
    schema: TableSchema,
    partition_schema: PartitionSchema,
    rows: BTreeMap<String, PartialRow>,
}

#[derive(Debug, Default)]
struct Faults {
    failing_connects: u32,
    failing_flushes: u32,
    /// Table name to number of flushes whose operations on that table are rejected.
    failing_table_writes: HashMap<String, u32>,
    alter_never_done: bool,
    alter_status_unavailable: bool,
}

#[derive(Debug, Default)]
struct ClusterState {
    tables: BTreeMap<String, MemoryTable>,
    faults: Faults,
    connects: u64,
    sessions_opened: u64,
    open_sessions: u64,
    flush_sizes: Vec<usize>,
}

/// An in-process Kudu cluster.
///
/// Applies operations with Kudu row semantics: inserting an existing key is rejected as
/// already present, deleting a missing key as not found, and rows missing a key column or
/// carrying a null in a non-nullable column are rejected as invalid. Hooks allow tests to
/// inject connection failures, flush failures and rejected writes. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryKuduCluster {
    inner: Arc<Mutex<ClusterState>>,
}

impl MemoryKuduCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table directly, bypassing any client.
    pub fn create_table(
        &self,
        name: impl Into<String>,
        schema: TableSchema,
        partition_schema: PartitionSchema,
    ) {
        let mut inner = self.inner.lock();
        inner.tables.insert(
            name.into(),
            MemoryTable {
                schema,
                partition_schema,
                rows: BTreeMap::new(),
            },
        );
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.inner.lock().tables.contains_key(name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.inner.lock().tables.keys().cloned().collect()
    }

    /// Returns the rows of `table` ordered by primary key.
    pub fn rows(&self, table: &str) -> Vec<PartialRow> {
        let inner = self.inner.lock();
        inner
            .tables
            .get(table)
            .map(|table| table.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        let inner = self.inner.lock();
        inner
            .tables
            .get(table)
            .map(|table| table.rows.len())
            .unwrap_or_default()
    }

    pub fn partition_schema(&self, table: &str) -> Option<PartitionSchema> {
        let inner = self.inner.lock();
        inner
            .tables
            .get(table)
            .map(|table| table.partition_schema.clone())
    }

    pub fn schema(&self, table: &str) -> Option<TableSchema> {
        let inner = self.inner.lock();
        inner.tables.get(table).map(|table| table.schema.clone())
    }

    /// Number of clients created by connectors of this cluster.
    pub fn connect_count(&self) -> u64 {
        self.inner.lock().connects
    }

    pub fn sessions_opened(&self) -> u64 {
        self.inner.lock().sessions_opened
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> u64 {
        self.inner.lock().open_sessions
    }

    /// Number of operations sent by each flush, in order.
    pub fn flush_sizes(&self) -> Vec<usize> {
        self.inner.lock().flush_sizes.clone()
    }

    /// Makes the next `count` connection attempts fail.
    pub fn fail_next_connects(&self, count: u32) {
        self.inner.lock().faults.failing_connects = count;
    }

    /// Makes the next `count` flushes fail with a connection error.
    pub fn fail_next_flushes(&self, count: u32) {
        self.inner.lock().faults.failing_flushes = count;
    }

    /// Rejects every operation on `table` in the next `flushes` flushes that touch it.
    pub fn fail_table_writes(&self, table: impl Into<String>, flushes: u32) {
        self.inner
            .lock()
            .faults
            .failing_table_writes
            .insert(table.into(), flushes);
    }

    /// Makes [`KuduClient::is_alter_table_done`] report `false` for every table.
    pub fn set_alter_never_done(&self, never_done: bool) {
        self.inner.lock().faults.alter_never_done = never_done;
    }

    /// Makes [`KuduClient::is_alter_table_done`] fail with a connection error.
    pub fn set_alter_status_unavailable(&self, unavailable: bool) {
        self.inner.lock().faults.alter_status_unavailable = unavailable;
    }

    fn connect(&self) -> EtlResult<()> {
        let mut inner = self.inner.lock();
        if inner.faults.failing_connects > 0 {
            inner.faults.failing_connects -= 1;
            bail!(
                ErrorKind::DestinationConnectionFailed,
                "Could not connect to Kudu masters",
                "injected connection failure"
            );
        }

        inner.connects += 1;

        Ok(())
    }

    fn open_session(&self) {
        let mut inner = self.inner.lock();
        inner.sessions_opened += 1;
        inner.open_sessions += 1;
    }

    fn close_session(&self) {
        let mut inner = self.inner.lock();
        inner.open_sessions = inner.open_sessions.saturating_sub(1);
    }

    fn flush_operations(&self, operations: Vec<Operation>) -> EtlResult<Vec<OperationResponse>> {
        let mut inner = self.inner.lock();

        if inner.faults.failing_flushes > 0 {
            inner.faults.failing_flushes -= 1;
            bail!(
                ErrorKind::DestinationConnectionFailed,
                "Kudu flush failed",
                "injected flush failure"
            );
        }

        inner.flush_sizes.push(operations.len());

        let mut failing_tables = Vec::new();
        for operation in &operations {
            let table = operation.table();
            if failing_tables.iter().any(|failing| failing == table) {
                continue;
            }

            if let Some(remaining) = inner.faults.failing_table_writes.get_mut(table) {
                if *remaining > 0 {
                    *remaining -= 1;
                    failing_tables.push(table.to_owned());
                }
            }
        }

        let responses = operations
            .into_iter()
            .map(|operation| {
                if failing_tables.iter().any(|table| table == operation.table()) {
                    return OperationResponse::failed(RowError {
                        status: RowErrorStatus::Other,
                        message: "injected write failure".to_owned(),
                        operation,
                    });
                }

                apply_operation(&mut inner.tables, operation)
            })
            .collect();

        Ok(responses)
    }
}

fn apply_operation(
    tables: &mut BTreeMap<String, MemoryTable>,
    operation: Operation,
) -> OperationResponse {
    let reject = |status: RowErrorStatus, message: String, operation: Operation| {
        OperationResponse::failed(RowError {
            status,
            message,
            operation,
        })
    };

    let Some(table) = tables.get_mut(operation.table()) else {
        let message = format!("table {} does not exist", operation.table());
        return reject(RowErrorStatus::NotFound, message, operation);
    };

    let unknown_column = operation
        .row()
        .iter()
        .map(|(column, _)| column)
        .find(|column| table.schema.column(column).is_none())
        .map(str::to_owned);
    if let Some(column) = unknown_column {
        let message = format!("unknown column {column}");
        return reject(RowErrorStatus::InvalidArgument, message, operation);
    }

    let key = match row_key(&table.schema, operation.row()) {
        Ok(key) => key,
        Err(message) => return reject(RowErrorStatus::InvalidArgument, message, operation),
    };

    match operation.kind() {
        OperationKind::Insert => {
            if table.rows.contains_key(&key) {
                return reject(
                    RowErrorStatus::AlreadyPresent,
                    "key already present".to_owned(),
                    operation,
                );
            }

            if let Err(message) = check_nullability(&table.schema, operation.row(), true) {
                return reject(RowErrorStatus::InvalidArgument, message, operation);
            }

            table.rows.insert(key, operation.row().clone());
        }
        OperationKind::Upsert => match table.rows.get_mut(&key) {
            Some(existing) => {
                if let Err(message) = check_nullability(&table.schema, operation.row(), false) {
                    return reject(RowErrorStatus::InvalidArgument, message, operation);
                }

                for (column, value) in operation.row().iter() {
                    existing.set(column, value.clone());
                }
            }
            None => {
                if let Err(message) = check_nullability(&table.schema, operation.row(), true) {
                    return reject(RowErrorStatus::InvalidArgument, message, operation);
                }

                table.rows.insert(key, operation.row().clone());
            }
        },
        OperationKind::Delete => {
            if table.rows.remove(&key).is_none() {
                return reject(RowErrorStatus::NotFound, "key not found".to_owned(), operation);
            }
        }
    }

    OperationResponse::success()
}

fn row_key(schema: &TableSchema, row: &PartialRow) -> Result<String, String> {
    let mut key = String::new();
    for column in schema.columns().iter().filter(|column| column.is_key) {
        match row.get(&column.name) {
            Some(value) if !value.is_null() => {
                if !key.is_empty() {
                    key.push(KEY_SEPARATOR);
                }
                key.push_str(&format!("{value:?}"));
            }
            Some(_) => return Err(format!("key column {} is null", column.name)),
            None => return Err(format!("missing key column {}", column.name)),
        }
    }

    Ok(key)
}

fn check_nullability(
    schema: &TableSchema,
    row: &PartialRow,
    require_all: bool,
) -> Result<(), String> {
    for column in schema.columns().iter().filter(|column| !column.nullable) {
        match row.get(&column.name) {
            Some(value) if value.is_null() => {
                return Err(format!("column {} is not nullable", column.name));
            }
            None if require_all => {
                return Err(format!("missing non-nullable column {}", column.name));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Connects [`MemoryKuduClient`]s to a [`MemoryKuduCluster`].
#[derive(Debug, Clone)]
pub struct MemoryKuduConnector {
    cluster: MemoryKuduCluster,
}

impl MemoryKuduConnector {
    pub fn new(cluster: MemoryKuduCluster) -> Self {
        Self { cluster }
    }

    pub fn cluster(&self) -> &MemoryKuduCluster {
        &self.cluster
    }
}

impl KuduConnector for MemoryKuduConnector {
    type Client = MemoryKuduClient;

    async fn connect(&self, config: &KuduConnectionConfig) -> EtlResult<Self::Client> {
        self.cluster.connect()?;

        debug!(masters = ?config.master_addresses, "memory kudu client connected");

        Ok(MemoryKuduClient {
            cluster: self.cluster.clone(),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// Client handle for a [`MemoryKuduCluster`].
#[derive(Debug, Clone)]
pub struct MemoryKuduClient {
    cluster: MemoryKuduCluster,
    closed: Arc<AtomicBool>,
}

impl MemoryKuduClient {
    fn ensure_open(&self) -> EtlResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            bail!(
                ErrorKind::DestinationConnectionFailed,
                "Kudu client is closed",
                "the client was shut down"
            );
        }

        Ok(())
    }
}

impl KuduClient for MemoryKuduClient {
    type Session = MemoryKuduSession;

    async fn open_table(&self, name: &str) -> EtlResult<KuduTable> {
        self.ensure_open()?;

        let inner = self.cluster.inner.lock();
        let Some(table) = inner.tables.get(name) else {
            bail!(
                ErrorKind::DestinationTableMissing,
                "Kudu table not found",
                format!("table {name} does not exist")
            );
        };

        Ok(KuduTable::new(
            name,
            table.schema.clone(),
            table.partition_schema.clone(),
        ))
    }

    fn new_session(&self) -> EtlResult<Self::Session> {
        self.ensure_open()?;
        self.cluster.open_session();

        Ok(MemoryKuduSession {
            cluster: self.cluster.clone(),
            client_closed: self.closed.clone(),
            flush_mode: FlushMode::AutoFlushSync,
            mutation_buffer_space: 1000,
            timeout: Duration::ZERO,
            pending: Vec::new(),
            closed: false,
        })
    }

    async fn table_exists(&self, name: &str) -> EtlResult<bool> {
        self.ensure_open()?;

        Ok(self.cluster.has_table(name))
    }

    async fn create_table(
        &self,
        name: &str,
        schema: &TableSchema,
        options: &CreateTableOptions,
    ) -> EtlResult<()> {
        self.ensure_open()?;

        let mut inner = self.cluster.inner.lock();
        if inner.tables.contains_key(name) {
            bail!(
                ErrorKind::DestinationTableAlreadyExists,
                "Kudu table already exists",
                format!("table {name} already exists")
            );
        }

        if options.partition_schema().hash_bucket_schemas.is_empty()
            && options.partition_schema().range_partition_columns.is_empty()
        {
            bail!(
                ErrorKind::DestinationSchemaError,
                "Kudu table has no partitioning",
                format!("table {name} must be hash or range partitioned")
            );
        }

        inner.tables.insert(
            name.to_owned(),
            MemoryTable {
                schema: schema.clone(),
                partition_schema: options.partition_schema().clone(),
                rows: BTreeMap::new(),
            },
        );

        info!(table = name, "memory kudu table created");

        Ok(())
    }

    async fn delete_table(&self, name: &str) -> EtlResult<()> {
        self.ensure_open()?;

        let mut inner = self.cluster.inner.lock();
        if inner.tables.remove(name).is_none() {
            bail!(
                ErrorKind::DestinationTableMissing,
                "Kudu table not found",
                format!("table {name} does not exist")
            );
        }

        Ok(())
    }

    async fn alter_table(&self, name: &str, options: &AlterTableOptions) -> EtlResult<()> {
        self.ensure_open()?;

        let Some(new_name) = options.new_name() else {
            return Ok(());
        };

        let mut inner = self.cluster.inner.lock();
        if inner.tables.contains_key(new_name) {
            bail!(
                ErrorKind::DestinationTableAlreadyExists,
                "Kudu table already exists",
                format!("cannot rename {name}: table {new_name} already exists")
            );
        }

        let Some(table) = inner.tables.remove(name) else {
            bail!(
                ErrorKind::DestinationTableMissing,
                "Kudu table not found",
                format!("table {name} does not exist")
            );
        };
        inner.tables.insert(new_name.to_owned(), table);

        Ok(())
    }

    async fn is_alter_table_done(&self, name: &str) -> EtlResult<bool> {
        self.ensure_open()?;

        let inner = self.cluster.inner.lock();
        if !inner.tables.contains_key(name) {
            bail!(
                ErrorKind::DestinationTableMissing,
                "Kudu table not found",
                format!("table {name} does not exist")
            );
        }

        if inner.faults.alter_status_unavailable {
            bail!(
                ErrorKind::DestinationConnectionFailed,
                "Could not read Kudu alter table status",
                format!("injected status failure for {name}")
            );
        }

        Ok(!inner.faults.alter_never_done)
    }

    async fn count_rows(&self, name: &str) -> EtlResult<u64> {
        self.ensure_open()?;

        let inner = self.cluster.inner.lock();
        let Some(table) = inner.tables.get(name) else {
            bail!(
                ErrorKind::DestinationTableMissing,
                "Kudu table not found",
                format!("table {name} does not exist")
            );
        };

        Ok(table.rows.len() as u64)
    }

    async fn close(&self) -> EtlResult<()> {
        self.closed.store(true, Ordering::SeqCst);

        Ok(())
    }
}

/// Session of a [`MemoryKuduClient`].
#[derive(Debug)]
pub struct MemoryKuduSession {
    cluster: MemoryKuduCluster,
    client_closed: Arc<AtomicBool>,
    flush_mode: FlushMode,
    mutation_buffer_space: usize,
    timeout: Duration,
    pending: Vec<Operation>,
    closed: bool,
}

impl MemoryKuduSession {
    pub fn flush_mode(&self) -> FlushMode {
        self.flush_mode
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn ensure_usable(&self) -> EtlResult<()> {
        if self.closed {
            bail!(
                ErrorKind::InvalidState,
                "Kudu session is closed",
                "operations cannot be applied to a closed session"
            );
        }

        if self.client_closed.load(Ordering::SeqCst) {
            bail!(
                ErrorKind::DestinationConnectionFailed,
                "Kudu client is closed",
                "the session's client was shut down"
            );
        }

        Ok(())
    }

    fn flush_pending(&mut self) -> EtlResult<Vec<OperationResponse>> {
        let operations = std::mem::take(&mut self.pending);
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        self.cluster.flush_operations(operations)
    }
}

impl KuduSession for MemoryKuduSession {
    fn set_flush_mode(&mut self, mode: FlushMode) -> EtlResult<()> {
        if !self.pending.is_empty() {
            bail!(
                ErrorKind::InvalidState,
                "Cannot change flush mode",
                "the session has pending operations"
            );
        }

        self.flush_mode = mode;

        Ok(())
    }

    fn set_mutation_buffer_space(&mut self, operations: usize) -> EtlResult<()> {
        if !self.pending.is_empty() {
            bail!(
                ErrorKind::InvalidState,
                "Cannot change mutation buffer space",
                "the session has pending operations"
            );
        }

        self.mutation_buffer_space = operations;

        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    async fn apply(&mut self, operation: Operation) -> EtlResult<Option<OperationResponse>> {
        self.ensure_usable()?;

        match self.flush_mode {
            FlushMode::AutoFlushSync => {
                let mut responses = self.cluster.flush_operations(vec![operation])?;
                Ok(responses.pop())
            }
            FlushMode::ManualFlush => {
                if self.pending.len() >= self.mutation_buffer_space {
                    bail!(
                        ErrorKind::DestinationBufferFull,
                        "Kudu mutation buffer is full",
                        format!(
                            "{} operations are buffered, flush before applying more",
                            self.pending.len()
                        )
                    );
                }

                self.pending.push(operation);

                Ok(None)
            }
        }
    }

    async fn flush(&mut self) -> EtlResult<Vec<OperationResponse>> {
        self.ensure_usable()?;

        self.flush_pending()
    }

    async fn close(&mut self) -> EtlResult<Vec<OperationResponse>> {
        if self.closed {
            return Ok(Vec::new());
        }

        self.closed = true;
        self.cluster.close_session();

        if self.pending.is_empty() {
            return Ok(Vec::new());
        }

        if self.client_closed.load(Ordering::SeqCst) {
            self.pending.clear();
            bail!(
                ErrorKind::DestinationConnectionFailed,
                "Kudu client is closed",
                "pending operations were dropped on close"
            );
        }

        self.flush_pending()
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn pending_operations(&self) -> usize {
        self.pending.len()
    }
}
