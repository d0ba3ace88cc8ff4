//! Batched writes, bounded retries and truncation against Kudu tables.
//!
//! [`KuduTemplate`] turns a slice of [`RowData`] into Kudu operations, applies them through a
//! manual-flush session and inspects every flush response. Rows rejected for a reason other
//! than an idempotent conflict mark the batch as failed; failed batches are replayed with a
//! fresh session up to [`WriteRetryConfig::max_attempts`] times, rebuilding the shared client
//! periodically. Only errors of the first attempt reach the caller.

mod activity;
mod backoff;
mod classify;

use std::time::Instant;

use etl_config::shared::{KuduConnectionConfig, SinkConfig, WriteConfig, WriteRetryConfig};
use tracing::{debug, error, info, warn};

pub use activity::TableActivityLog;
pub use backoff::calculate_backoff;
pub use classify::{RowErrorClass, classify_row_error};

use crate::bail;
use crate::client::{
    AlterTableOptions, CreateTableOptions, FlushMode, KuduClient, KuduConnection, KuduConnector,
    KuduSession, KuduTable, OperationKind, OperationResponse,
};
use crate::conversions::row::fill_row;
use crate::error::{ErrorKind, EtlResult};
use crate::failpoints::{
    TRUNCATE__AFTER_BACKUP_CREATED, WRITE_BATCH__BEFORE_APPLY, WRITE_BATCH__BEFORE_FLUSH,
    etl_fail_point,
};
use crate::metrics::{
    ETL_KUDU_ABANDONED_BATCHES_TOTAL, ETL_KUDU_FLUSH_DURATION_SECONDS,
    ETL_KUDU_RETRY_ATTEMPTS_TOTAL, ETL_KUDU_ROW_ERRORS_TOTAL, OPERATION_LABEL,
    ROW_ERROR_CLASS_LABEL, TABLE_LABEL, register_metrics,
};
use crate::types::RowData;

/// Suffix of the table that replaces the original during a truncate.
pub const TRUNCATE_BACKUP_SUFFIX: &str = "_truncate_bak";

/// Counts collected while writing one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Operations accepted by the cluster.
    pub applied: usize,
    /// Rows rejected with a [`RowErrorClass::Benign`] error.
    pub benign_errors: usize,
    /// Rows rejected with a [`RowErrorClass::Retryable`] error.
    pub retryable_errors: usize,
    /// Flushes sent, intermediate ones included.
    pub flushes: usize,
}

impl BatchOutcome {
    pub fn needs_retry(&self) -> bool {
        self.retryable_errors > 0
    }
}

/// Log level used for retryable row errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Warn,
    Error,
}

/// Picks the log level of an attempt. The initial attempt (`remaining` is `None`) logs at warn;
/// retries switch to error once `remaining` falls to the escalation threshold.
fn attempt_severity(remaining: Option<u32>, escalation_threshold: u32) -> Severity {
    match remaining {
        Some(remaining) if remaining <= escalation_threshold => Severity::Error,
        _ => Severity::Warn,
    }
}

/// Writes batches of rows to Kudu through a shared, lazily created client.
#[derive(Debug)]
pub struct KuduTemplate<C>
where
    C: KuduConnector,
{
    connection: KuduConnection<C>,
    write_config: WriteConfig,
    retry_config: WriteRetryConfig,
    activity: TableActivityLog,
}

impl<C> KuduTemplate<C>
where
    C: KuduConnector,
{
    /// Creates a template. No connection is made until the first operation.
    pub fn new(
        connector: C,
        kudu_config: KuduConnectionConfig,
        write_config: WriteConfig,
        retry_config: WriteRetryConfig,
    ) -> EtlResult<Self> {
        kudu_config.validate()?;
        write_config.validate()?;
        retry_config.validate()?;

        register_metrics();

        Ok(Self {
            connection: KuduConnection::new(connector, kudu_config),
            write_config,
            retry_config,
            activity: TableActivityLog::new(),
        })
    }

    /// Creates a template from the `kudu`, `write` and `write_retry` sections of `config`.
    pub fn from_config(connector: C, config: &SinkConfig) -> EtlResult<Self> {
        Self::new(
            connector,
            config.kudu.clone(),
            config.write.clone(),
            config.write_retry.clone(),
        )
    }

    pub fn connection(&self) -> &KuduConnection<C> {
        &self.connection
    }

    pub fn write_config(&self) -> &WriteConfig {
        &self.write_config
    }

    pub fn retry_config(&self) -> &WriteRetryConfig {
        &self.retry_config
    }

    pub async fn insert(
        &self,
        table: &str,
        encryption_columns: &[String],
        rows: &[RowData],
    ) -> EtlResult<()> {
        self.write(OperationKind::Insert, table, encryption_columns, rows)
            .await
    }

    pub async fn upsert(
        &self,
        table: &str,
        encryption_columns: &[String],
        rows: &[RowData],
    ) -> EtlResult<()> {
        self.write(OperationKind::Upsert, table, encryption_columns, rows)
            .await
    }

    /// Deletes rows by primary key. `rows` should only carry key columns.
    pub async fn delete(
        &self,
        table: &str,
        encryption_columns: &[String],
        rows: &[RowData],
    ) -> EtlResult<()> {
        self.write(OperationKind::Delete, table, encryption_columns, rows)
            .await
    }

    /// Writes `rows` as one batch of `kind` operations.
    ///
    /// Errors raised by the first attempt, such as an unreachable cluster or a missing table,
    /// are returned. Row-level failures are retried in the background of this call and are
    /// never returned; a batch that still fails when the retry budget runs out is abandoned.
    pub async fn write(
        &self,
        kind: OperationKind,
        table: &str,
        encryption_columns: &[String],
        rows: &[RowData],
    ) -> EtlResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        self.activity.record(table);

        let outcome = self
            .attempt(
                kind,
                table,
                encryption_columns,
                rows,
                attempt_severity(None, self.retry_config.escalation_threshold),
            )
            .await?;

        debug!(
            table,
            operation = %kind,
            rows = rows.len(),
            applied = outcome.applied,
            benign_errors = outcome.benign_errors,
            retryable_errors = outcome.retryable_errors,
            flushes = outcome.flushes,
            "kudu batch written"
        );

        if outcome.needs_retry() {
            warn!(
                table,
                operation = %kind,
                failed_rows = outcome.retryable_errors,
                "kudu batch had row errors, retrying"
            );

            self.retry(kind, table, encryption_columns, rows).await;
        }

        Ok(())
    }

    /// Empties `table` by replacing it with an empty copy.
    ///
    /// An empty table with the same schema and hash partitioning is created under
    /// `{table}_truncate_bak`, the original is deleted and the copy is renamed to the
    /// original name. Hash columns default to the primary key unless `partition_columns` is
    /// given; bucket count and seed come from the first hash level of the original table.
    /// Range partitioning is not carried over. The table is briefly missing between delete
    /// and rename.
    pub async fn truncate(
        &self,
        table: &str,
        partition_columns: Option<&[String]>,
    ) -> EtlResult<()> {
        self.activity.record(table);

        let client = self.connection.client().await?;
        let kudu_table = client.open_table(table).await?;
        let schema = kudu_table.schema().clone();

        let Some(hash_level) = kudu_table.partition_schema().hash_bucket_schemas.first() else {
            bail!(
                ErrorKind::DestinationSchemaError,
                "Kudu table has no hash partitioning",
                format!("cannot truncate {table}: the replacement table needs hash buckets")
            );
        };

        let hash_columns = match partition_columns {
            Some(columns) if !columns.is_empty() => columns.to_vec(),
            _ => schema.primary_key_columns(),
        };

        let backup_table = format!("{table}{TRUNCATE_BACKUP_SUFFIX}");
        if client.table_exists(&backup_table).await? {
            warn!(
                table,
                backup_table = %backup_table,
                "stale truncate backup table found, deleting it"
            );
            client.delete_table(&backup_table).await?;
        }

        let options = CreateTableOptions::new()
            .add_hash_partitions(hash_columns, hash_level.num_buckets, hash_level.seed)
            .set_range_partition_columns(Vec::new());
        client.create_table(&backup_table, &schema, &options).await?;

        etl_fail_point(TRUNCATE__AFTER_BACKUP_CREATED)?;

        client.delete_table(table).await?;
        client
            .alter_table(&backup_table, &AlterTableOptions::new().rename_table(table))
            .await?;

        match client.is_alter_table_done(table).await {
            Ok(true) => info!(
                table,
                num_buckets = hash_level.num_buckets,
                "kudu table truncated"
            ),
            Ok(false) => error!(
                table,
                backup_table = %backup_table,
                "kudu truncate incomplete, rename of the replacement table has not finished"
            ),
            Err(err) => error!(
                table,
                backup_table = %backup_table,
                error = %err,
                "kudu truncate incomplete, rename status of the replacement table is unknown"
            ),
        }

        Ok(())
    }

    pub async fn table_exists(&self, table: &str) -> EtlResult<bool> {
        let client = self.connection.client().await?;

        client.table_exists(table).await
    }

    /// Counts the rows of `table` with a full scan.
    pub async fn count_rows(&self, table: &str) -> EtlResult<u64> {
        let client = self.connection.client().await?;

        client.count_rows(table).await
    }

    /// Closes the shared client. The template cannot be used afterwards.
    pub async fn close(&self) -> EtlResult<()> {
        self.connection.close().await
    }

    async fn retry(
        &self,
        kind: OperationKind,
        table: &str,
        encryption_columns: &[String],
        rows: &[RowData],
    ) {
        let max_attempts = self.retry_config.max_attempts;
        let mut force_reconnect = false;
        let mut escalated = false;

        for remaining in (1..=max_attempts).rev() {
            let attempt = max_attempts - remaining + 1;

            let delay = calculate_backoff(&self.retry_config, attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            metrics::counter!(ETL_KUDU_RETRY_ATTEMPTS_TOTAL, TABLE_LABEL => table.to_owned())
                .increment(1);

            let severity =
                attempt_severity(Some(remaining), self.retry_config.escalation_threshold);
            if severity == Severity::Error && !escalated {
                error!(
                    table,
                    operation = %kind,
                    remaining,
                    "kudu batch still failing, retry budget nearly exhausted"
                );
                escalated = true;
            }

            if force_reconnect || remaining % self.retry_config.reconnect_every == 0 {
                if let Err(err) = self.connection.reconnect().await {
                    log_at(
                        severity,
                        table,
                        kind,
                        remaining,
                        &format!("kudu reconnect failed: {err}"),
                    );
                    force_reconnect = true;
                    continue;
                }
                force_reconnect = false;
            }

            match self
                .attempt(kind, table, encryption_columns, rows, severity)
                .await
            {
                Ok(outcome) if !outcome.needs_retry() => {
                    info!(
                        table,
                        operation = %kind,
                        attempt,
                        rows = rows.len(),
                        "kudu batch succeeded after retry"
                    );
                    return;
                }
                Ok(outcome) => {
                    log_at(
                        severity,
                        table,
                        kind,
                        remaining,
                        &format!("{} rows still failing", outcome.retryable_errors),
                    );
                }
                Err(err) => {
                    log_at(
                        severity,
                        table,
                        kind,
                        remaining,
                        &format!("kudu retry attempt failed: {err}"),
                    );
                    if err.is_connectivity() {
                        force_reconnect = true;
                    }
                }
            }
        }

        metrics::counter!(ETL_KUDU_ABANDONED_BATCHES_TOTAL, TABLE_LABEL => table.to_owned())
            .increment(1);

        error!(
            table,
            operation = %kind,
            rows = rows.len(),
            max_attempts,
            "kudu retry budget exhausted, abandoning batch"
        );
    }

    /// Runs one write of the whole batch with a fresh session.
    ///
    /// The session is closed on every path.
    async fn attempt(
        &self,
        kind: OperationKind,
        table: &str,
        encryption_columns: &[String],
        rows: &[RowData],
        severity: Severity,
    ) -> EtlResult<BatchOutcome> {
        let client = self.connection.client().await?;
        let kudu_table = client.open_table(table).await?;
        let mut session = client.new_session()?;

        let result = self
            .write_rows(
                &mut session,
                &kudu_table,
                kind,
                encryption_columns,
                rows,
                severity,
            )
            .await;

        if !session.is_closed() {
            match session.close().await {
                Ok(responses) if !responses.is_empty() => {
                    warn!(
                        table,
                        operations = responses.len(),
                        "pending kudu operations were flushed on session close"
                    );
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(table, error = %err, "failed to close kudu session");
                }
            }
        }

        result
    }

    async fn write_rows<S>(
        &self,
        session: &mut S,
        kudu_table: &KuduTable,
        kind: OperationKind,
        encryption_columns: &[String],
        rows: &[RowData],
        severity: Severity,
    ) -> EtlResult<BatchOutcome>
    where
        S: KuduSession,
    {
        session.set_flush_mode(FlushMode::ManualFlush)?;
        session.set_mutation_buffer_space(self.write_config.mutation_buffer_space)?;
        session.set_timeout(self.write_config.session_timeout());

        etl_fail_point(WRITE_BATCH__BEFORE_APPLY)?;

        let table = kudu_table.name();
        let column_index = kudu_table.schema().column_index();
        let flush_threshold = self.write_config.flush_threshold();

        let mut outcome = BatchOutcome::default();
        let mut uncommitted = 0;

        for data in rows {
            let mut operation = kudu_table.new_operation(kind);
            fill_row(
                operation.row_mut(),
                data,
                &column_index,
                encryption_columns,
                table,
            );

            if let Some(response) = session.apply(operation).await? {
                inspect_responses(table, kind, &[response], severity, &mut outcome);
            }

            uncommitted += 1;
            if uncommitted > flush_threshold {
                let responses = flush_session(session, table, kind).await?;
                outcome.flushes += 1;
                inspect_responses(table, kind, &responses, severity, &mut outcome);
                uncommitted = 0;
            }
        }

        etl_fail_point(WRITE_BATCH__BEFORE_FLUSH)?;

        let responses = flush_session(session, table, kind).await?;
        outcome.flushes += 1;
        inspect_responses(table, kind, &responses, severity, &mut outcome);

        Ok(outcome)
    }
}

async fn flush_session<S>(
    session: &mut S,
    table: &str,
    kind: OperationKind,
) -> EtlResult<Vec<OperationResponse>>
where
    S: KuduSession,
{
    let started = Instant::now();
    let responses = session.flush().await?;

    metrics::histogram!(
        ETL_KUDU_FLUSH_DURATION_SECONDS,
        TABLE_LABEL => table.to_owned(),
        OPERATION_LABEL => kind.as_str()
    )
    .record(started.elapsed().as_secs_f64());

    Ok(responses)
}

/// Classifies and logs every row error in `responses`.
fn inspect_responses(
    table: &str,
    kind: OperationKind,
    responses: &[OperationResponse],
    severity: Severity,
    outcome: &mut BatchOutcome,
) {
    for response in responses {
        let Some(row_error) = response.row_error() else {
            outcome.applied += 1;
            continue;
        };

        let class = classify_row_error(kind, row_error.status);
        metrics::counter!(
            ETL_KUDU_ROW_ERRORS_TOTAL,
            TABLE_LABEL => table.to_owned(),
            ROW_ERROR_CLASS_LABEL => class.as_str()
        )
        .increment(1);

        match class {
            RowErrorClass::Benign => {
                warn!(
                    table,
                    operation = %kind,
                    error = %row_error,
                    row = ?row_error.operation.row(),
                    "kudu row already in the requested state, ignoring"
                );
                outcome.benign_errors += 1;
            }
            RowErrorClass::Retryable => {
                match severity {
                    Severity::Warn => warn!(
                        table,
                        operation = %kind,
                        error = %row_error,
                        row = ?row_error.operation.row(),
                        "kudu row write failed"
                    ),
                    Severity::Error => error!(
                        table,
                        operation = %kind,
                        error = %row_error,
                        row = ?row_error.operation.row(),
                        "kudu row write failed"
                    ),
                }
                outcome.retryable_errors += 1;
            }
        }
    }
}

fn log_at(severity: Severity, table: &str, kind: OperationKind, remaining: u32, message: &str) {
    match severity {
        Severity::Warn => warn!(table, operation = %kind, remaining, "{message}"),
        Severity::Error => error!(table, operation = %kind, remaining, "{message}"),
    }
}
