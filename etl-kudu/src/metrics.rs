use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};

static REGISTER_METRICS: Once = Once::new();

/// Label for the target Kudu table.
pub const TABLE_LABEL: &str = "table";

/// Label for the write operation (`insert`, `upsert`, `delete`).
pub const OPERATION_LABEL: &str = "operation";

/// Label for the row error class (`benign`, `retryable`).
pub const ROW_ERROR_CLASS_LABEL: &str = "class";

/// Duration of a single session flush.
/// Labels: `table`, `operation`.
pub const ETL_KUDU_FLUSH_DURATION_SECONDS: &str = "etl_kudu_flush_duration_seconds";

/// Row errors returned by flushes.
/// Labels: `table`, `class`.
pub const ETL_KUDU_ROW_ERRORS_TOTAL: &str = "etl_kudu_row_errors_total";

/// Retry attempts made for failed batches.
/// Labels: `table`.
pub const ETL_KUDU_RETRY_ATTEMPTS_TOTAL: &str = "etl_kudu_retry_attempts_total";

/// Batches abandoned after the retry budget was exhausted.
/// Labels: `table`.
pub const ETL_KUDU_ABANDONED_BATCHES_TOTAL: &str = "etl_kudu_abandoned_batches_total";

/// Rebuilds of the shared Kudu client.
pub const ETL_KUDU_RECONNECTS_TOTAL: &str = "etl_kudu_reconnects_total";

/// Registers the Kudu sink metrics.
///
/// Safe to call multiple times, registration happens only once.
pub fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_histogram!(
            ETL_KUDU_FLUSH_DURATION_SECONDS,
            Unit::Seconds,
            "Duration of Kudu session flushes, labeled by table and operation"
        );

        describe_counter!(
            ETL_KUDU_ROW_ERRORS_TOTAL,
            Unit::Count,
            "Row errors returned by Kudu flushes, labeled by table and error class"
        );

        describe_counter!(
            ETL_KUDU_RETRY_ATTEMPTS_TOTAL,
            Unit::Count,
            "Retry attempts for batches that failed with row errors, labeled by table"
        );

        describe_counter!(
            ETL_KUDU_ABANDONED_BATCHES_TOTAL,
            Unit::Count,
            "Batches abandoned after exhausting the retry budget, labeled by table"
        );

        describe_counter!(
            ETL_KUDU_RECONNECTS_TOTAL,
            Unit::Count,
            "Number of times the shared Kudu client was rebuilt"
        );
    });
}
