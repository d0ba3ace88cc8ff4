use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::info;

/// Format of the hourly activity window key.
const WINDOW_FORMAT: &str = "%Y%m%d%H";

/// Logs the first write or truncate against each table in every UTC hour.
#[derive(Debug, Default)]
pub struct TableActivityLog {
    windows: Mutex<HashMap<String, String>>,
}

impl TableActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records activity on `table` now. See [`TableActivityLog::record_at`].
    pub fn record(&self, table: &str) -> bool {
        self.record_at(table, Utc::now())
    }

    /// Records activity on `table` at `at`.
    ///
    /// Returns `true` and logs when this is the first activity in the hour of `at`.
    pub fn record_at(&self, table: &str, at: DateTime<Utc>) -> bool {
        let window = at.format(WINDOW_FORMAT).to_string();

        let mut windows = self.windows.lock();
        if windows.get(table) == Some(&window) {
            return false;
        }
        windows.insert(table.to_owned(), window);
        drop(windows);

        info!(
            table,
            timestamp_ms = at.timestamp_millis(),
            "kudu table active in this hour"
        );

        true
    }
}
