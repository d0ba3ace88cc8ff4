use fail::fail_point;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};

/// Evaluated after a session has been opened and before any row is applied.
pub const WRITE_BATCH__BEFORE_APPLY: &str = "write_batch.before_apply";

/// Evaluated before the final flush of a batch.
pub const WRITE_BATCH__BEFORE_FLUSH: &str = "write_batch.before_flush";

/// Evaluated after the backup table was created and before the original is deleted.
pub const TRUNCATE__AFTER_BACKUP_CREATED: &str = "truncate.after_backup_created";

/// Returns an error when the named failpoint is active.
///
/// The failpoint parameter selects the error kind: `connection` (the default), `timeout` or
/// `write`.
pub fn etl_fail_point(name: &str) -> EtlResult<()> {
    fail_point!(name, |parameter| {
        let error_kind = match parameter.as_deref() {
            Some("timeout") => ErrorKind::DestinationTimeout,
            Some("write") => ErrorKind::DestinationWriteFailed,
            _ => ErrorKind::DestinationConnectionFailed,
        };

        bail!(
            error_kind,
            "An error occurred in a fail point",
            format!("The failpoint '{name}' returned an error")
        );
    });

    Ok(())
}
