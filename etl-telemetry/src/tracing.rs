use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Set to any value to print logs from tests.
const ENABLE_TRACING_ENV_NAME: &str = "ENABLE_TRACING";

static INIT_TEST_TRACING: Once = Once::new();

/// Installs the global subscriber for `app_name`.
///
/// The filter comes from `RUST_LOG` and falls back to `{app_name}=info,etl_kudu=info`.
pub fn init_tracing(app_name: &str) -> Result<(), TryInitError> {
    let default_directives = format!("{}=info,etl_kudu=info", app_name.replace('-', "_"));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives.into()))
        .with(fmt::layer().with_target(true))
        .try_init()
}

/// Installs a test writer subscriber once per process when `ENABLE_TRACING` is set.
///
/// Without the variable, tests run silently.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var_os(ENABLE_TRACING_ENV_NAME).is_none() {
            return;
        }

        let _ = tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}
