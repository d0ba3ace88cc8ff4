//! Change-data-capture sink that replays row mutation events against Apache Kudu.
//!
//! [`sync::KuduSyncService`] routes each event to a [`template::KuduTemplate`], which batches
//! rows into Kudu sessions and retries failed batches with periodic reconnection.

pub mod client;
pub mod conversions;
pub mod error;
pub mod failpoints;
mod macros;
pub mod metrics;
pub mod sync;
pub mod template;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
