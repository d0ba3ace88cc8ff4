//! Fixtures for testing the Kudu sink against a [`crate::client::MemoryKuduCluster`].
//!
//! [`schema`] creates the `users` and `orders` tables, [`event`] builds rows, events and
//! mappings for them, and [`template`] wires templates and sync services to a cluster with
//! retries that never sleep.

pub mod event;
pub mod failpoints;
pub mod schema;
pub mod template;
