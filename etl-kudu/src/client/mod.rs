//! Kudu store abstraction, connection management and the in-memory cluster.

mod base;
mod connection;
mod memory;

pub use base::*;
pub use connection::{ConnectionStatus, KuduConnection};
pub use memory::{MemoryKuduClient, MemoryKuduCluster, MemoryKuduConnector, MemoryKuduSession};
