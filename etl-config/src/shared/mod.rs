//! Shared configuration types for the Kudu sink.

mod base;
mod kudu;
mod mapping;
mod sink;
mod write;

pub use base::ValidationError;
pub use kudu::KuduConnectionConfig;
pub use mapping::MappingConfig;
pub use sink::SinkConfig;
pub use write::{WriteConfig, WriteRetryConfig};
