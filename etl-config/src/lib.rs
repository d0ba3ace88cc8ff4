//! Configuration types and loading for the Kudu CDC sink.
//!
//! Shared configuration structures live in [`shared`]; [`load_config`] builds them from layered
//! configuration files and `APP_`-prefixed environment variables.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config, load_config_from};
