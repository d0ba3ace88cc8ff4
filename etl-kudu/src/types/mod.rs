//! Event, row and schema types handled by the sink.

mod event;
mod row;
mod schema;
mod value;

pub use event::*;
pub use row::*;
pub use schema::*;
pub use value::*;
