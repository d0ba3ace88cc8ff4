//! Conversion of source values into Kudu column values.

pub mod coerce;
pub mod hash;
pub mod row;
pub mod timestamp;
