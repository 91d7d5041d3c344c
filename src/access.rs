//! Access layer for host records.
//!
//! - **Record**: read access to the fields of a host record by name
//! - **Value**: the closed set of values a field or literal can hold
//!
//! Everything that evaluates a query reads records through these two types and
//! never needs to know the concrete host type behind them.

pub mod record;
pub mod value;

pub use record::Record;
pub use value::{format_duration, EnumValue, Value};
