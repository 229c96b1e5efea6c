//! Field types understood by the schema builders.
//!
//! - [`SemanticType`] - logical type of a record field
//! - [`FieldType`] - conversion between Rust field values and engine values
//! - [`timestamp_scalar`] - the `DateTime` scalar backing timestamp fields

mod semantic;
mod timestamp;

pub use semantic::{
    CustomKey, FieldType, Mismatch, RecordKey, SemanticType, serialize_value, value_kind,
};
pub use timestamp::{TIMESTAMP_SCALAR, format_timestamp, parse_timestamp, timestamp_scalar};
