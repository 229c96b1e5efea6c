//! `DateTime` scalar for timestamp fields.
//!
//! Timestamps are `time::OffsetDateTime` values exchanged as RFC 3339 strings.
//!
//! # Examples
//! - `2012-02-03T09:19:38.000004213Z`
//! - `2024-01-15T10:30:00+01:00`

use async_graphql::Value;
use async_graphql::dynamic::Scalar;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

use super::semantic::{FieldType, Mismatch, SemanticType};

/// Schema name of the timestamp scalar.
pub const TIMESTAMP_SCALAR: &str = "DateTime";

/// Parses an RFC 3339 timestamp.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339).ok()
}

/// Formats a timestamp as RFC 3339.
///
/// Returns `None` for values RFC 3339 cannot express (years outside
/// 0000-9999, sub-minute offsets).
#[must_use]
pub fn format_timestamp(ts: &OffsetDateTime) -> Option<String> {
    ts.format(&Rfc3339).ok()
}

/// Creates the `DateTime` scalar to register in a dynamic schema.
///
/// Input values must be RFC 3339 strings.
#[must_use]
pub fn timestamp_scalar() -> Scalar {
    Scalar::new(TIMESTAMP_SCALAR)
        .description("A point in time, encoded as an RFC 3339 string")
        .specified_by_url("https://datatracker.ietf.org/doc/html/rfc3339")
        .validator(|value| matches!(value, Value::String(s) if parse_timestamp(s).is_some()))
}

impl FieldType for OffsetDateTime {
    fn semantic_type() -> SemanticType {
        SemanticType::Timestamp
    }

    fn from_value(value: &Value) -> Result<Self, Mismatch> {
        match value {
            Value::String(s) => {
                parse_timestamp(s).ok_or_else(|| Mismatch::new(&Self::semantic_type(), value))
            }
            other => Err(Mismatch::new(&Self::semantic_type(), other)),
        }
    }

    fn to_value(&self) -> Value {
        match format_timestamp(self) {
            Some(s) => Value::String(s),
            None => {
                warn!(timestamp = %self, "Timestamp is not representable as RFC 3339");
                Value::Null
            }
        }
    }
}
