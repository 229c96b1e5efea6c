//! Semantic field types and the `FieldType` trait.
//!
//! A semantic type is the logical type of a record field, independent of how
//! it is represented in the GraphQL schema. Every Rust type usable as a
//! record field implements [`FieldType`], which names its semantic type and
//! converts between the Rust value and the engine's [`Value`].

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use async_graphql::Value;
use serde::Serialize;
use tracing::warn;

use crate::Result;
use crate::record::Record;
use crate::registry::ParserRegistry;
use crate::schema::ObjectTypeDescriptor;

/// The logical type of a record field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticType {
    /// UTF-8 text.
    String,
    /// Signed integer.
    Int,
    /// Double precision float.
    Float,
    /// Boolean.
    Boolean,
    /// Point in time with offset, exchanged as RFC 3339 text.
    Timestamp,
    /// Homogeneous list.
    List(Box<SemanticType>),
    /// Nested record, exposed as its own object type.
    Record(RecordKey),
    /// Application type without a built-in mapping.
    Custom(CustomKey),
}

impl SemanticType {
    /// Semantic type of a list of `inner`.
    #[must_use]
    pub fn list(inner: SemanticType) -> Self {
        Self::List(Box::new(inner))
    }

    /// Semantic type for a custom application type `T`.
    #[must_use]
    pub fn custom<T: 'static>() -> Self {
        Self::Custom(CustomKey::of::<T>())
    }

    /// Semantic type for a nested record `R`.
    #[must_use]
    pub fn record<R: Record>() -> Self {
        Self::Record(RecordKey::of::<R>())
    }

    /// Returns true if the type (or any list element type) is a nested record.
    #[must_use]
    pub fn contains_record(&self) -> bool {
        match self {
            Self::Record(_) => true,
            Self::List(inner) => inner.contains_record(),
            _ => false,
        }
    }

    /// Returns true if the type (or any list element type) is custom.
    #[must_use]
    pub fn contains_custom(&self) -> bool {
        match self {
            Self::Custom(_) => true,
            Self::List(inner) => inner.contains_custom(),
            _ => false,
        }
    }

    /// Innermost record referenced by this type, looking through lists.
    #[must_use]
    pub fn record_key(&self) -> Option<RecordKey> {
        match self {
            Self::Record(key) => Some(*key),
            Self::List(inner) => inner.record_key(),
            _ => None,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "String"),
            Self::Int => write!(f, "Int"),
            Self::Float => write!(f, "Float"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Timestamp => write!(f, "DateTime"),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::Record(key) => write!(f, "{}", key.name()),
            Self::Custom(key) => write!(f, "{}", key.name()),
        }
    }
}

/// Identity of a custom field type, keyed by its Rust `TypeId`.
#[derive(Clone, Copy)]
pub struct CustomKey {
    type_id: TypeId,
    name: &'static str,
}

impl CustomKey {
    /// Key for the Rust type `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
        }
    }

    /// Human-readable type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for CustomKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for CustomKey {}

impl Hash for CustomKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for CustomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomKey").field(&self.name).finish()
    }
}

/// Identity of a nested record type.
///
/// Besides the `TypeId`, the key remembers how to build the record's own
/// output type so that referenced records can be generated on demand.
#[derive(Clone, Copy)]
pub struct RecordKey {
    type_id: TypeId,
    name: &'static str,
    build_output: fn(&ParserRegistry) -> Result<ObjectTypeDescriptor>,
}

impl RecordKey {
    /// Key for the record type `R`.
    #[must_use]
    pub fn of<R: Record>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            name: R::TYPE_NAME,
            build_output: crate::schema::output::build_record_output_type::<R>,
        }
    }

    /// Object type name of the record.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Builds the record's own output type under its default name.
    ///
    /// # Errors
    ///
    /// Fails like [`crate::build_output_type`].
    pub fn build_output_type(&self, registry: &ParserRegistry) -> Result<ObjectTypeDescriptor> {
        (self.build_output)(registry)
    }
}

impl PartialEq for RecordKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for RecordKey {}

impl Hash for RecordKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordKey").field(&self.name).finish()
    }
}

/// Strips module paths from a `std::any::type_name` string, keeping generics.
fn short_type_name(full: &'static str) -> &'static str {
    let head_end = full.find('<').unwrap_or(full.len());
    match full[..head_end].rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// A raw value did not have the shape a native type expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Expected semantic type.
    pub expected: String,
    /// Shape of the supplied value.
    pub actual: String,
}

impl Mismatch {
    /// Builds a mismatch between `expected` and the shape of `value`.
    #[must_use]
    pub fn new(expected: &SemanticType, value: &Value) -> Self {
        Self {
            expected: expected.to_string(),
            actual: value_kind(value).to_string(),
        }
    }
}

/// Short name of a raw value's runtime shape.
#[must_use]
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Boolean(_) => "boolean",
        Value::Binary(_) => "binary",
        Value::Enum(_) => "enum",
        Value::List(_) => "list",
        Value::Object(_) => "object",
    }
}

/// A Rust type that can be used as a record field.
///
/// Native implementations cover `String`, `i32`, `i64`, `f64`, `bool`,
/// `time::OffsetDateTime`, `Vec<T>` and `Option<T>`. Custom types implement
/// it through [`crate::custom_field_type!`] and nested records through
/// [`crate::record_field_type!`].
pub trait FieldType: Sized + Send + Sync + 'static {
    /// The semantic type of this Rust type.
    fn semantic_type() -> SemanticType;

    /// Coerces a raw argument value directly into this type.
    ///
    /// # Errors
    ///
    /// Returns a [`Mismatch`] when the value's shape disagrees with the type.
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch>;

    /// Serializes the value for output and argument maps.
    fn to_value(&self) -> Value;

    /// Accepts the output of a registered decoder.
    ///
    /// Returns `None` if the decoder produced a different Rust type.
    fn from_decoded(decoded: Box<dyn Any + Send>) -> Option<Self> {
        decoded.downcast::<Self>().ok().map(|value| *value)
    }
}

/// Serializes a value through serde into the engine value type.
///
/// Used for custom field types, which carry no native conversion.
pub fn serialize_value<T: Serialize>(value: &T) -> Value {
    match async_graphql::to_value(value) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                error = %e,
                type_name = std::any::type_name::<T>(),
                "Failed to serialize field value"
            );
            Value::Null
        }
    }
}

impl FieldType for String {
    fn semantic_type() -> SemanticType {
        SemanticType::String
    }

    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(Mismatch::new(&Self::semantic_type(), other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl FieldType for i64 {
    fn semantic_type() -> SemanticType {
        SemanticType::Int
    }

    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| Mismatch::new(&Self::semantic_type(), value)),
            other => Err(Mismatch::new(&Self::semantic_type(), other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Number((*self).into())
    }
}

impl FieldType for i32 {
    fn semantic_type() -> SemanticType {
        SemanticType::Int
    }

    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .ok_or_else(|| Mismatch::new(&Self::semantic_type(), value)),
            other => Err(Mismatch::new(&Self::semantic_type(), other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Number((*self).into())
    }
}

impl FieldType for f64 {
    fn semantic_type() -> SemanticType {
        SemanticType::Float
    }

    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| Mismatch::new(&Self::semantic_type(), value)),
            other => Err(Mismatch::new(&Self::semantic_type(), other)),
        }
    }

    fn to_value(&self) -> Value {
        serde_json::Number::from_f64(*self)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

impl FieldType for bool {
    fn semantic_type() -> SemanticType {
        SemanticType::Boolean
    }

    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Boolean(b) => Ok(*b),
            other => Err(Mismatch::new(&Self::semantic_type(), other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }
}

impl<T: FieldType> FieldType for Vec<T> {
    fn semantic_type() -> SemanticType {
        SemanticType::list(T::semantic_type())
    }

    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::List(items) => items
                .iter()
                .map(|item| {
                    T::from_value(item).map_err(|inner| Mismatch {
                        expected: Self::semantic_type().to_string(),
                        actual: format!("list containing {}", inner.actual),
                    })
                })
                .collect(),
            other => Err(Mismatch::new(&Self::semantic_type(), other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldType::to_value).collect())
    }
}

impl<T: FieldType> FieldType for Option<T> {
    fn semantic_type() -> SemanticType {
        T::semantic_type()
    }

    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_decoded(decoded: Box<dyn Any + Send>) -> Option<Self> {
        // A parser may be registered for `Option<T>` itself or for `T`.
        match decoded.downcast::<Self>() {
            Ok(value) => Some(*value),
            Err(decoded) => T::from_decoded(decoded).map(Some),
        }
    }
}

/// Implements [`FieldType`] for an application type decoded through the
/// parser registry. The type must implement `serde::Serialize`.
#[macro_export]
macro_rules! custom_field_type {
    ($ty:ty) => {
        impl $crate::FieldType for $ty {
            fn semantic_type() -> $crate::SemanticType {
                $crate::SemanticType::custom::<Self>()
            }

            fn from_value(
                value: &$crate::Value,
            ) -> ::std::result::Result<Self, $crate::Mismatch> {
                ::std::result::Result::Err($crate::Mismatch::new(
                    &<Self as $crate::FieldType>::semantic_type(),
                    value,
                ))
            }

            fn to_value(&self) -> $crate::Value {
                $crate::types::serialize_value(self)
            }
        }
    };
}

/// Implements [`FieldType`] for a [`Record`] so it can be nested inside
/// another record's output type.
#[macro_export]
macro_rules! record_field_type {
    ($ty:ty) => {
        impl $crate::FieldType for $ty {
            fn semantic_type() -> $crate::SemanticType {
                $crate::SemanticType::record::<Self>()
            }

            fn from_value(
                value: &$crate::Value,
            ) -> ::std::result::Result<Self, $crate::Mismatch> {
                ::std::result::Result::Err($crate::Mismatch::new(
                    &<Self as $crate::FieldType>::semantic_type(),
                    value,
                ))
            }

            fn to_value(&self) -> $crate::Value {
                $crate::output_value(self)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Tags(Vec<String>);

    crate::custom_field_type!(Tags);

    #[test]
    fn test_semantic_types() {
        assert_eq!(String::semantic_type(), SemanticType::String);
        assert_eq!(i32::semantic_type(), SemanticType::Int);
        assert_eq!(i64::semantic_type(), SemanticType::Int);
        assert_eq!(f64::semantic_type(), SemanticType::Float);
        assert_eq!(Option::<bool>::semantic_type(), SemanticType::Boolean);
        assert_eq!(
            Vec::<Vec<String>>::semantic_type(),
            SemanticType::list(SemanticType::list(SemanticType::String))
        );
        assert_eq!(Tags::semantic_type(), SemanticType::custom::<Tags>());
    }

    #[test]
    fn test_display() {
        assert_eq!(Vec::<i64>::semantic_type().to_string(), "[Int]");
        assert_eq!(Tags::semantic_type().to_string(), "Tags");
        assert_eq!(Option::<Tags>::semantic_type().to_string(), "Tags");
    }

    #[test]
    fn test_custom_keys_compare_by_type() {
        assert_eq!(CustomKey::of::<Tags>(), CustomKey::of::<Tags>());
        assert_ne!(CustomKey::of::<Tags>(), CustomKey::of::<Vec<String>>());
        assert_eq!(CustomKey::of::<Tags>().name(), "Tags");
    }

    #[test]
    fn test_native_coercion() {
        assert_eq!(String::from_value(&Value::from("bob")), Ok("bob".to_string()));
        assert_eq!(i32::from_value(&Value::from(7)), Ok(7));
        assert_eq!(bool::from_value(&Value::Boolean(true)), Ok(true));
        assert_eq!(Option::<i64>::from_value(&Value::Null), Ok(None));
        assert_eq!(
            Vec::<String>::from_value(&Value::List(vec![Value::from("a"), Value::from("b")])),
            Ok(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_native_mismatch() {
        let err = i32::from_value(&Value::from("seven")).unwrap_err();
        assert_eq!(err.expected, "Int");
        assert_eq!(err.actual, "string");

        let err = i32::from_value(&Value::from(i64::from(i32::MAX) + 1)).unwrap_err();
        assert_eq!(err.actual, "number");

        let err =
            Vec::<String>::from_value(&Value::List(vec![Value::from("a"), Value::from(1)]))
                .unwrap_err();
        assert_eq!(err.expected, "[String]");
        assert_eq!(err.actual, "list containing number");
    }

    #[test]
    fn test_custom_types_are_not_coerced_natively() {
        let err = Tags::from_value(&Value::List(vec![])).unwrap_err();
        assert_eq!(err.expected, "Tags");
        assert_eq!(err.actual, "list");
    }

    #[test]
    fn test_custom_to_value_uses_serde() {
        let tags = Tags(vec!["a".into(), "b".into()]);
        assert_eq!(
            tags.to_value(),
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn test_from_decoded() {
        let decoded: Box<dyn Any + Send> = Box::new(Tags(vec!["x".into()]));
        assert_eq!(
            Option::<Tags>::from_decoded(decoded),
            Some(Some(Tags(vec!["x".into()])))
        );

        let wrong: Box<dyn Any + Send> = Box::new(42_i32);
        assert_eq!(Tags::from_decoded(wrong), None);
    }
}
