//! Mapping from semantic field types to GraphQL schema types.

use std::sync::Arc;

use async_graphql::dynamic::TypeRef;

use crate::Result;
use crate::error::SugarError;
use crate::registry::{ParserEntry, ParserRegistry};
use crate::types::{SemanticType, TIMESTAMP_SCALAR};

/// Maps a semantic type to its built-in schema type.
///
/// Scalars map to GraphQL built-ins (timestamps to the `DateTime` scalar),
/// lists map element-wise and nested records map to their object type name.
/// All results are nullable.
///
/// # Errors
///
/// Returns `UnregisteredType` for custom types, which only the parser
/// registry can resolve.
pub fn map_type(semantic_type: &SemanticType) -> Result<TypeRef> {
    Ok(match semantic_type {
        SemanticType::String => TypeRef::named(TypeRef::STRING),
        SemanticType::Int => TypeRef::named(TypeRef::INT),
        SemanticType::Float => TypeRef::named(TypeRef::FLOAT),
        SemanticType::Boolean => TypeRef::named(TypeRef::BOOLEAN),
        SemanticType::Timestamp => TypeRef::named(TIMESTAMP_SCALAR),
        SemanticType::List(inner) => TypeRef::List(Box::new(map_type(inner)?)),
        SemanticType::Record(key) => TypeRef::named(key.name()),
        SemanticType::Custom(key) => return Err(SugarError::unregistered(key.name())),
    })
}

/// Returns true if values of this type can be coerced into arguments
/// without a registered parser.
///
/// Nested records are excluded: object types are not valid argument types.
#[must_use]
pub fn is_native_argument(semantic_type: &SemanticType) -> bool {
    !semantic_type.contains_custom() && !semantic_type.contains_record()
}

/// Resolves the schema type of an output field.
///
/// The native mapping wins; the registry's schema type is the fallback.
pub(crate) fn resolve_output_type(
    semantic_type: &SemanticType,
    registry: &ParserRegistry,
) -> Result<TypeRef> {
    match map_type(semantic_type) {
        Ok(type_ref) => Ok(type_ref),
        Err(err @ SugarError::UnregisteredType { .. }) => registry
            .lookup(semantic_type)
            .map(|entry| entry.schema_type().clone())
            .ok_or(err),
        Err(err) => Err(err),
    }
}

/// Resolves the schema type of an argument, together with the parser that
/// decodes it when the type is not native.
pub(crate) fn resolve_argument_type(
    semantic_type: &SemanticType,
    registry: &ParserRegistry,
) -> Result<(TypeRef, Option<Arc<ParserEntry>>)> {
    if is_native_argument(semantic_type) {
        return Ok((map_type(semantic_type)?, None));
    }

    match registry.entry(semantic_type) {
        Some(entry) => Ok((entry.schema_type().clone(), Some(entry))),
        None => Err(SugarError::unregistered(semantic_type.to_string())),
    }
}
