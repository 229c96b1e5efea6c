//! Parser registry for field types without a built-in schema mapping.
//!
//! The registry has two phases. During initialization parsers are added to a
//! mutable [`RegistryBuilder`]; [`RegistryBuilder::freeze`] then produces an
//! immutable [`ParserRegistry`] that is shared across request handlers without
//! locking.
//!
//! A process-wide instance is available through [`register_arg_parser`],
//! [`freeze`] and [`global`]:
//!
//! ```ignore
//! graphql_sugar::register_arg_parser(parse_movies_list, TypeRef::named_list(TypeRef::STRING));
//! let registry = graphql_sugar::registry::freeze();
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use async_graphql::Value;
use async_graphql::dynamic::TypeRef;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::Result;
use crate::error::{BoxError, SugarError};
use crate::mapper;
use crate::types::{FieldType, SemanticType};

type DecodeFn = dyn Fn(&Value) -> std::result::Result<Box<dyn Any + Send>, BoxError> + Send + Sync;

/// A registered decoder and the schema type it is exposed as.
pub struct ParserEntry {
    semantic_type: SemanticType,
    schema_type: TypeRef,
    decode: Box<DecodeFn>,
}

impl ParserEntry {
    /// Semantic type this entry decodes.
    #[must_use]
    pub fn semantic_type(&self) -> &SemanticType {
        &self.semantic_type
    }

    /// Schema type used for fields of this semantic type.
    #[must_use]
    pub fn schema_type(&self) -> &TypeRef {
        &self.schema_type
    }

    /// Runs the decoder on a raw argument value.
    ///
    /// # Errors
    ///
    /// Returns the decoder's own error unchanged.
    pub fn decode(&self, value: &Value) -> std::result::Result<Box<dyn Any + Send>, BoxError> {
        (self.decode)(value)
    }
}

impl fmt::Debug for ParserEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserEntry")
            .field("semantic_type", &self.semantic_type)
            .field("schema_type", &self.schema_type)
            .finish_non_exhaustive()
    }
}

/// Mutable registry used during initialization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: HashMap<SemanticType, Arc<ParserEntry>>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a decoder for the field type `T`, exposed as `schema_type`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateRegistration` if `T`'s semantic type already has a
    /// parser. The existing registration is left untouched.
    pub fn register<T, F, E>(&mut self, decode: F, schema_type: TypeRef) -> Result<&mut Self>
    where
        T: FieldType,
        F: Fn(&Value) -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let semantic_type = T::semantic_type();
        if self.entries.contains_key(&semantic_type) {
            return Err(SugarError::DuplicateRegistration {
                type_name: semantic_type.to_string(),
            });
        }

        if mapper::is_native_argument(&semantic_type) {
            warn!(
                semantic_type = %semantic_type,
                "Parser registered for a natively mapped type; the native mapping takes precedence"
            );
        }

        debug!(semantic_type = %semantic_type, schema_type = %schema_type, "Registering arg parser");

        let entry = ParserEntry {
            semantic_type: semantic_type.clone(),
            schema_type,
            decode: Box::new(move |value: &Value| {
                decode(value)
                    .map(|typed| Box::new(typed) as Box<dyn Any + Send>)
                    .map_err(Into::into)
            }),
        };
        self.entries.insert(semantic_type, Arc::new(entry));
        Ok(self)
    }

    /// Number of registered parsers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no parser is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ends the initialization phase.
    #[must_use]
    pub fn freeze(self) -> ParserRegistry {
        ParserRegistry {
            entries: Arc::new(self.entries),
        }
    }
}

/// Immutable parser registry, safe for concurrent reads.
///
/// Cloning is cheap; all clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct ParserRegistry {
    entries: Arc<HashMap<SemanticType, Arc<ParserEntry>>>,
}

impl ParserRegistry {
    /// Starts a new registry in its initialization phase.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Looks up the parser for a semantic type.
    #[must_use]
    pub fn lookup(&self, semantic_type: &SemanticType) -> Option<&ParserEntry> {
        self.entries.get(semantic_type).map(Arc::as_ref)
    }

    pub(crate) fn entry(&self, semantic_type: &SemanticType) -> Option<Arc<ParserEntry>> {
        self.entries.get(semantic_type).cloned()
    }

    /// Returns true if a parser is registered for the semantic type.
    #[must_use]
    pub fn contains(&self, semantic_type: &SemanticType) -> bool {
        self.entries.contains_key(semantic_type)
    }

    /// Number of registered parsers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no parser is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Process-wide registry
// =============================================================================

static PENDING: Mutex<Option<RegistryBuilder>> = Mutex::new(None);
static FROZEN: OnceLock<ParserRegistry> = OnceLock::new();

/// Registers a parser in the process-wide registry.
///
/// Intended for a one-time setup block before the schema is built.
///
/// # Panics
///
/// Panics if a parser for `T` is already registered, or if the process-wide
/// registry has already been frozen.
pub fn register_arg_parser<T, F, E>(decode: F, schema_type: TypeRef)
where
    T: FieldType,
    F: Fn(&Value) -> std::result::Result<T, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    if let Err(e) = try_register_arg_parser(decode, schema_type) {
        panic!("{e}");
    }
}

/// Registers a parser in the process-wide registry.
///
/// # Errors
///
/// Returns `DuplicateRegistration` if a parser for `T` already exists, or
/// `RegistryFrozen` once [`freeze`] has been called.
pub fn try_register_arg_parser<T, F, E>(decode: F, schema_type: TypeRef) -> Result<()>
where
    T: FieldType,
    F: Fn(&Value) -> std::result::Result<T, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    let mut pending = PENDING.lock();
    if FROZEN.get().is_some() {
        return Err(SugarError::RegistryFrozen);
    }
    pending
        .get_or_insert_with(RegistryBuilder::new)
        .register(decode, schema_type)?;
    Ok(())
}

/// Freezes the process-wide registry, ending the initialization phase.
///
/// Later calls return the same registry.
pub fn freeze() -> &'static ParserRegistry {
    let mut pending = PENDING.lock();
    FROZEN.get_or_init(|| {
        let registry = pending.take().unwrap_or_default().freeze();
        info!(parsers = registry.len(), "Parser registry frozen");
        registry
    })
}

/// Returns the frozen process-wide registry.
///
/// # Errors
///
/// Returns `RegistryNotReady` if [`freeze`] has not been called yet.
pub fn global() -> Result<&'static ParserRegistry> {
    FROZEN.get().ok_or(SugarError::RegistryNotReady)
}
