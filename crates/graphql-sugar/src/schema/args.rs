//! Argument derivation for mutation fields.
//!
//! [`build_args_config`] reads a record's argument-tagged fields once and
//! resolves, per argument, its schema type and how raw values are decoded.
//! The resulting [`ArgsConfig`] is both the schema-side argument list and the
//! binding table used by the loader.

use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::{Field, InputValue, TypeRef};
use async_graphql::{Name, Value};
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::Result;
use crate::error::SugarError;
use crate::loader::{RawArgs, load_args};
use crate::mapper::resolve_argument_type;
use crate::record::{Record, RecordShape, Slot};
use crate::registry::{ParserEntry, ParserRegistry};
use crate::types::SemanticType;

/// Schema-side description of one argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDescriptor {
    /// Nullable schema type of the argument.
    pub type_ref: TypeRef,
    /// Whether the argument must be supplied.
    pub required: bool,
    /// Description, empty when none was declared.
    pub description: String,
}

impl ArgumentDescriptor {
    /// Schema type as exposed to clients: non-null when required.
    #[must_use]
    pub fn schema_type(&self) -> TypeRef {
        if self.required {
            TypeRef::NonNull(Box::new(self.type_ref.clone()))
        } else {
            self.type_ref.clone()
        }
    }

    /// Builds the dynamic input value for this argument.
    #[must_use]
    pub fn to_input_value(&self, name: &str) -> InputValue {
        let mut input = InputValue::new(name, self.schema_type());
        if !self.description.is_empty() {
            input = input.description(&self.description);
        }
        input
    }
}

/// How raw values of an argument are turned into field values.
enum Decoding {
    Native,
    Custom(Arc<ParserEntry>),
}

/// One argument bound to its record field.
pub(crate) struct ArgBinding<R> {
    descriptor: ArgumentDescriptor,
    semantic_type: SemanticType,
    decoding: Decoding,
    slot: Box<dyn Slot<R>>,
}

impl<R> ArgBinding<R> {
    pub(crate) fn descriptor(&self) -> &ArgumentDescriptor {
        &self.descriptor
    }

    /// Decodes `value` and stores it into the bound field of `record`.
    pub(crate) fn assign(&self, name: &str, record: &mut R, value: &Value) -> Result<()> {
        match &self.decoding {
            Decoding::Native => {
                self.slot
                    .write_value(record, value)
                    .map_err(|mismatch| SugarError::TypeMismatch {
                        name: name.to_string(),
                        expected: mismatch.expected,
                        actual: mismatch.actual,
                    })
            }
            Decoding::Custom(entry) => {
                let decoded = entry.decode(value).map_err(|source| SugarError::Parse {
                    name: name.to_string(),
                    source,
                })?;
                if self.slot.write_decoded(record, decoded) {
                    Ok(())
                } else {
                    Err(SugarError::TypeMismatch {
                        name: name.to_string(),
                        expected: self.semantic_type.to_string(),
                        actual: "decoder output of another type".into(),
                    })
                }
            }
        }
    }

    pub(crate) fn read(&self, record: &R) -> Value {
        self.slot.read(record)
    }
}

/// Arguments derived from a record type, keyed by argument name in
/// declaration order.
pub struct ArgsConfig<R> {
    bindings: IndexMap<String, ArgBinding<R>>,
}

impl<R: Record> ArgsConfig<R> {
    /// Iterates over argument names and descriptors.
    pub fn arguments(&self) -> impl Iterator<Item = (&str, &ArgumentDescriptor)> {
        self.bindings
            .iter()
            .map(|(name, binding)| (name.as_str(), &binding.descriptor))
    }

    /// Returns the descriptor of the named argument.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgumentDescriptor> {
        self.bindings.get(name).map(|binding| &binding.descriptor)
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if the record declares no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Plain descriptor map, comparable across builds.
    #[must_use]
    pub fn to_descriptor_map(&self) -> IndexMap<String, ArgumentDescriptor> {
        self.arguments()
            .map(|(name, descriptor)| (name.to_string(), descriptor.clone()))
            .collect()
    }

    /// Dynamic input values for every argument.
    #[must_use]
    pub fn input_values(&self) -> Vec<InputValue> {
        self.arguments()
            .map(|(name, descriptor)| descriptor.to_input_value(name))
            .collect()
    }

    /// Attaches every argument to a dynamic field.
    #[must_use]
    pub fn apply(&self, field: Field) -> Field {
        self.input_values()
            .into_iter()
            .fold(field, Field::argument)
    }

    /// Serializes the argument-tagged fields of `record` into a raw argument
    /// map. Loading the map back yields the same argument values.
    #[must_use]
    pub fn to_raw_args(&self, record: &R) -> async_graphql::indexmap::IndexMap<Name, Value> {
        self.bindings
            .iter()
            .map(|(name, binding)| (Name::new(name), binding.read(record)))
            .collect()
    }

    /// Loads a record from raw argument values.
    ///
    /// # Errors
    ///
    /// See [`load_args`].
    pub fn load(&self, raw: &impl RawArgs) -> Result<R> {
        load_args(self, raw)
    }

    pub(crate) fn binding(&self, name: &str) -> Option<&ArgBinding<R>> {
        self.bindings.get(name)
    }

    pub(crate) fn bindings(&self) -> impl Iterator<Item = (&str, &ArgBinding<R>)> {
        self.bindings
            .iter()
            .map(|(name, binding)| (name.as_str(), binding))
    }
}

impl<R> fmt::Debug for ArgsConfig<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.bindings
                    .iter()
                    .map(|(name, binding)| (name, &binding.descriptor)),
            )
            .finish()
    }
}

/// Builds the argument configuration of `R`.
///
/// # Errors
///
/// - `InvalidTag` for a malformed argument tag
/// - `UnregisteredType` if an argument type has neither a native mapping nor
///   a registered parser (nested records always need a parser)
/// - `DuplicateField` if two fields share an argument name
pub fn build_args_config<R: Record>(registry: &ParserRegistry) -> Result<ArgsConfig<R>> {
    let mut bindings = IndexMap::new();

    for field in RecordShape::<R>::of().into_fields() {
        let Some(tag) = field.arg_tag()? else {
            continue;
        };

        let (type_ref, parser) = resolve_argument_type(field.semantic_type(), registry)?;
        trace!(
            type_name = R::TYPE_NAME,
            argument = %tag.name,
            schema_type = %type_ref,
            required = tag.required,
            custom = parser.is_some(),
            "Mapped argument"
        );

        let binding = ArgBinding {
            descriptor: ArgumentDescriptor {
                type_ref,
                required: tag.required,
                description: field.description().to_string(),
            },
            semantic_type: field.semantic_type().clone(),
            decoding: parser.map_or(Decoding::Native, Decoding::Custom),
            slot: field.into_slot(),
        };

        if bindings.contains_key(&tag.name) {
            return Err(SugarError::DuplicateField {
                type_name: R::TYPE_NAME.to_string(),
                name: tag.name,
            });
        }
        bindings.insert(tag.name, binding);
    }

    debug!(type_name = R::TYPE_NAME, arguments = bindings.len(), "Built args config");
    Ok(ArgsConfig { bindings })
}
