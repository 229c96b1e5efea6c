//! Error types for schema derivation and argument loading.
//!
//! Errors fall into two groups. Startup errors (unregistered types, duplicate
//! registrations, malformed declarations) should halt initialization. Request
//! errors (missing, mismatched or unparseable arguments) are client input
//! problems and are converted into GraphQL response errors by the resolver.

use async_graphql::ErrorExtensions;

/// Opaque error returned by a registered decoder.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while deriving descriptors or loading arguments.
#[derive(Debug, thiserror::Error)]
pub enum SugarError {
    /// A field type has no native schema mapping and no registered parser.
    #[error("no schema mapping or registered parser for type `{type_name}`")]
    UnregisteredType {
        /// Name of the unresolved semantic type.
        type_name: String,
    },

    /// A parser is already registered for the semantic type.
    #[error("a parser is already registered for type `{type_name}`")]
    DuplicateRegistration {
        /// Name of the semantic type registered twice.
        type_name: String,
    },

    /// Registration was attempted after the registry was frozen.
    #[error("parser registry is frozen; parsers must be registered during initialization")]
    RegistryFrozen,

    /// The process-wide registry was read before it was frozen.
    #[error("parser registry has not been frozen yet")]
    RegistryNotReady,

    /// A field declaration carries a malformed tag.
    #[error("invalid tag `{tag}` on field `{field}`: {reason}")]
    InvalidTag {
        /// Field the tag is attached to.
        field: String,
        /// The tag as written.
        tag: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two fields of a record expose the same name.
    #[error("duplicate field `{name}` in `{type_name}`")]
    DuplicateField {
        /// Record type (or descriptor) name.
        type_name: String,
        /// The exposed name used twice.
        name: String,
    },

    /// Two different object types were collected under the same name.
    #[error("object type `{name}` is defined twice with different fields")]
    DuplicateType {
        /// The colliding type name.
        name: String,
    },

    /// A required argument was not supplied.
    #[error("missing required argument `{name}`")]
    MissingRequiredArgument {
        /// Argument name.
        name: String,
    },

    /// A raw argument value has the wrong shape for its native type.
    #[error("argument `{name}` expected {expected}, got {actual}")]
    TypeMismatch {
        /// Argument name.
        name: String,
        /// Expected semantic type.
        expected: String,
        /// Shape of the supplied value.
        actual: String,
    },

    /// A registered decoder rejected the supplied value.
    #[error("failed to parse argument `{name}`: {source}")]
    Parse {
        /// Argument name.
        name: String,
        /// Error returned by the decoder, passed through unchanged.
        #[source]
        source: BoxError,
    },
}

impl SugarError {
    /// Creates a new `UnregisteredType` error.
    #[must_use]
    pub fn unregistered(type_name: impl Into<String>) -> Self {
        Self::UnregisteredType {
            type_name: type_name.into(),
        }
    }

    /// Creates a new `MissingRequiredArgument` error.
    #[must_use]
    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingRequiredArgument { name: name.into() }
    }

    /// Returns the error code used in GraphQL error extensions.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnregisteredType { .. } => "UNREGISTERED_TYPE",
            Self::DuplicateRegistration { .. } => "DUPLICATE_REGISTRATION",
            Self::RegistryFrozen => "REGISTRY_FROZEN",
            Self::RegistryNotReady => "REGISTRY_NOT_READY",
            Self::InvalidTag { .. } => "INVALID_TAG",
            Self::DuplicateField { .. } => "DUPLICATE_FIELD",
            Self::DuplicateType { .. } => "DUPLICATE_TYPE",
            Self::MissingRequiredArgument { .. } => "MISSING_REQUIRED_ARGUMENT",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::Parse { .. } => "PARSE_ERROR",
        }
    }

    /// Returns true for errors caused by request input rather than by
    /// schema configuration.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingRequiredArgument { .. } | Self::TypeMismatch { .. } | Self::Parse { .. }
        )
    }

    /// Returns the argument name for request-time errors.
    #[must_use]
    pub fn argument(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredArgument { name }
            | Self::TypeMismatch { name, .. }
            | Self::Parse { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl ErrorExtensions for SugarError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| {
            e.set("code", self.error_code().to_owned());
            if let Some(argument) = self.argument() {
                e.set("argument", argument.to_owned());
            }
        })
    }
}
