//! # graphql-sugar
//!
//! Derives GraphQL output types and mutation arguments from plain Rust
//! records, and rebuilds typed records from resolver arguments.
//!
//! A record declares its fields once:
//!
//! ```ignore
//! impl Record for User {
//!     const TYPE_NAME: &'static str = "User";
//!
//!     fn describe(shape: &mut RecordShape<Self>) {
//!         shape
//!             .field("id", |u| &u.id, |u| &mut u.id)
//!             .output("id")
//!             .arg("id,required");
//!         shape
//!             .field("favorite_movies", |u| &u.favorite_movies, |u| &mut u.favorite_movies)
//!             .output("favoriteMovies")
//!             .arg("favoriteMovies");
//!     }
//! }
//! ```
//!
//! and the same declaration then drives:
//!
//! - [`build_output_type`] - the object type returned by queries
//! - [`build_args_config`] - the arguments accepted by a mutation
//! - [`load_args`] - a typed `User` built from the mutation's raw arguments
//!
//! Field types without a built-in mapping are registered once at startup
//! with [`register_arg_parser`] and the registry is then frozen.
//!
//! ## Modules
//!
//! - [`types`] - semantic field types and the `DateTime` scalar
//! - [`record`] - record declarations
//! - [`mapper`] - semantic type to schema type mapping
//! - [`registry`] - parsers for custom field types
//! - [`schema`] - output type and argument builders
//! - [`loader`] - raw arguments to typed records
//! - [`error`] - error types

pub mod error;
pub mod loader;
pub mod mapper;
pub mod record;
pub mod registry;
pub mod schema;
pub mod types;

// Engine types used in public signatures and by the field type macros
pub use async_graphql::dynamic::TypeRef;
pub use async_graphql::{Name, Value};

// Re-export main types
pub use error::{BoxError, SugarError};
pub use loader::{RawArgs, load_args};
pub use mapper::map_type;
pub use record::{ArgTag, FieldBuilder, FieldDescriptor, Record, RecordShape};
pub use registry::{
    ParserEntry, ParserRegistry, RegistryBuilder, register_arg_parser, try_register_arg_parser,
};
pub use schema::{
    ArgsConfig, ArgumentDescriptor, ObjectTypeDescriptor, OutputField, OutputTypeSet,
    build_args_config, build_output_type, output_value,
};
pub use types::{FieldType, Mismatch, SemanticType, timestamp_scalar};

/// Result type for schema derivation and argument loading.
pub type Result<T> = std::result::Result<T, SugarError>;
