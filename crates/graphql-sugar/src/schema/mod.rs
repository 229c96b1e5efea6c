//! Schema descriptors derived from record declarations.
//!
//! ## Components
//!
//! - [`build_output_type`] / [`OutputTypeSet`] - object types for read paths
//! - [`build_args_config`] / [`ArgsConfig`] - arguments for mutation fields
//!
//! Both builders resolve field types through the native mapping first and the
//! parser registry second. Neither caches anything: every call recomputes the
//! descriptor from the record's declared shape.

mod args;
pub(crate) mod output;

pub use args::{ArgsConfig, ArgumentDescriptor, build_args_config};
pub use output::{
    ObjectTypeDescriptor, OutputField, OutputTypeSet, build_output_type, into_field_value,
    output_value,
};
