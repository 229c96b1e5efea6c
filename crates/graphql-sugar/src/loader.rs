//! Rebuilds typed records from raw resolver arguments.

use std::collections::HashMap;

use async_graphql::dynamic::ObjectAccessor;
use async_graphql::{Name, Value};
use tracing::trace;

use crate::Result;
use crate::error::SugarError;
use crate::record::Record;
use crate::schema::ArgsConfig;

/// Raw argument values as handed to a resolver.
pub trait RawArgs {
    /// Value supplied for the named argument.
    fn get_arg(&self, name: &str) -> Option<&Value>;

    /// All supplied arguments.
    fn arg_entries(&self) -> Vec<(&str, &Value)>;
}

impl RawArgs for async_graphql::indexmap::IndexMap<Name, Value> {
    fn get_arg(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }

    fn arg_entries(&self) -> Vec<(&str, &Value)> {
        self.iter().map(|(name, value)| (name.as_str(), value)).collect()
    }
}

impl RawArgs for HashMap<String, Value> {
    fn get_arg(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }

    fn arg_entries(&self) -> Vec<(&str, &Value)> {
        self.iter().map(|(name, value)| (name.as_str(), value)).collect()
    }
}

impl RawArgs for ObjectAccessor<'_> {
    fn get_arg(&self, name: &str) -> Option<&Value> {
        self.as_index_map().get(name)
    }

    fn arg_entries(&self) -> Vec<(&str, &Value)> {
        self.as_index_map().arg_entries()
    }
}

/// Builds a record of type `R` from raw argument values.
///
/// Required arguments are checked before anything is decoded. Arguments are
/// then decoded in declaration order, so the first failing argument is the
/// same whatever order `raw` yields its entries in. Arguments not described
/// by `config` are ignored. Fields without a supplied argument, or with an
/// explicit null, keep their default value.
///
/// # Errors
///
/// - `MissingRequiredArgument` if a required argument is absent or null
/// - `TypeMismatch` if a natively coerced value has the wrong shape
/// - `Parse` if a registered decoder rejects its value
pub fn load_args<R: Record>(config: &ArgsConfig<R>, raw: &impl RawArgs) -> Result<R> {
    for (name, binding) in config.bindings() {
        if binding.descriptor().required && matches!(raw.get_arg(name), None | Some(Value::Null))
        {
            return Err(SugarError::missing_argument(name));
        }
    }

    for (name, _) in raw.arg_entries() {
        if config.binding(name).is_none() {
            trace!(type_name = R::TYPE_NAME, argument = name, "Ignoring unknown argument");
        }
    }

    let mut record = R::default();
    for (name, binding) in config.bindings() {
        match raw.get_arg(name) {
            // Explicit null on an optional argument keeps the default.
            None | Some(Value::Null) => {}
            Some(value) => binding.assign(name, &mut record, value)?,
        }
    }

    Ok(record)
}
