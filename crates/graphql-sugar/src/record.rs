//! Record declarations.
//!
//! A record type declares its fields once through [`Record::describe`]. Each
//! field carries a typed accessor pair plus the tags the builders read:
//!
//! - `.output(name)` - serialization name; includes the field in output types
//! - `.arg("name[,required]")` - argument name and optional required marker
//! - `.description(text)` - human-readable schema description
//!
//! ```ignore
//! impl Record for User {
//!     const TYPE_NAME: &'static str = "User";
//!
//!     fn describe(shape: &mut RecordShape<Self>) {
//!         shape
//!             .field("id", |u| &u.id, |u| &mut u.id)
//!             .output("id")
//!             .arg("id,required")
//!             .description("A short identifier for this user.");
//!     }
//! }
//! ```

use std::any::Any;
use std::fmt;
use std::str::FromStr;

use async_graphql::Value;

use crate::Result;
use crate::error::SugarError;
use crate::types::{FieldType, Mismatch, SemanticType};

/// An application record whose fields can be exposed in a GraphQL schema.
pub trait Record: Default + Send + Sync + 'static {
    /// Object type name used when the record is nested in another record.
    const TYPE_NAME: &'static str;

    /// Object type description used when the record is nested.
    const DESCRIPTION: &'static str = "";

    /// Declares the record's fields.
    fn describe(shape: &mut RecordShape<Self>);
}

/// Exposed view of one declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Name the field is exposed under.
    pub exposed_name: String,
    /// Logical type of the field.
    pub semantic_type: SemanticType,
    /// Whether the argument must be supplied. Always false for output fields.
    pub required: bool,
    /// Description text, empty when none was declared.
    pub description: String,
}

/// Parsed argument tag: `name[,required]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgTag {
    /// Argument name.
    pub name: String,
    /// Whether the `required` marker was present.
    pub required: bool,
}

impl FromStr for ArgTag {
    type Err = String;

    fn from_str(tag: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = tag.split(',').map(str::trim);
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err("argument name is empty".into());
        }

        let mut required = false;
        for option in parts {
            match option {
                "required" => required = true,
                "" => return Err("empty option".into()),
                other => return Err(format!("unknown option `{other}`")),
            }
        }

        Ok(Self {
            name: name.to_string(),
            required,
        })
    }
}

/// Type-erased access to one field of a record.
pub(crate) trait Slot<R>: Send + Sync {
    fn read(&self, record: &R) -> Value;
    fn write_value(&self, record: &mut R, value: &Value) -> std::result::Result<(), Mismatch>;
    /// Returns false if the decoder produced a different Rust type.
    fn write_decoded(&self, record: &mut R, decoded: Box<dyn Any + Send>) -> bool;
}

struct Accessor<R, T> {
    get: fn(&R) -> &T,
    get_mut: fn(&mut R) -> &mut T,
}

impl<R: 'static, T: FieldType> Slot<R> for Accessor<R, T> {
    fn read(&self, record: &R) -> Value {
        (self.get)(record).to_value()
    }

    fn write_value(&self, record: &mut R, value: &Value) -> std::result::Result<(), Mismatch> {
        *(self.get_mut)(record) = T::from_value(value)?;
        Ok(())
    }

    fn write_decoded(&self, record: &mut R, decoded: Box<dyn Any + Send>) -> bool {
        match T::from_decoded(decoded) {
            Some(value) => {
                *(self.get_mut)(record) = value;
                true
            }
            None => false,
        }
    }
}

/// One declared field of a record.
pub struct FieldDef<R> {
    key: &'static str,
    output_name: Option<String>,
    arg_tag: Option<String>,
    required: bool,
    description: Option<String>,
    semantic_type: SemanticType,
    slot: Box<dyn Slot<R>>,
}

impl<R> FieldDef<R> {
    /// Rust-side key the field was declared with.
    #[must_use]
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Serialization name, if the field is exposed in output types.
    #[must_use]
    pub fn output_name(&self) -> Option<&str> {
        self.output_name.as_deref()
    }

    /// Logical type of the field.
    #[must_use]
    pub fn semantic_type(&self) -> &SemanticType {
        &self.semantic_type
    }

    /// Description text, empty when none was declared.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Parses the argument tag.
    ///
    /// Returns `Ok(None)` for fields without an argument tag.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTag` for malformed tags, or when `.required()` was
    /// declared without an argument name.
    pub fn arg_tag(&self) -> Result<Option<ArgTag>> {
        let Some(tag) = &self.arg_tag else {
            if self.required {
                return Err(SugarError::InvalidTag {
                    field: self.key.to_string(),
                    tag: "required".into(),
                    reason: "required marker without an argument name".into(),
                });
            }
            return Ok(None);
        };

        let mut parsed = tag.parse::<ArgTag>().map_err(|reason| SugarError::InvalidTag {
            field: self.key.to_string(),
            tag: tag.clone(),
            reason,
        })?;
        parsed.required |= self.required;
        Ok(Some(parsed))
    }

    pub(crate) fn slot(&self) -> &dyn Slot<R> {
        self.slot.as_ref()
    }

    pub(crate) fn into_slot(self) -> Box<dyn Slot<R>> {
        self.slot
    }
}

impl<R> fmt::Debug for FieldDef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("key", &self.key)
            .field("output_name", &self.output_name)
            .field("arg_tag", &self.arg_tag)
            .field("required", &self.required)
            .field("description", &self.description)
            .field("semantic_type", &self.semantic_type)
            .finish_non_exhaustive()
    }
}

/// Declared shape of a record type: its fields in declaration order.
pub struct RecordShape<R> {
    fields: Vec<FieldDef<R>>,
}

impl<R: Record> RecordShape<R> {
    /// Collects the declared shape of `R`.
    #[must_use]
    pub fn of() -> Self {
        let mut shape = Self { fields: Vec::new() };
        R::describe(&mut shape);
        shape
    }

    /// Declares a field with its typed accessors.
    ///
    /// The field is excluded from output types and arguments until tagged.
    pub fn field<T: FieldType>(
        &mut self,
        key: &'static str,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> FieldBuilder<'_, R> {
        self.fields.push(FieldDef {
            key,
            output_name: None,
            arg_tag: None,
            required: false,
            description: None,
            semantic_type: T::semantic_type(),
            slot: Box::new(Accessor { get, get_mut }),
        });
        let idx = self.fields.len() - 1;
        FieldBuilder {
            def: &mut self.fields[idx],
        }
    }

    /// Declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef<R>] {
        &self.fields
    }

    /// Descriptors for fields carrying a serialization name.
    #[must_use]
    pub fn output_fields(&self) -> Vec<FieldDescriptor> {
        self.fields
            .iter()
            .filter_map(|field| {
                let name = field.output_name()?;
                Some(FieldDescriptor {
                    exposed_name: name.to_string(),
                    semantic_type: field.semantic_type.clone(),
                    required: false,
                    description: field.description().to_string(),
                })
            })
            .collect()
    }

    /// Descriptors for fields carrying an argument tag.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTag` if any argument tag is malformed.
    pub fn argument_fields(&self) -> Result<Vec<FieldDescriptor>> {
        let mut out = Vec::new();
        for field in &self.fields {
            if let Some(tag) = field.arg_tag()? {
                out.push(FieldDescriptor {
                    exposed_name: tag.name,
                    semantic_type: field.semantic_type.clone(),
                    required: tag.required,
                    description: field.description().to_string(),
                });
            }
        }
        Ok(out)
    }

    pub(crate) fn into_fields(self) -> Vec<FieldDef<R>> {
        self.fields
    }
}

impl<R> fmt::Debug for RecordShape<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.fields).finish()
    }
}

/// Tags the most recently declared field.
pub struct FieldBuilder<'a, R> {
    def: &'a mut FieldDef<R>,
}

impl<R> FieldBuilder<'_, R> {
    /// Sets the serialization name, exposing the field in output types.
    pub fn output(self, name: impl Into<String>) -> Self {
        self.def.output_name = Some(name.into());
        self
    }

    /// Sets the argument tag (`name[,required]`), exposing the field as an
    /// argument.
    pub fn arg(self, tag: impl Into<String>) -> Self {
        self.def.arg_tag = Some(tag.into());
        self
    }

    /// Marks the argument as required.
    pub fn required(self) -> Self {
        self.def.required = true;
        self
    }

    /// Sets the description shown in schema metadata.
    pub fn description(self, text: impl Into<String>) -> Self {
        self.def.description = Some(text.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Account {
        id: String,
        balance: i64,
        internal_note: String,
    }

    impl Record for Account {
        const TYPE_NAME: &'static str = "Account";

        fn describe(shape: &mut RecordShape<Self>) {
            shape
                .field("id", |a| &a.id, |a| &mut a.id)
                .output("id")
                .arg("id,required")
                .description("Account identifier.");
            shape
                .field("balance", |a| &a.balance, |a| &mut a.balance)
                .output("balance");
            shape.field("internal_note", |a| &a.internal_note, |a| &mut a.internal_note);
        }
    }

    #[test]
    fn test_parse_arg_tag() {
        assert_eq!(
            "id,required".parse::<ArgTag>(),
            Ok(ArgTag {
                name: "id".into(),
                required: true
            })
        );
        assert_eq!(
            "numberOfChildren".parse::<ArgTag>(),
            Ok(ArgTag {
                name: "numberOfChildren".into(),
                required: false
            })
        );
        assert_eq!(
            " name , required ".parse::<ArgTag>(),
            Ok(ArgTag {
                name: "name".into(),
                required: true
            })
        );
    }

    #[test]
    fn test_parse_invalid_arg_tag() {
        assert!("".parse::<ArgTag>().is_err());
        assert!(",required".parse::<ArgTag>().is_err());
        assert_eq!(
            "id,optional".parse::<ArgTag>(),
            Err("unknown option `optional`".to_string())
        );
        assert!("id,".parse::<ArgTag>().is_err());
    }

    #[test]
    fn test_shape_preserves_declaration_order() {
        let shape = RecordShape::<Account>::of();
        let keys: Vec<_> = shape.fields().iter().map(FieldDef::key).collect();
        assert_eq!(keys, ["id", "balance", "internal_note"]);
    }

    #[test]
    fn test_output_fields() {
        let shape = RecordShape::<Account>::of();
        let fields = shape.output_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].exposed_name, "id");
        assert_eq!(fields[0].description, "Account identifier.");
        assert_eq!(fields[1].exposed_name, "balance");
        assert_eq!(fields[1].semantic_type, SemanticType::Int);
        assert_eq!(fields[1].description, "");
    }

    #[test]
    fn test_argument_fields() {
        let shape = RecordShape::<Account>::of();
        let fields = shape.argument_fields().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].exposed_name, "id");
        assert!(fields[0].required);
    }

    #[test]
    fn test_required_builder_call() {
        #[derive(Debug, Default)]
        struct Flagged {
            code: String,
        }

        impl Record for Flagged {
            const TYPE_NAME: &'static str = "Flagged";

            fn describe(shape: &mut RecordShape<Self>) {
                shape
                    .field("code", |f| &f.code, |f| &mut f.code)
                    .arg("code")
                    .required();
            }
        }

        let fields = RecordShape::<Flagged>::of().argument_fields().unwrap();
        assert!(fields[0].required);
    }

    #[test]
    fn test_required_without_arg_name() {
        #[derive(Debug, Default)]
        struct Broken {
            code: String,
        }

        impl Record for Broken {
            const TYPE_NAME: &'static str = "Broken";

            fn describe(shape: &mut RecordShape<Self>) {
                shape.field("code", |b| &b.code, |b| &mut b.code).required();
            }
        }

        let err = RecordShape::<Broken>::of().argument_fields().unwrap_err();
        assert!(matches!(err, SugarError::InvalidTag { ref field, .. } if field == "code"));
    }

    #[test]
    fn test_slot_access() {
        let shape = RecordShape::<Account>::of();
        let mut account = Account::default();

        let balance = shape.fields()[1].slot();
        balance.write_value(&mut account, &Value::from(42)).unwrap();
        assert_eq!(account.balance, 42);
        assert_eq!(balance.read(&account), Value::from(42));

        let err = balance
            .write_value(&mut account, &Value::from("lots"))
            .unwrap_err();
        assert_eq!(err.actual, "string");
        assert_eq!(account.balance, 42);
    }
}
