//! Output-type derivation.
//!
//! Builds named object-type descriptors from a record's output-tagged fields
//! and turns them into dynamic schema objects whose resolvers read from the
//! parent value.

use std::collections::{HashSet, VecDeque};

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, Object, ResolverContext, SchemaBuilder, TypeRef,
};
use async_graphql::{Name, Value};
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::Result;
use crate::error::SugarError;
use crate::mapper::resolve_output_type;
use crate::record::{Record, RecordShape};
use crate::registry::ParserRegistry;
use crate::types::RecordKey;

/// One field of an output object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputField {
    /// Schema type of the field.
    pub type_ref: TypeRef,
    /// Description, empty when none was declared.
    pub description: String,
}

/// Named object-type descriptor for read paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTypeDescriptor {
    /// Object type name.
    pub name: String,
    /// Object type description, empty when none was given.
    pub description: String,
    /// Fields keyed by exposed name, in declaration order.
    pub fields: IndexMap<String, OutputField>,
    references: Vec<RecordKey>,
}

impl ObjectTypeDescriptor {
    /// Nested record types referenced by this type's fields.
    #[must_use]
    pub fn references(&self) -> &[RecordKey] {
        &self.references
    }

    /// Exposed field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Converts the descriptor into a dynamic schema object.
    ///
    /// Each field resolves by looking up its exposed name in the parent
    /// value, as produced by [`output_value`].
    #[must_use]
    pub fn into_object(self) -> Object {
        let mut object = Object::new(&self.name);
        if !self.description.is_empty() {
            object = object.description(&self.description);
        }

        for (name, field) in self.fields {
            let key = name.clone();
            let mut gql_field = Field::new(name, field.type_ref, move |ctx| {
                let key = key.clone();
                FieldFuture::new(async move { Ok(parent_field(&ctx, &key)) })
            });
            if !field.description.is_empty() {
                gql_field = gql_field.description(field.description);
            }
            object = object.field(gql_field);
        }

        object
    }
}

/// Reads a field from the parent object value.
fn parent_field<'a>(ctx: &ResolverContext<'a>, key: &str) -> Option<FieldValue<'a>> {
    if let Some(Value::Object(obj)) = ctx.parent_value.as_value()
        && let Some(value) = obj.get(key)
    {
        return Some(into_field_value(value.clone()));
    }
    None
}

/// Wraps an engine value for the dynamic resolver, expanding lists so nested
/// objects inside them resolve through their own fields.
#[must_use]
pub fn into_field_value<'a>(value: Value) -> FieldValue<'a> {
    match value {
        Value::List(items) => FieldValue::list(items.into_iter().map(into_field_value)),
        other => FieldValue::value(other),
    }
}

/// Builds the output type of `R` under the given name.
///
/// Fields without a serialization name are excluded.
///
/// # Errors
///
/// Returns `UnregisteredType` if a field type has neither a native mapping
/// nor a registered parser, and `DuplicateField` if two fields share an
/// exposed name.
pub fn build_output_type<R: Record>(
    name: impl Into<String>,
    description: impl Into<String>,
    registry: &ParserRegistry,
) -> Result<ObjectTypeDescriptor> {
    let name = name.into();
    let shape = RecordShape::<R>::of();

    let mut fields = IndexMap::new();
    let mut references = Vec::new();
    for field in shape.output_fields() {
        let type_ref = resolve_output_type(&field.semantic_type, registry)?;
        trace!(
            type_name = %name,
            field = %field.exposed_name,
            schema_type = %type_ref,
            "Mapped output field"
        );

        if let Some(key) = field.semantic_type.record_key()
            && !references.contains(&key)
        {
            references.push(key);
        }

        let output = OutputField {
            type_ref,
            description: field.description,
        };
        if fields.insert(field.exposed_name.clone(), output).is_some() {
            return Err(SugarError::DuplicateField {
                type_name: name,
                name: field.exposed_name,
            });
        }
    }

    debug!(type_name = %name, fields = fields.len(), "Built output type");

    Ok(ObjectTypeDescriptor {
        name,
        description: description.into(),
        fields,
        references,
    })
}

/// Builds the output type of `R` under its declared type name.
pub(crate) fn build_record_output_type<R: Record>(
    registry: &ParserRegistry,
) -> Result<ObjectTypeDescriptor> {
    build_output_type::<R>(R::TYPE_NAME, R::DESCRIPTION, registry)
}

/// Serializes a record into the value shape read by output resolvers: an
/// object keyed by exposed names.
#[must_use]
pub fn output_value<R: Record>(record: &R) -> Value {
    let shape = RecordShape::<R>::of();
    let mut map = async_graphql::indexmap::IndexMap::new();
    for field in shape.fields() {
        if let Some(name) = field.output_name() {
            map.insert(Name::new(name), field.slot().read(record));
        }
    }
    Value::Object(map)
}

/// Collects an output type together with every record type it references.
///
/// Referenced records are generated once each under their declared type
/// name, so cycles between records terminate.
#[derive(Debug)]
pub struct OutputTypeSet<'r> {
    registry: &'r ParserRegistry,
    generated: HashSet<RecordKey>,
    pending: VecDeque<RecordKey>,
    objects: IndexMap<String, ObjectTypeDescriptor>,
}

impl<'r> OutputTypeSet<'r> {
    /// Creates an empty set resolving types against `registry`.
    #[must_use]
    pub fn new(registry: &'r ParserRegistry) -> Self {
        Self {
            registry,
            generated: HashSet::new(),
            pending: VecDeque::new(),
            objects: IndexMap::new(),
        }
    }

    /// Adds the output type of `R` under the given name.
    ///
    /// # Errors
    ///
    /// Fails like [`build_output_type`], or with `DuplicateType` if a
    /// different type with the same name was already added.
    pub fn add<R: Record>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<&mut Self> {
        let name = name.into();
        if name == R::TYPE_NAME {
            self.generated.insert(RecordKey::of::<R>());
        }
        let descriptor = build_output_type::<R>(name, description, self.registry)?;
        self.insert(descriptor)?;
        Ok(self)
    }

    /// Adds a prebuilt descriptor.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateType` if a different type with the same name was
    /// already added.
    pub fn insert(&mut self, descriptor: ObjectTypeDescriptor) -> Result<&mut Self> {
        for key in descriptor.references() {
            if !self.generated.contains(key) && !self.pending.contains(key) {
                self.pending.push_back(*key);
            }
        }

        match self.objects.get(&descriptor.name) {
            Some(existing) if *existing == descriptor => {}
            Some(_) => {
                return Err(SugarError::DuplicateType {
                    name: descriptor.name,
                });
            }
            None => {
                self.objects.insert(descriptor.name.clone(), descriptor);
            }
        }
        Ok(self)
    }

    /// Generates all pending referenced records and returns every collected
    /// type in insertion order.
    ///
    /// # Errors
    ///
    /// Fails like [`build_output_type`] for any referenced record.
    pub fn finish(mut self) -> Result<Vec<ObjectTypeDescriptor>> {
        while let Some(key) = self.pending.pop_front() {
            if !self.generated.insert(key) {
                continue;
            }
            trace!(type_name = key.name(), "Generating referenced record type");
            let descriptor = key.build_output_type(self.registry)?;
            self.insert(descriptor)?;
        }

        debug!(count = self.objects.len(), "Output type collection complete");
        Ok(self.objects.into_values().collect())
    }

    /// Registers every collected type into a dynamic schema builder.
    ///
    /// # Errors
    ///
    /// Fails like [`OutputTypeSet::finish`].
    pub fn register(self, mut builder: SchemaBuilder) -> Result<SchemaBuilder> {
        for descriptor in self.finish()? {
            builder = builder.register(descriptor.into_object());
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Address {
        city: String,
        zip: String,
    }

    impl Record for Address {
        const TYPE_NAME: &'static str = "Address";
        const DESCRIPTION: &'static str = "A postal address";

        fn describe(shape: &mut RecordShape<Self>) {
            shape.field("city", |a| &a.city, |a| &mut a.city).output("city");
            shape.field("zip", |a| &a.zip, |a| &mut a.zip).output("zip");
        }
    }

    crate::record_field_type!(Address);

    #[derive(Debug, Default)]
    struct Customer {
        id: String,
        visits: i32,
        addresses: Vec<Address>,
        secret: String,
    }

    impl Record for Customer {
        const TYPE_NAME: &'static str = "Customer";

        fn describe(shape: &mut RecordShape<Self>) {
            shape
                .field("id", |c| &c.id, |c| &mut c.id)
                .output("id")
                .arg("id,required")
                .description("Customer identifier.");
            shape.field("visits", |c| &c.visits, |c| &mut c.visits).output("visits");
            shape
                .field("addresses", |c| &c.addresses, |c| &mut c.addresses)
                .output("addresses");
            shape
                .field("secret", |c| &c.secret, |c| &mut c.secret)
                .arg("secret");
        }
    }

    #[derive(Debug, Default)]
    struct Node {
        label: String,
        children: Vec<Node>,
    }

    impl Record for Node {
        const TYPE_NAME: &'static str = "Node";

        fn describe(shape: &mut RecordShape<Self>) {
            shape.field("label", |n| &n.label, |n| &mut n.label).output("label");
            shape
                .field("children", |n| &n.children, |n| &mut n.children)
                .output("children");
        }
    }

    crate::record_field_type!(Node);

    #[test]
    fn test_build_output_type() {
        let registry = ParserRegistry::default();
        let descriptor =
            build_output_type::<Customer>("Customer", "A customer", &registry).unwrap();

        assert_eq!(descriptor.name, "Customer");
        assert_eq!(descriptor.description, "A customer");
        let names: Vec<_> = descriptor.field_names().collect();
        assert_eq!(names, ["id", "visits", "addresses"]);
        assert_eq!(
            descriptor.fields["id"],
            OutputField {
                type_ref: TypeRef::named(TypeRef::STRING),
                description: "Customer identifier.".into(),
            }
        );
        assert_eq!(
            descriptor.fields["addresses"].type_ref,
            TypeRef::named_list("Address")
        );
        assert_eq!(descriptor.references(), [Address::semantic_type().record_key().unwrap()]);
    }

    #[test]
    fn test_untagged_fields_are_excluded() {
        let registry = ParserRegistry::default();
        let descriptor = build_output_type::<Customer>("Customer", "", &registry).unwrap();
        assert!(!descriptor.fields.contains_key("secret"));
    }

    #[test]
    fn test_output_type_is_deterministic() {
        let registry = ParserRegistry::default();
        let first = build_output_type::<Customer>("Customer", "", &registry).unwrap();
        let second = build_output_type::<Customer>("Customer", "", &registry).unwrap();
        assert_eq!(first, second);
        assert!(first.field_names().eq(second.field_names()));
    }

    #[test]
    fn test_duplicate_output_names() {
        #[derive(Debug, Default)]
        struct Clash {
            a: String,
            b: String,
        }

        impl Record for Clash {
            const TYPE_NAME: &'static str = "Clash";

            fn describe(shape: &mut RecordShape<Self>) {
                shape.field("a", |c| &c.a, |c| &mut c.a).output("value");
                shape.field("b", |c| &c.b, |c| &mut c.b).output("value");
            }
        }

        let err = build_output_type::<Clash>("Clash", "", &ParserRegistry::default()).unwrap_err();
        assert!(matches!(err, SugarError::DuplicateField { ref name, .. } if name == "value"));
    }

    #[test]
    fn test_output_value() {
        let customer = Customer {
            id: "c1".into(),
            visits: 3,
            addresses: vec![Address {
                city: "Springfield".into(),
                zip: "49007".into(),
            }],
            secret: "hidden".into(),
        };

        let value = output_value(&customer);
        let Value::Object(map) = value else {
            panic!("expected an object");
        };
        assert_eq!(map.get("id"), Some(&Value::from("c1")));
        assert_eq!(map.get("visits"), Some(&Value::from(3)));
        assert!(map.get("secret").is_none());

        let Some(Value::List(addresses)) = map.get("addresses") else {
            panic!("expected a list of addresses");
        };
        let Value::Object(address) = &addresses[0] else {
            panic!("expected an address object");
        };
        assert_eq!(address.get("city"), Some(&Value::from("Springfield")));
    }

    #[test]
    fn test_output_type_set_collects_references() {
        let registry = ParserRegistry::default();
        let mut set = OutputTypeSet::new(&registry);
        set.add::<Customer>("Customer", "").unwrap();
        let types = set.finish().unwrap();

        let names: Vec<_> = types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Customer", "Address"]);
        assert_eq!(types[1].description, "A postal address");
    }

    #[test]
    fn test_output_type_set_handles_cycles() {
        let registry = ParserRegistry::default();
        let mut set = OutputTypeSet::new(&registry);
        set.add::<Node>("Node", "").unwrap();
        let types = set.finish().unwrap();

        assert_eq!(types.len(), 1);
        assert_eq!(types[0].fields["children"].type_ref, TypeRef::named_list("Node"));
    }

    #[test]
    fn test_output_type_set_rejects_name_collision() {
        let registry = ParserRegistry::default();
        let mut set = OutputTypeSet::new(&registry);
        set.add::<Customer>("Customer", "").unwrap();

        // Same record under the same name is accepted again.
        set.add::<Customer>("Customer", "").unwrap();

        let err = set.add::<Address>("Customer", "").unwrap_err();
        assert!(matches!(err, SugarError::DuplicateType { ref name } if name == "Customer"));
        assert_eq!(err.error_code(), "DUPLICATE_TYPE");
    }

    #[test]
    fn test_list_of_custom_type_needs_own_registration() {
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
        struct Badge(String);

        crate::custom_field_type!(Badge);

        #[derive(Debug, Default)]
        struct Member {
            badges: Vec<Badge>,
        }

        impl Record for Member {
            const TYPE_NAME: &'static str = "Member";

            fn describe(shape: &mut RecordShape<Self>) {
                shape
                    .field("badges", |m| &m.badges, |m| &mut m.badges)
                    .output("badges");
            }
        }

        let mut builder = ParserRegistry::builder();
        builder
            .register(
                |value: &Value| match value {
                    Value::String(s) => Ok(Badge(s.clone())),
                    other => Err(crate::BoxError::from(other.to_string())),
                },
                TypeRef::named(TypeRef::STRING),
            )
            .unwrap();
        let registry = builder.freeze();

        let err = build_output_type::<Member>("Member", "", &registry).unwrap_err();
        assert!(matches!(err, SugarError::UnregisteredType { .. }));
    }

    #[test]
    fn test_into_object() {
        let registry = ParserRegistry::default();
        let object = build_output_type::<Customer>("Customer", "", &registry)
            .unwrap()
            .into_object();
        assert_eq!(object.type_name(), "Customer");
    }
}
