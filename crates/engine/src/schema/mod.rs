mod abstract_type;
mod scalars;
mod ty;

use std::{fmt, sync::Arc};

use async_graphql_parser::types::OperationType;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

pub use abstract_type::{AbstractType, TypeResolver};
pub use scalars::{BooleanScalar, FloatScalar, IdScalar, IntScalar, ScalarSerializer, SerializeError, StringScalar};
pub use ty::{Type, TypeParseError};

use crate::resolver::{Resolved, Resolver, ResolverContext, ResolverResult};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Type `{0}` is defined more than once")]
    DuplicateType(String),
    #[error("Names starting with `__` are reserved, found `{0}`")]
    ReservedName(String),
    #[error("Unknown type `{name}` referenced by `{referenced_by}`")]
    UnknownType { name: String, referenced_by: String },
    #[error("`{ty}` is not an input type and cannot be used by argument `{referenced_by}`")]
    NotAnInputType { ty: String, referenced_by: String },
    #[error("Object type `{0}` must define at least one field")]
    EmptyObject(String),
    #[error("Union `{0}` must have at least one member")]
    EmptyUnion(String),
    #[error("`{name}` is not an interface and cannot be implemented by `{object}`")]
    NotAnInterface { name: String, object: String },
    #[error("`{object}` implements `{interface}` but doesn't define its field `{field}`")]
    MissingInterfaceField {
        object: String,
        interface: String,
        field: String,
    },
    #[error("Union `{union}` member `{name}` is not an object type")]
    NotAnObject { name: String, union: String },
}

/// Read-only type system shared by every operation executed against it.
pub struct Schema {
    types: IndexMap<Box<str>, TypeDefinition>,
    query: Box<str>,
    mutation: Option<Box<str>>,
    subscription: Option<Box<str>>,
}

pub enum TypeDefinition {
    Scalar(ScalarType),
    Enum(EnumType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Scalar(ty) => &ty.name,
            TypeDefinition::Enum(ty) => &ty.name,
            TypeDefinition::Object(ty) => &ty.name,
            TypeDefinition::Interface(ty) => &ty.name,
            TypeDefinition::Union(ty) => &ty.name,
        }
    }

    fn is_input_type(&self) -> bool {
        matches!(self, TypeDefinition::Scalar(_) | TypeDefinition::Enum(_))
    }
}

impl Schema {
    pub fn build(query: ObjectType) -> SchemaBuilder {
        SchemaBuilder {
            query: query.name.clone(),
            mutation: None,
            subscription: None,
            definitions: vec![TypeDefinition::Object(query)],
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        match self.types.get(name)? {
            TypeDefinition::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn query_type(&self) -> Option<&ObjectType> {
        self.object(&self.query)
    }

    pub fn mutation_type(&self) -> Option<&ObjectType> {
        self.object(self.mutation.as_deref()?)
    }

    pub fn subscription_type(&self) -> Option<&ObjectType> {
        self.object(self.subscription.as_deref()?)
    }

    pub fn root_type(&self, operation_type: OperationType) -> Option<&ObjectType> {
        match operation_type {
            OperationType::Query => self.query_type(),
            OperationType::Mutation => self.mutation_type(),
            OperationType::Subscription => self.subscription_type(),
        }
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("query", &self.query)
            .field("mutation", &self.mutation)
            .field("subscription", &self.subscription)
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub struct SchemaBuilder {
    query: Box<str>,
    mutation: Option<Box<str>>,
    subscription: Option<Box<str>>,
    definitions: Vec<TypeDefinition>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn mutation(mut self, object: ObjectType) -> Self {
        self.mutation = Some(object.name.clone());
        self.object(object)
    }

    #[must_use]
    pub fn subscription(mut self, object: ObjectType) -> Self {
        self.subscription = Some(object.name.clone());
        self.object(object)
    }

    #[must_use]
    pub fn object(mut self, object: ObjectType) -> Self {
        self.definitions.push(TypeDefinition::Object(object));
        self
    }

    #[must_use]
    pub fn interface(mut self, interface: InterfaceType) -> Self {
        self.definitions.push(TypeDefinition::Interface(interface));
        self
    }

    #[must_use]
    pub fn union(mut self, union: UnionType) -> Self {
        self.definitions.push(TypeDefinition::Union(union));
        self
    }

    #[must_use]
    pub fn scalar(mut self, scalar: ScalarType) -> Self {
        self.definitions.push(TypeDefinition::Scalar(scalar));
        self
    }

    #[must_use]
    pub fn enum_type(mut self, enum_type: EnumType) -> Self {
        self.definitions.push(TypeDefinition::Enum(enum_type));
        self
    }

    pub fn finish(self) -> Result<Schema, SchemaError> {
        let SchemaBuilder {
            query,
            mutation,
            subscription,
            definitions,
        } = self;

        let builtins = [
            ScalarType::new("Int", IntScalar),
            ScalarType::new("Float", FloatScalar),
            ScalarType::new("String", StringScalar),
            ScalarType::new("Boolean", BooleanScalar),
            ScalarType::new("ID", IdScalar),
        ];

        let mut types = IndexMap::with_capacity(builtins.len() + definitions.len());
        for definition in builtins
            .into_iter()
            .map(TypeDefinition::Scalar)
            .chain(definitions)
        {
            let name: Box<str> = definition.name().into();
            if name.starts_with("__") {
                return Err(SchemaError::ReservedName(name.into()));
            }
            if types.insert(name.clone(), definition).is_some() {
                return Err(SchemaError::DuplicateType(name.into()));
            }
        }

        let mut schema = Schema {
            types,
            query,
            mutation,
            subscription,
        };
        schema.validate()?;
        schema.compute_possible_types();
        Ok(schema)
    }
}

impl Schema {
    fn validate(&self) -> Result<(), SchemaError> {
        for definition in self.types.values() {
            match definition {
                TypeDefinition::Object(object) => {
                    if object.fields.is_empty() {
                        return Err(SchemaError::EmptyObject(object.name.to_string()));
                    }
                    self.validate_fields(&object.name, object.fields.values())?;
                    for interface_name in &object.interfaces {
                        let Some(TypeDefinition::Interface(interface)) = self.get(interface_name) else {
                            return Err(SchemaError::NotAnInterface {
                                name: interface_name.to_string(),
                                object: object.name.to_string(),
                            });
                        };
                        if let Some(missing) = interface.fields.keys().find(|name| !object.fields.contains_key(*name)) {
                            return Err(SchemaError::MissingInterfaceField {
                                object: object.name.to_string(),
                                interface: interface.name.to_string(),
                                field: missing.to_string(),
                            });
                        }
                    }
                }
                TypeDefinition::Interface(interface) => {
                    self.validate_fields(&interface.name, interface.fields.values())?;
                }
                TypeDefinition::Union(union) => {
                    if union.members.is_empty() {
                        return Err(SchemaError::EmptyUnion(union.name.to_string()));
                    }
                    for member in &union.members {
                        match self.get(member) {
                            Some(TypeDefinition::Object(_)) => {}
                            Some(_) => {
                                return Err(SchemaError::NotAnObject {
                                    name: member.to_string(),
                                    union: union.name.to_string(),
                                })
                            }
                            None => {
                                return Err(SchemaError::UnknownType {
                                    name: member.to_string(),
                                    referenced_by: union.name.to_string(),
                                })
                            }
                        }
                    }
                }
                TypeDefinition::Scalar(_) | TypeDefinition::Enum(_) => {}
            }
        }

        for root in [Some(&self.query), self.mutation.as_ref(), self.subscription.as_ref()]
            .into_iter()
            .flatten()
        {
            if self.object(root).is_none() {
                return Err(SchemaError::UnknownType {
                    name: root.to_string(),
                    referenced_by: "schema".into(),
                });
            }
        }

        Ok(())
    }

    fn validate_fields<'a>(
        &self,
        parent: &str,
        fields: impl Iterator<Item = &'a FieldDefinition>,
    ) -> Result<(), SchemaError> {
        for field in fields {
            let referenced_by = format!("{parent}.{}", field.name);
            if self.get(field.ty.type_name()).is_none() {
                return Err(SchemaError::UnknownType {
                    name: field.ty.type_name().to_string(),
                    referenced_by,
                });
            }
            for argument in field.arguments.values() {
                let referenced_by = format!("{referenced_by}({}:)", argument.name);
                match self.get(argument.ty.type_name()) {
                    Some(definition) if definition.is_input_type() => {}
                    Some(_) => {
                        return Err(SchemaError::NotAnInputType {
                            ty: argument.ty.to_string(),
                            referenced_by,
                        })
                    }
                    None => {
                        return Err(SchemaError::UnknownType {
                            name: argument.ty.type_name().to_string(),
                            referenced_by,
                        })
                    }
                }
            }
        }
        Ok(())
    }

    fn compute_possible_types(&mut self) {
        let implementations = self
            .types
            .values()
            .filter_map(|definition| match definition {
                TypeDefinition::Object(object) => Some(object),
                _ => None,
            })
            .flat_map(|object| {
                object
                    .interfaces
                    .iter()
                    .map(|interface| (interface.clone(), object.name.clone()))
            })
            .collect::<Vec<_>>();

        for (interface, object) in implementations {
            if let Some(TypeDefinition::Interface(interface)) = self.types.get_mut(&interface) {
                interface.possible_types.push(object);
            }
        }
    }
}

pub struct ObjectType {
    pub(crate) name: Box<str>,
    pub(crate) interfaces: Vec<Box<str>>,
    pub(crate) fields: IndexMap<Box<str>, FieldDefinition>,
}

impl ObjectType {
    pub fn new(name: impl Into<Box<str>>) -> Self {
        ObjectType {
            name: name.into(),
            interfaces: Vec::new(),
            fields: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn implements(mut self, interface: impl Into<Box<str>>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_definition(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    pub fn implements_interface(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|name| name.as_ref() == interface)
    }
}

pub struct FieldDefinition {
    pub(crate) name: Box<str>,
    pub(crate) ty: Type,
    pub(crate) arguments: IndexMap<Box<str>, ArgumentDefinition>,
    pub(crate) resolver: Option<Resolver>,
}

impl FieldDefinition {
    /// `ty` is a type reference such as `"[User!]!"`.
    pub fn new(name: impl Into<Box<str>>, ty: impl Into<Type>) -> Self {
        FieldDefinition {
            name: name.into(),
            ty: ty.into(),
            arguments: IndexMap::new(),
            resolver: None,
        }
    }

    #[must_use]
    pub fn argument(mut self, argument: ArgumentDefinition) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }

    /// Without a resolver the field reads the property of the same name on its parent value.
    #[must_use]
    pub fn resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(ResolverContext<'_>) -> ResolverResult<Resolved> + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn argument_definition(&self, name: &str) -> Option<&ArgumentDefinition> {
        self.arguments.get(name)
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("arguments", &self.arguments)
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ArgumentDefinition {
    pub(crate) name: Box<str>,
    pub(crate) ty: Type,
    pub(crate) default_value: Option<Value>,
}

impl ArgumentDefinition {
    pub fn new(name: impl Into<Box<str>>, ty: impl Into<Type>) -> Self {
        ArgumentDefinition {
            name: name.into(),
            ty: ty.into(),
            default_value: None,
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

pub struct InterfaceType {
    pub(crate) name: Box<str>,
    pub(crate) fields: IndexMap<Box<str>, FieldDefinition>,
    pub(crate) possible_types: Vec<Box<str>>,
    pub(crate) type_resolver: Option<TypeResolver>,
}

impl InterfaceType {
    pub fn new(name: impl Into<Box<str>>) -> Self {
        InterfaceType {
            name: name.into(),
            fields: IndexMap::new(),
            possible_types: Vec::new(),
            type_resolver: None,
        }
    }

    /// Fields every implementation must define.
    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    #[must_use]
    pub fn resolve_type<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.type_resolver = Some(Arc::new(resolver));
        self
    }
}

pub struct UnionType {
    pub(crate) name: Box<str>,
    pub(crate) members: Vec<Box<str>>,
    pub(crate) type_resolver: Option<TypeResolver>,
}

impl UnionType {
    pub fn new(name: impl Into<Box<str>>) -> Self {
        UnionType {
            name: name.into(),
            members: Vec::new(),
            type_resolver: None,
        }
    }

    #[must_use]
    pub fn member(mut self, object: impl Into<Box<str>>) -> Self {
        self.members.push(object.into());
        self
    }

    #[must_use]
    pub fn resolve_type<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.type_resolver = Some(Arc::new(resolver));
        self
    }
}

pub struct ScalarType {
    pub(crate) name: Box<str>,
    serializer: Arc<dyn ScalarSerializer>,
}

impl ScalarType {
    pub fn new(name: impl Into<Box<str>>, serializer: impl ScalarSerializer + 'static) -> Self {
        ScalarType {
            name: name.into(),
            serializer: Arc::new(serializer),
        }
    }

    pub fn serialize(&self, value: Value) -> Result<Value, SerializeError> {
        self.serializer.serialize(value)
    }
}

pub struct EnumType {
    pub(crate) name: Box<str>,
    values: IndexSet<Box<str>>,
}

impl EnumType {
    pub fn new<V: Into<Box<str>>>(name: impl Into<Box<str>>, values: impl IntoIterator<Item = V>) -> Self {
        EnumType {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Only declared values can be serialized.
    pub fn serialize(&self, value: Value) -> Result<Value, SerializeError> {
        match value {
            Value::String(s) if self.values.contains(s.as_str()) => Ok(Value::String(s)),
            other => Err(SerializeError::invalid_value(format!(
                "Enum `{}` cannot represent value: {other}",
                self.name
            ))),
        }
    }
}
