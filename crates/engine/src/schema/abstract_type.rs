use std::sync::Arc;

use serde_json::Value;

use super::{InterfaceType, ObjectType, Schema, UnionType};

/// Maps a resolved value to the name of its concrete object type.
pub type TypeResolver = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Interfaces and unions, the types whose values must be resolved to a concrete object type
/// before their selection set can be collected.
pub trait AbstractType {
    fn name(&self) -> &str;

    fn possible_types(&self) -> &[Box<str>];

    fn type_resolver(&self) -> Option<&TypeResolver>;

    fn is_possible_type(&self, object_type: &str) -> bool {
        self.possible_types().iter().any(|name| name.as_ref() == object_type)
    }

    /// Uses the custom type resolver if any, falling back to the `__typename` property of the
    /// value otherwise. `None` when no possible type matches.
    fn resolve_type<'s>(&self, schema: &'s Schema, value: &Value) -> Option<&'s ObjectType> {
        let name = match self.type_resolver() {
            Some(resolver) => resolver(value)?,
            None => value.get("__typename")?.as_str()?.to_string(),
        };
        if !self.is_possible_type(&name) {
            return None;
        }
        schema.object(&name)
    }
}

impl AbstractType for InterfaceType {
    fn name(&self) -> &str {
        &self.name
    }

    fn possible_types(&self) -> &[Box<str>] {
        &self.possible_types
    }

    fn type_resolver(&self) -> Option<&TypeResolver> {
        self.type_resolver.as_ref()
    }
}

impl AbstractType for UnionType {
    fn name(&self) -> &str {
        &self.name
    }

    fn possible_types(&self) -> &[Box<str>] {
        &self.members
    }

    fn type_resolver(&self) -> Option<&TypeResolver> {
        self.type_resolver.as_ref()
    }
}
