use std::sync::Arc;

use async_graphql_parser::{types::Field, Positioned};
use error::Location;
use serde_json::Value;

use super::{coercion::resolve_arguments, location, ExecutionContext};
use crate::{
    path::Path,
    resolver::{default_resolver, Resolved, ResolverContext, ResolverResult},
    schema::{FieldDefinition, ObjectType},
};

/// A field of the selection set, after fragment expansion and merging of fields sharing the same
/// response key.
pub(crate) struct FieldSelection<'a> {
    /// First occurrence, providing the arguments and the error location.
    pub field: &'a Positioned<Field>,
    /// Every occurrence, their selection sets are merged when completing an object.
    pub merged: Vec<&'a Positioned<Field>>,
    /// `None` for `__typename`.
    pub definition: Option<&'a FieldDefinition>,
}

impl FieldSelection<'_> {
    pub fn location(&self) -> Location {
        location(self.field.pos)
    }
}

/// One pending field resolution.
pub(crate) struct FieldResolverTask<'a> {
    /// Values of the enclosing objects, the parent object being the last one.
    pub sources: im::Vector<Arc<Value>>,
    pub object_type: &'a ObjectType,
    pub selection: FieldSelection<'a>,
    pub path: Path,
    /// Nearest nullable ancestor, nulled if this field fails to produce a non-null value.
    pub null_boundary: Option<Path>,
}

impl<'a> FieldResolverTask<'a> {
    /// Calls the resolver. Whatever work it hands back is driven later on by the executor.
    pub fn invoke(&self, ctx: &ExecutionContext<'a>) -> ResolverResult<Resolved> {
        let Some(definition) = self.selection.definition else {
            return Ok(Resolved::Value(Value::String(self.object_type.name().to_string())));
        };

        let arguments = resolve_arguments(self.selection.field, definition, &ctx.variables);
        let resolver_ctx = ResolverContext {
            sources: &self.sources,
            object_type: self.object_type,
            field: definition,
            arguments: &arguments,
            path: &self.path,
            data: ctx.data,
            variables: &ctx.variables,
            cancellation: &ctx.cancellation,
        };

        match &definition.resolver {
            Some(resolver) => resolver(resolver_ctx),
            None => Ok(Resolved::Value(default_resolver(&resolver_ctx))),
        }
    }
}
