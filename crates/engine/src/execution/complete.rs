use std::sync::Arc;

use async_graphql_parser::{types::Field, Positioned};
use error::{ErrorCode, GraphqlError};
use serde_json::Value;

use super::{
    task::{FieldResolverTask, FieldSelection},
    ExecutionContext,
};
use crate::{
    path::Path,
    resolver::ResolverResult,
    schema::{AbstractType, ObjectType, SerializeError, Type, TypeDefinition},
};

/// A non-null position couldn't be completed, the nearest nullable ancestor must be nulled. The
/// error has already been recorded.
pub(crate) struct PropagateNull;

pub(crate) enum Completed {
    Value,
    Null,
}

type CompletionResult = Result<Completed, PropagateNull>;

/// Field being completed.
struct CompletedField<'t, 'a> {
    selection: &'t FieldSelection<'a>,
    sources: &'t im::Vector<Arc<Value>>,
}

impl<'a> ExecutionContext<'a> {
    /// Completes the resolved value of a task, writing it into the response and scheduling the
    /// child fields of its objects in the next batch.
    pub(crate) fn complete_task(&mut self, task: FieldResolverTask<'a>, result: ResolverResult<Value>) {
        let FieldResolverTask {
            sources,
            object_type,
            selection,
            path,
            null_boundary,
        } = task;

        let Some(definition) = selection.definition else {
            let typename = result.unwrap_or_else(|_| Value::String(object_type.name().to_string()));
            self.builder.add_value(&path, typename);
            return;
        };

        let value = match result {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("Resolver of {}.{} at {path} failed: {err}", object_type.name(), definition.name());
                self.errors.push(
                    GraphqlError::new(err.to_string(), err.code())
                        .with_location(selection.location())
                        .with_path(&path),
                );
                if definition.ty.is_nullable() {
                    self.builder.set_null(&path);
                } else {
                    self.builder.propagate_null(null_boundary.as_ref());
                }
                return;
            }
        };

        let field = CompletedField {
            selection: &selection,
            sources: &sources,
        };
        if self
            .complete_value(&field, &definition.ty, &path, value, null_boundary.as_ref())
            .is_err()
        {
            self.builder.propagate_null(null_boundary.as_ref());
        }
    }

    /// Nullable positions absorb the failures of their content by becoming null and become the
    /// boundary for everything below them. A non-null position receiving null fails.
    fn complete_value(
        &mut self,
        field: &CompletedField<'_, 'a>,
        ty: &'a Type,
        path: &Path,
        value: Value,
        null_boundary: Option<&Path>,
    ) -> CompletionResult {
        match ty {
            Type::NonNull(inner) => match self.complete_inner(field, inner, path, value, null_boundary)? {
                Completed::Null => {
                    self.field_error(field, GraphqlError::non_null_violation(), path);
                    Err(PropagateNull)
                }
                Completed::Value => Ok(Completed::Value),
            },
            _ => match self.complete_inner(field, ty, path, value, Some(path)) {
                Ok(completed) => Ok(completed),
                Err(PropagateNull) => {
                    self.builder.set_null(path);
                    Ok(Completed::Null)
                }
            },
        }
    }

    fn complete_inner(
        &mut self,
        field: &CompletedField<'_, 'a>,
        ty: &'a Type,
        path: &Path,
        value: Value,
        null_boundary: Option<&Path>,
    ) -> CompletionResult {
        if value.is_null() {
            self.builder.add_value(path, Value::Null);
            return Ok(Completed::Null);
        }

        let schema = self.schema;
        match ty {
            Type::NonNull(_) => self.complete_value(field, ty, path, value, null_boundary),
            Type::List(item_ty) => self.complete_list(field, ty, item_ty, path, value, null_boundary),
            Type::Named(name) => match schema.get(name) {
                Some(TypeDefinition::Scalar(scalar)) => self.complete_leaf(field, path, scalar.serialize(value)),
                Some(TypeDefinition::Enum(enum_type)) => self.complete_leaf(field, path, enum_type.serialize(value)),
                Some(TypeDefinition::Object(object_type)) => {
                    self.complete_object(field, object_type, path, value, null_boundary);
                    Ok(Completed::Value)
                }
                Some(TypeDefinition::Interface(interface)) => {
                    self.complete_abstract(field, interface, path, value, null_boundary)
                }
                Some(TypeDefinition::Union(union)) => self.complete_abstract(field, union, path, value, null_boundary),
                None => {
                    tracing::error!("Type `{name}` of the field at {path} is missing from the schema");
                    self.field_error(field, GraphqlError::internal_server_error(), path);
                    Err(PropagateNull)
                }
            },
        }
    }

    /// A list whose non-null item fails is discarded entirely.
    fn complete_list(
        &mut self,
        field: &CompletedField<'_, 'a>,
        ty: &'a Type,
        item_ty: &'a Type,
        path: &Path,
        value: Value,
        null_boundary: Option<&Path>,
    ) -> CompletionResult {
        let Value::Array(items) = value else {
            self.field_error(
                field,
                GraphqlError::new(
                    format!("Expected a list for a field of type `{ty}`"),
                    ErrorCode::ResolverError,
                ),
                path,
            );
            return Err(PropagateNull);
        };

        self.builder.add_list(path, items.len());
        for (index, item) in items.into_iter().enumerate() {
            let item_path = path.index(index);
            let outcome = match item_ty {
                Type::NonNull(inner) => match self.complete_inner(field, inner, &item_path, item, null_boundary) {
                    Ok(Completed::Null) => {
                        self.field_error(field, GraphqlError::null_list_item(), &item_path);
                        Err(PropagateNull)
                    }
                    outcome => outcome,
                },
                _ => self.complete_value(field, item_ty, &item_path, item, null_boundary),
            };
            outcome?;
        }
        Ok(Completed::Value)
    }

    fn complete_leaf(
        &mut self,
        field: &CompletedField<'_, 'a>,
        path: &Path,
        serialized: Result<Value, SerializeError>,
    ) -> CompletionResult {
        match serialized {
            Ok(value) => {
                let completed = if value.is_null() {
                    Completed::Null
                } else {
                    Completed::Value
                };
                self.builder.add_value(path, value);
                Ok(completed)
            }
            Err(SerializeError::InvalidValue(message)) => {
                self.field_error(field, GraphqlError::new(message, ErrorCode::SerializationError), path);
                Err(PropagateNull)
            }
            Err(SerializeError::Other(err)) => {
                tracing::warn!("Serialization of the value at {path} failed: {err}");
                self.field_error(field, GraphqlError::masked_serialization_error(), path);
                Err(PropagateNull)
            }
        }
    }

    /// Objects are never written directly, only declared. Their fields are resolved in the next
    /// batch and write through their own paths.
    fn complete_object(
        &mut self,
        field: &CompletedField<'_, 'a>,
        object_type: &'a ObjectType,
        path: &Path,
        value: Value,
        null_boundary: Option<&Path>,
    ) {
        let merged: Vec<&'a Positioned<Field>> = field.selection.merged.clone();
        let fields = self.collect_fields(
            object_type,
            merged.into_iter().map(|field| &field.node.selection_set.node),
            path,
        );
        self.builder.add_object(path, fields.keys().cloned().collect());

        let mut sources = field.sources.clone();
        sources.push_back(Arc::new(value));
        for (response_key, selection) in fields {
            self.next_batch.push(FieldResolverTask {
                sources: sources.clone(),
                object_type,
                selection,
                path: path.child(response_key),
                null_boundary: null_boundary.cloned(),
            });
        }
    }

    fn complete_abstract(
        &mut self,
        field: &CompletedField<'_, 'a>,
        abstract_type: &'a dyn AbstractType,
        path: &Path,
        value: Value,
        null_boundary: Option<&Path>,
    ) -> CompletionResult {
        let schema = self.schema;
        match abstract_type.resolve_type(schema, &value) {
            Some(object_type) => {
                self.complete_object(field, object_type, path, value, null_boundary);
                Ok(Completed::Value)
            }
            None => {
                self.field_error(
                    field,
                    GraphqlError::new(
                        format!(
                            "Could not resolve the concrete object type of the abstract type `{}`",
                            abstract_type.name()
                        ),
                        ErrorCode::AbstractTypeResolutionError,
                    ),
                    path,
                );
                Err(PropagateNull)
            }
        }
    }

    fn field_error(&mut self, field: &CompletedField<'_, 'a>, error: GraphqlError, path: &Path) {
        self.errors
            .push(error.with_location(field.selection.location()).with_path(path));
    }
}
