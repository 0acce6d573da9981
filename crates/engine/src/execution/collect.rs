use async_graphql_parser::{
    types::{ExecutableDocument, Field, Selection, SelectionSet},
    Pos, Positioned,
};
use error::{ErrorCode, GraphqlError};
use fxhash::FxHashSet;
use indexmap::IndexMap;

use super::{
    coercion::{is_excluded, Variables},
    location,
    task::FieldSelection,
    ExecutionContext,
};
use crate::{
    path::{Path, ResponseKey},
    schema::{AbstractType, ObjectType, Schema, TypeDefinition},
};

impl<'a> ExecutionContext<'a> {
    /// Collects the fields of `object_type` requested by the selection sets, in document order and
    /// merged by response key. Collection errors are reported once per selection and object type.
    pub(crate) fn collect_fields(
        &mut self,
        object_type: &'a ObjectType,
        selection_sets: impl IntoIterator<Item = &'a SelectionSet>,
        path: &Path,
    ) -> IndexMap<ResponseKey, FieldSelection<'a>> {
        let mut collector = FieldCollector {
            schema: self.schema,
            document: self.document,
            variables: &self.variables,
            object_type,
            path,
            fields: IndexMap::new(),
            visited_fragments: FxHashSet::default(),
            errors: Vec::new(),
        };
        for selection_set in selection_sets {
            collector.collect(selection_set);
        }

        let FieldCollector { fields, errors, .. } = collector;
        for (pos, error) in errors {
            if self.reported_collection_errors.insert((pos, object_type.name())) {
                self.errors.push(error);
            }
        }
        fields
    }
}

struct FieldCollector<'c, 'a> {
    schema: &'a Schema,
    document: &'a ExecutableDocument,
    variables: &'c Variables,
    object_type: &'a ObjectType,
    path: &'c Path,
    fields: IndexMap<ResponseKey, FieldSelection<'a>>,
    visited_fragments: FxHashSet<&'a str>,
    errors: Vec<(Pos, GraphqlError)>,
}

impl<'a> FieldCollector<'_, 'a> {
    fn collect(&mut self, selection_set: &'a SelectionSet) {
        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => self.collect_field(field),
                Selection::FragmentSpread(spread) => {
                    if is_excluded(&spread.node.directives, self.variables) {
                        continue;
                    }
                    let name = spread.node.fragment_name.node.as_str();
                    if !self.visited_fragments.insert(name) {
                        continue;
                    }
                    let Some(fragment) = self.document.fragments.get(name) else {
                        self.error(
                            spread.pos,
                            GraphqlError::new(format!("Unknown fragment `{name}`"), ErrorCode::FieldCollectionError),
                        );
                        continue;
                    };
                    let condition = &fragment.node.type_condition;
                    if self.does_type_condition_apply(condition.node.on.node.as_str(), condition.pos) {
                        self.collect(&fragment.node.selection_set.node);
                    }
                }
                Selection::InlineFragment(fragment) => {
                    if is_excluded(&fragment.node.directives, self.variables) {
                        continue;
                    }
                    if let Some(condition) = &fragment.node.type_condition {
                        if !self.does_type_condition_apply(condition.node.on.node.as_str(), condition.pos) {
                            continue;
                        }
                    }
                    self.collect(&fragment.node.selection_set.node);
                }
            }
        }
    }

    fn collect_field(&mut self, field: &'a Positioned<Field>) {
        if is_excluded(&field.node.directives, self.variables) {
            return;
        }

        let response_key = field.node.response_key().node.as_str();
        if let Some(selection) = self.fields.get_mut(response_key) {
            selection.merged.push(field);
            return;
        }

        let name = field.node.name.node.as_str();
        let definition = if name == "__typename" {
            None
        } else {
            let Some(definition) = self.object_type.field_definition(name) else {
                let error = GraphqlError::new(
                    format!("Cannot query field `{name}` on type `{}`", self.object_type.name()),
                    ErrorCode::FieldCollectionError,
                )
                .with_path(&self.path.child(response_key));
                self.error(field.pos, error);
                return;
            };
            Some(definition)
        };

        self.fields.insert(
            response_key.into(),
            FieldSelection {
                field,
                merged: vec![field],
                definition,
            },
        );
    }

    fn does_type_condition_apply(&mut self, condition: &str, pos: Pos) -> bool {
        let object_type = self.object_type.name();
        if condition == object_type {
            return true;
        }
        match self.schema.get(condition) {
            Some(TypeDefinition::Interface(interface)) => interface.is_possible_type(object_type),
            Some(TypeDefinition::Union(union)) => union.is_possible_type(object_type),
            Some(TypeDefinition::Object(_)) => false,
            Some(_) => {
                self.error(
                    pos,
                    GraphqlError::new(
                        format!("Fragment cannot condition on non composite type `{condition}`"),
                        ErrorCode::FieldCollectionError,
                    ),
                );
                false
            }
            None => {
                self.error(
                    pos,
                    GraphqlError::new(
                        format!("Unknown type `{condition}` in type condition"),
                        ErrorCode::FieldCollectionError,
                    ),
                );
                false
            }
        }
    }

    fn error(&mut self, pos: Pos, error: GraphqlError) {
        self.errors.push((pos, error.with_location(location(pos))));
    }
}
