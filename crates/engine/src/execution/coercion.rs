use std::convert::Infallible;

use async_graphql_parser::{
    types::{Directive, Field, VariableDefinition},
    Positioned,
};
use async_graphql_value::{ConstValue, Name, Value as InputValue};
use error::{ErrorCode, GraphqlError};
use serde_json::{Map, Value};

use crate::schema::FieldDefinition;

pub(crate) type Variables = Map<String, Value>;

/// Applies the defaults of the variable definitions and rejects missing or null values for
/// non-null variables.
pub(crate) fn coerce_variables(
    definitions: &[Positioned<VariableDefinition>],
    provided: &Variables,
) -> Result<Variables, Vec<GraphqlError>> {
    let mut variables = Map::with_capacity(definitions.len());
    let mut errors = Vec::new();

    for definition in definitions {
        let name = definition.node.name.node.as_str();
        let ty = &definition.node.var_type.node;
        let location = super::location(definition.pos);

        match provided.get(name) {
            Some(Value::Null) if !ty.nullable => errors.push(
                GraphqlError::new(
                    format!("Variable `${name}` of non-null type `{ty}` must not be null"),
                    ErrorCode::VariableError,
                )
                .with_location(location),
            ),
            Some(value) => {
                variables.insert(name.to_string(), value.clone());
            }
            None => match &definition.node.default_value {
                Some(default) => {
                    variables.insert(name.to_string(), const_to_json(default.node.clone()));
                }
                None if !ty.nullable => errors.push(
                    GraphqlError::new(
                        format!("Variable `${name}` of required type `{ty}` was not provided"),
                        ErrorCode::VariableError,
                    )
                    .with_location(location),
                ),
                None => {}
            },
        }
    }

    if errors.is_empty() {
        Ok(variables)
    } else {
        Err(errors)
    }
}

/// Resolves the argument values of a field, filling absent ones with their schema default.
/// An argument bound to a variable that wasn't provided is treated as absent.
pub(crate) fn resolve_arguments(
    field: &Positioned<Field>,
    definition: &FieldDefinition,
    variables: &Variables,
) -> Map<String, Value> {
    let mut arguments = Map::with_capacity(definition.arguments.len());
    for (name, value) in &field.node.arguments {
        if let InputValue::Variable(variable) = &value.node {
            if let Some(value) = variables.get(variable.as_str()) {
                arguments.insert(name.node.to_string(), value.clone());
            }
            continue;
        }
        arguments.insert(name.node.to_string(), resolve_value(&value.node, variables));
    }
    for (name, argument) in &definition.arguments {
        if let Some(default) = &argument.default_value {
            if !arguments.contains_key(&**name) {
                arguments.insert(name.to_string(), default.clone());
            }
        }
    }
    arguments
}

/// Nested variables that weren't provided resolve to null.
pub(crate) fn resolve_value(value: &InputValue, variables: &Variables) -> Value {
    let value = value.clone().into_const_with(|name: Name| {
        Ok::<_, Infallible>(
            variables
                .get(name.as_str())
                .cloned()
                .and_then(|value| ConstValue::from_json(value).ok())
                .unwrap_or(ConstValue::Null),
        )
    });
    match value {
        Ok(value) => const_to_json(value),
        Err(never) => match never {},
    }
}

fn const_to_json(value: ConstValue) -> Value {
    value.into_json().unwrap_or_default()
}

/// `@skip(if: true)` and `@include(if: false)` exclude a selection.
pub(crate) fn is_excluded(directives: &[Positioned<Directive>], variables: &Variables) -> bool {
    directives.iter().any(|directive| {
        let condition = directive
            .node
            .get_argument("if")
            .map(|value| resolve_value(&value.node, variables));
        match directive.node.name.node.as_str() {
            "skip" => condition == Some(Value::Bool(true)),
            "include" => condition == Some(Value::Bool(false)),
            _ => false,
        }
    })
}
