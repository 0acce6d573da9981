use async_graphql_parser::{
    types::{ExecutableDocument, OperationDefinition},
    Positioned,
};
use error::{ErrorCode, GraphqlError, GraphqlResult};

pub(crate) struct SelectedOperation<'a> {
    pub name: Option<&'a str>,
    pub definition: &'a Positioned<OperationDefinition>,
}

/// Picks the operation named `operation_name`, or the only one of the document when no name is
/// given.
pub(crate) fn select_operation<'a>(
    document: &'a ExecutableDocument,
    operation_name: Option<&str>,
) -> GraphqlResult<SelectedOperation<'a>> {
    let mut operations = document.operations.iter();
    match operation_name {
        Some(expected) => operations
            .find(|(name, _)| matches!(name, Some(name) if name.as_str() == expected))
            .map(|(name, definition)| SelectedOperation {
                name: name.map(|name| name.as_str()),
                definition,
            })
            .ok_or_else(|| {
                GraphqlError::new(
                    format!("Unknown operation named '{expected}'"),
                    ErrorCode::OperationValidationError,
                )
            }),
        None => match (operations.next(), operations.next()) {
            (Some((name, definition)), None) => Ok(SelectedOperation {
                name: name.map(|name| name.as_str()),
                definition,
            }),
            (None, _) => Err(GraphqlError::new(
                "The document does not contain any operation",
                ErrorCode::OperationValidationError,
            )),
            (Some(_), Some(_)) => Err(GraphqlError::new(
                "Must provide operation name if query contains multiple operations",
                ErrorCode::OperationValidationError,
            )),
        },
    }
}
