mod builder;

pub(crate) use builder::ResultBuilder;
use error::{ErrorCodeCounter, GraphqlError};
use serde_json::Value;

/// Outcome of an execution: the data, `None` when the operation could not be executed at all, and
/// every error encountered along the way.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
}

impl Response {
    pub(crate) fn request_errors(errors: impl IntoIterator<Item = GraphqlError>) -> Self {
        Response {
            data: None,
            errors: errors.into_iter().collect(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_codes(&self) -> ErrorCodeCounter {
        ErrorCodeCounter::from_errors(&self.errors)
    }
}
