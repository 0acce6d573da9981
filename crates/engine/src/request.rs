use std::{
    any::{Any, TypeId},
    fmt,
    sync::Arc,
};

use async_graphql_parser::types::ExecutableDocument;
use error::{ErrorCode, GraphqlError, GraphqlResult, Location};
use fxhash::FxHashMap;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Request scoped values resolvers can access by type through `ResolverContext::data`.
#[derive(Default)]
pub struct Data(FxHashMap<TypeId, Box<dyn Any + Send + Sync>>);

impl Data {
    pub fn insert<D: Any + Send + Sync>(&mut self, data: D) {
        self.0.insert(TypeId::of::<D>(), Box::new(data));
    }

    pub fn get<D: Any>(&self) -> Option<&D> {
        self.0.get(&TypeId::of::<D>()).and_then(|data| data.downcast_ref::<D>())
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Data").field(&self.0.len()).finish()
    }
}

/// An operation to execute.
pub struct Request {
    pub(crate) document: Arc<ExecutableDocument>,
    pub(crate) operation_name: Option<String>,
    pub(crate) variables: serde_json::Map<String, Value>,
    pub(crate) root_value: Arc<Value>,
    pub(crate) data: Data,
    pub(crate) cancellation: CancellationToken,
}

impl Request {
    pub fn new(document: impl Into<Arc<ExecutableDocument>>) -> Self {
        Request {
            document: document.into(),
            operation_name: None,
            variables: serde_json::Map::new(),
            root_value: Arc::new(Value::Null),
            data: Data::default(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Parses an executable document.
    pub fn parse(source: &str) -> GraphqlResult<Self> {
        match async_graphql_parser::parse_query(source) {
            Ok(document) => Ok(Request::new(document)),
            Err(err) => Err(GraphqlError::new(err.to_string(), ErrorCode::OperationParsingError).with_locations(
                err.positions()
                    .map(|pos| Location::new(pos.line as u32, pos.column as u32)),
            )),
        }
    }

    #[must_use]
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn variables(mut self, variables: serde_json::Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Parent value of the root fields.
    #[must_use]
    pub fn root_value(mut self, value: impl Into<Value>) -> Self {
        self.root_value = Arc::new(value.into());
        self
    }

    #[must_use]
    pub fn data<D: Any + Send + Sync>(mut self, data: D) -> Self {
        self.data.insert(data);
        self
    }

    #[must_use]
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn document(&self) -> &ExecutableDocument {
        &self.document
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("operation_name", &self.operation_name)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}
