use std::{any::Any, borrow::Cow, future::Future, sync::Arc};

use error::ErrorCode;
use futures::{future::BoxFuture, stream::BoxStream, FutureExt, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::{
    path::Path,
    request::Data,
    schema::{FieldDefinition, ObjectType},
};

pub type ResolverResult<T> = Result<T, ResolverError>;

/// Computes the raw value of a field.
pub type Resolver = Arc<dyn Fn(ResolverContext<'_>) -> ResolverResult<Resolved> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolverError {
    #[error("{0}")]
    Message(Cow<'static, str>),
    #[error("Invalid argument `{name}`: {message}")]
    InvalidArgument { name: String, message: String },
    #[error("The field resolution was cancelled")]
    Cancelled,
    #[error("The field resolution timed out")]
    Timeout,
}

impl ResolverError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        ResolverError::Message(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ResolverError::Message(_) | ResolverError::InvalidArgument { .. } => ErrorCode::ResolverError,
            ResolverError::Cancelled => ErrorCode::OperationCancelled,
            ResolverError::Timeout => ErrorCode::OperationTimeout,
        }
    }
}

/// Outcome of a resolver invocation.
///
/// Resolvers either produce their value right away or hand back work to be driven by the executor:
/// a future, a callable invoked at most once when its value is needed, or for subscription root
/// fields a stream of events. Futures and callables may themselves produce any of those shapes.
pub enum Resolved {
    Value(Value),
    Pending(BoxFuture<'static, ResolverResult<Resolved>>),
    Deferred(Box<dyn FnOnce() -> ResolverResult<Resolved> + Send>),
    Stream(BoxStream<'static, ResolverResult<Value>>),
}

impl Resolved {
    pub fn value(value: impl Into<Value>) -> Self {
        Resolved::Value(value.into())
    }

    pub fn future<F, V>(future: F) -> Self
    where
        F: Future<Output = ResolverResult<V>> + Send + 'static,
        V: Into<Resolved>,
    {
        Resolved::Pending(future.map(|result| result.map(Into::into)).boxed())
    }

    pub fn lazy<F, V>(f: F) -> Self
    where
        F: FnOnce() -> ResolverResult<V> + Send + 'static,
        V: Into<Resolved>,
    {
        Resolved::Deferred(Box::new(move || f().map(Into::into)))
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = ResolverResult<Value>> + Send + 'static,
    {
        Resolved::Stream(stream.boxed())
    }

    /// Drives futures and callables until a plain value is reached.
    pub(crate) async fn into_value(self) -> ResolverResult<Value> {
        let mut current = self;
        loop {
            current = match current {
                Resolved::Value(value) => return Ok(value),
                Resolved::Pending(future) => future.await?,
                Resolved::Deferred(f) => f()?,
                Resolved::Stream(_) => {
                    return Err(ResolverError::new(
                        "A stream can only be returned by the root field of a subscription",
                    ))
                }
            }
        }
    }

    pub(crate) async fn into_stream(self) -> ResolverResult<BoxStream<'static, ResolverResult<Value>>> {
        let mut current = self;
        loop {
            current = match current {
                Resolved::Stream(stream) => return Ok(stream),
                Resolved::Pending(future) => future.await?,
                Resolved::Deferred(f) => f()?,
                Resolved::Value(_) => return Err(ResolverError::new("A subscription field must return a stream")),
            }
        }
    }
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        Resolved::Value(value)
    }
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolved::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolved::Pending(_) => f.write_str("Pending"),
            Resolved::Deferred(_) => f.write_str("Deferred"),
            Resolved::Stream(_) => f.write_str("Stream"),
        }
    }
}

static NULL: Value = Value::Null;

/// Everything a resolver can see about the field being resolved.
pub struct ResolverContext<'a> {
    pub(crate) sources: &'a im::Vector<Arc<Value>>,
    pub(crate) object_type: &'a ObjectType,
    pub(crate) field: &'a FieldDefinition,
    pub(crate) arguments: &'a serde_json::Map<String, Value>,
    pub(crate) path: &'a Path,
    pub(crate) data: &'a Data,
    pub(crate) variables: &'a serde_json::Map<String, Value>,
    pub(crate) cancellation: &'a CancellationToken,
}

impl<'a> ResolverContext<'a> {
    /// Value of the object owning the field, the root value for root fields.
    pub fn parent(&self) -> &'a Value {
        self.sources.back().map(|source| &**source).unwrap_or(&NULL)
    }

    pub fn parent_as<T: DeserializeOwned>(&self) -> ResolverResult<T> {
        serde_json::from_value(self.parent().clone()).map_err(|err| ResolverError::new(err.to_string()))
    }

    /// Values of the enclosing objects, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &'a Value> {
        self.sources.iter().rev().map(|source| &**source)
    }

    pub fn argument(&self, name: &str) -> Option<&'a Value> {
        self.arguments.get(name)
    }

    /// An absent argument is deserialized from `null`.
    pub fn argument_as<T: DeserializeOwned>(&self, name: &str) -> ResolverResult<T> {
        let value = self.argument(name).cloned().unwrap_or_default();
        serde_json::from_value(value).map_err(|err| ResolverError::InvalidArgument {
            name: name.to_string(),
            message: err.to_string(),
        })
    }

    pub fn arguments(&self) -> &'a serde_json::Map<String, Value> {
        self.arguments
    }

    pub fn variables(&self) -> &'a serde_json::Map<String, Value> {
        self.variables
    }

    pub fn data<D: Any>(&self) -> Option<&'a D> {
        self.data.get::<D>()
    }

    pub fn path(&self) -> &'a Path {
        self.path
    }

    pub fn field_name(&self) -> &'a str {
        self.field.name()
    }

    pub fn object_type(&self) -> &'a ObjectType {
        self.object_type
    }

    /// Cancelled when the operation is cancelled or times out.
    pub fn cancellation_token(&self) -> &'a CancellationToken {
        self.cancellation
    }
}

/// Reads the property named after the field on the parent value.
pub(crate) fn default_resolver(ctx: &ResolverContext<'_>) -> Value {
    ctx.parent().get(ctx.field_name()).cloned().unwrap_or_default()
}
