#![deny(clippy::future_not_send)]

mod engine;
mod execution;
mod path;
mod request;
mod resolver;
mod response;
pub mod schema;

pub use config::ExecutionConfig;
pub use engine::Engine;
pub use error::{ErrorCode, ErrorCodeCounter, ErrorPath, ErrorPathSegment, GraphqlError, Location};
pub use path::{Path, PathSegment, ResponseKey};
pub use request::{Data, Request};
pub use resolver::{Resolved, Resolver, ResolverContext, ResolverError, ResolverResult};
pub use response::Response;
pub use schema::{
    ArgumentDefinition, EnumType, FieldDefinition, InterfaceType, ObjectType, ScalarSerializer, ScalarType, Schema,
    SchemaError, SerializeError, Type, UnionType,
};
