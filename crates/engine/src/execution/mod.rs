mod coercion;
mod collect;
mod complete;
mod context;
mod executor;
mod operation;
mod task;

use async_graphql_parser::{
    types::{OperationDefinition, OperationType},
    Pos, Positioned,
};
use config::ExecutionConfig;
use error::{ErrorCode, GraphqlError, Location};
use futures::stream::BoxStream;
use serde_json::Value;
use tracing::Instrument;

use self::{
    coercion::{coerce_variables, Variables},
    context::ExecutionContext,
    operation::{select_operation, SelectedOperation},
};
use crate::{
    request::Request,
    resolver::ResolverResult,
    response::Response,
    schema::{ObjectType, Schema},
};

pub(crate) fn location(pos: Pos) -> Location {
    Location::new(pos.line as u32, pos.column as u32)
}

/// Operation selected from the request document with its variables coerced.
pub(crate) struct PreparedOperation<'a> {
    pub name: Option<&'a str>,
    pub definition: &'a Positioned<OperationDefinition>,
    pub root_type: &'a ObjectType,
    pub variables: Variables,
}

impl PreparedOperation<'_> {
    pub fn ty(&self) -> OperationType {
        self.definition.node.ty
    }
}

pub(crate) fn operation_type(request: &Request) -> Option<OperationType> {
    select_operation(&request.document, request.operation_name.as_deref())
        .ok()
        .map(|operation| operation.definition.node.ty)
}

/// Failures at this stage are request errors, no data is produced.
pub(crate) fn prepare<'a>(schema: &'a Schema, request: &'a Request) -> Result<PreparedOperation<'a>, Response> {
    let SelectedOperation { name, definition } =
        select_operation(&request.document, request.operation_name.as_deref()).map_err(|err| Response::request_errors([err]))?;

    let ty = definition.node.ty;
    let Some(root_type) = schema.root_type(ty) else {
        return Err(Response::request_errors([GraphqlError::new(
            format!("The schema does not support {ty} operations"),
            ErrorCode::OperationValidationError,
        )
        .with_location(location(definition.pos))]));
    };

    let variables =
        coerce_variables(&definition.node.variable_definitions, &request.variables).map_err(Response::request_errors)?;

    Ok(PreparedOperation {
        name,
        definition,
        root_type,
        variables,
    })
}

pub(crate) async fn execute(schema: &Schema, config: &ExecutionConfig, request: &Request) -> Response {
    let operation = match prepare(schema, request) {
        Ok(operation) => operation,
        Err(response) => return response,
    };
    if operation.ty() == OperationType::Subscription {
        return Response::request_errors([GraphqlError::new(
            "Subscriptions must be executed as a stream",
            ErrorCode::OperationValidationError,
        )
        .with_location(location(operation.definition.pos))]);
    }

    let span = tracing::info_span!(
        "execute",
        operation_name = operation.name.unwrap_or_default(),
        operation_type = %operation.ty(),
    );
    async move {
        let root_type = operation.root_type;
        let mut ctx = ExecutionContext::new(schema, config, request, operation);
        ctx.execute_root(root_type).await;
        ctx.into_response()
    }
    .instrument(span)
    .await
}

/// Invokes the root field of a subscription to obtain its event stream.
pub(crate) async fn subscribe(
    schema: &Schema,
    config: &ExecutionConfig,
    request: &Request,
) -> Result<BoxStream<'static, ResolverResult<Value>>, Response> {
    let operation = prepare(schema, request)?;
    let root_type = operation.root_type;
    let pos = operation.definition.pos;
    let mut ctx = ExecutionContext::new(schema, config, request, operation);

    let mut tasks = ctx.root_tasks(root_type);
    let (Some(task), None) = (tasks.pop(), tasks.pop()) else {
        let mut errors = std::mem::take(&mut ctx.errors);
        errors.push(
            GraphqlError::new(
                "A subscription must select exactly one root field",
                ErrorCode::OperationValidationError,
            )
            .with_location(location(pos)),
        );
        return Err(Response::request_errors(errors));
    };

    let stream = match task.invoke(&ctx) {
        Ok(resolved) => resolved.into_stream().await,
        Err(err) => Err(err),
    };
    stream.map_err(|err| {
        tracing::warn!("Subscription to {} failed: {err}", task.path);
        Response::request_errors([GraphqlError::new(err.to_string(), err.code())
            .with_location(task.selection.location())
            .with_path(&task.path)])
    })
}

/// Produces the response for one subscription event, completing the root field with it.
pub(crate) async fn execute_event(
    schema: &Schema,
    config: &ExecutionConfig,
    request: &Request,
    event: ResolverResult<Value>,
) -> Response {
    let operation = match prepare(schema, request) {
        Ok(operation) => operation,
        Err(response) => return response,
    };
    let root_type = operation.root_type;
    let mut ctx = ExecutionContext::new(schema, config, request, operation);
    if let Some(task) = ctx.root_tasks(root_type).pop() {
        ctx.complete_task(task, event);
        ctx.run_batches().await;
    }
    ctx.into_response()
}
