use std::sync::Arc;

use async_graphql_parser::{
    types::{ExecutableDocument, OperationDefinition},
    Pos, Positioned,
};
use config::ExecutionConfig;
use error::GraphqlError;
use fxhash::FxHashSet;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{coercion::Variables, task::FieldResolverTask, PreparedOperation};
use crate::{
    request::{Data, Request},
    response::{Response, ResultBuilder},
    schema::Schema,
};

/// State of a single operation execution.
///
/// Everything mutable is owned by the context and only touched by the executor between two
/// suspension points, so no synchronization is involved even though resolvers run concurrently.
pub(crate) struct ExecutionContext<'a> {
    pub schema: &'a Schema,
    pub config: &'a ExecutionConfig,
    pub document: &'a ExecutableDocument,
    pub operation: &'a Positioned<OperationDefinition>,
    pub root_value: Arc<Value>,
    pub data: &'a Data,
    pub variables: Variables,
    pub errors: Vec<GraphqlError>,
    pub builder: ResultBuilder,
    pub next_batch: Vec<FieldResolverTask<'a>>,
    /// Child of the request token, also cancelled when the operation times out.
    pub cancellation: CancellationToken,
    pub deadline: Option<Instant>,
    pub batch_count: usize,
    timed_out: bool,
    halted: bool,
    pub(super) reported_collection_errors: FxHashSet<(Pos, &'a str)>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        schema: &'a Schema,
        config: &'a ExecutionConfig,
        request: &'a Request,
        operation: PreparedOperation<'a>,
    ) -> Self {
        ExecutionContext {
            schema,
            config,
            document: &request.document,
            operation: operation.definition,
            root_value: request.root_value.clone(),
            data: &request.data,
            variables: operation.variables,
            errors: Vec::new(),
            builder: ResultBuilder::default(),
            next_batch: Vec::new(),
            cancellation: request.cancellation.child_token(),
            deadline: config.timeout.and_then(|timeout| Instant::now().checked_add(timeout)),
            batch_count: 0,
            timed_out: false,
            halted: false,
            reported_collection_errors: FxHashSet::default(),
        }
    }

    /// Whether no more resolvers should be invoked. The first time a reason to stop is observed an
    /// operation error is recorded.
    pub fn should_halt(&mut self) -> bool {
        if !self.halted {
            if let Some(error) = self.interruption() {
                self.halt(error);
            }
        }
        self.halted
    }

    pub fn halt(&mut self, error: GraphqlError) {
        if self.halted {
            return;
        }
        tracing::warn!("Halting execution: {}", error.message);
        self.halted = true;
        self.errors.push(error);
    }

    fn interruption(&mut self) -> Option<GraphqlError> {
        if self.cancellation.is_cancelled() {
            return Some(if self.timed_out {
                GraphqlError::operation_timeout()
            } else {
                GraphqlError::operation_cancelled()
            });
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            self.timed_out = true;
            self.cancellation.cancel();
            return Some(GraphqlError::operation_timeout());
        }
        None
    }

    pub fn into_response(self) -> Response {
        tracing::debug!(
            batches = self.batch_count,
            errors = self.errors.len(),
            "Execution finished"
        );
        Response {
            data: Some(self.builder.build()),
            errors: self.errors,
        }
    }
}
