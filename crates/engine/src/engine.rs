use std::sync::Arc;

use async_graphql_parser::types::OperationType;
use config::ExecutionConfig;
use futures::{
    stream::{self, BoxStream},
    FutureExt, StreamExt,
};

use crate::{execution, request::Request, response::Response, schema::Schema};

/// Executes operations against a schema.
///
/// Cloning is cheap, clones share the same schema and configuration. Every operation gets its own
/// execution state so any number of them may run concurrently.
#[derive(Clone)]
pub struct Engine {
    // Shared with every in-flight subscription stream.
    schema: Arc<Schema>,
    config: Arc<ExecutionConfig>,
}

impl Engine {
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Engine {
            schema: schema.into(),
            config: Arc::new(ExecutionConfig::default()),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Executes a query or a mutation.
    pub async fn execute(&self, request: Request) -> Response {
        execution::execute(&self.schema, &self.config, &request).await
    }

    /// Executes any kind of operation. Subscriptions yield one response per event until the
    /// event stream ends or the request is cancelled, other operations a single response.
    pub fn execute_stream(&self, request: Request) -> BoxStream<'static, Response> {
        let engine = self.clone();
        async move {
            if execution::operation_type(&request) != Some(OperationType::Subscription) {
                let response = engine.execute(request).await;
                return stream::iter([response]).boxed();
            }

            let events = match execution::subscribe(&engine.schema, &engine.config, &request).await {
                Ok(events) => events,
                Err(response) => return stream::iter([response]).boxed(),
            };
            let events = events
                .take_until(request.cancellation.clone().cancelled_owned())
                .boxed();

            stream::unfold((engine, request, events), |(engine, request, mut events)| async move {
                let event = events.next().await?;
                let response = execution::execute_event(&engine.schema, &engine.config, &request, event).await;
                Some((response, (engine, request, events)))
            })
            .boxed()
        }
        .flatten_stream()
        .boxed()
    }
}
