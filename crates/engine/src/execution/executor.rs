use std::future::Future;

use async_graphql_parser::types::OperationType;
use error::{ErrorCode, GraphqlError};
use futures_util::{future, stream, StreamExt};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{task::FieldResolverTask, ExecutionContext};
use crate::{
    path::Path,
    resolver::{ResolverError, ResolverResult},
    schema::ObjectType,
};

impl<'a> ExecutionContext<'a> {
    /// Executes the selection set of the operation against `root_type` until no task is left.
    pub(crate) async fn execute_root(&mut self, root_type: &'a ObjectType) {
        let tasks = self.root_tasks(root_type);
        if self.operation.node.ty == OperationType::Mutation && self.config.serial_mutations {
            for task in tasks {
                self.next_batch.push(task);
                self.run_batches().await;
            }
        } else {
            self.next_batch.extend(tasks);
            self.run_batches().await;
        }
    }

    pub(crate) fn root_tasks(&mut self, root_type: &'a ObjectType) -> Vec<FieldResolverTask<'a>> {
        let root = Path::root();
        let operation = self.operation;
        let fields = self.collect_fields(root_type, [&operation.node.selection_set.node], &root);
        self.builder.add_object(&root, fields.keys().cloned().collect());

        let sources = im::Vector::unit(self.root_value.clone());
        fields
            .into_iter()
            .map(|(response_key, selection)| FieldResolverTask {
                sources: sources.clone(),
                object_type: root_type,
                selection,
                path: Path::new(response_key),
                null_boundary: None,
            })
            .collect()
    }

    /// Drains batches until one comes out empty. Each batch holds the tasks discovered while
    /// completing the previous one.
    pub(crate) async fn run_batches(&mut self) {
        loop {
            let batch = std::mem::take(&mut self.next_batch);
            if batch.is_empty() {
                break;
            }

            if let Some(max) = self.config.max_batches {
                if self.batch_count >= max.get() {
                    self.halt(GraphqlError::new(
                        format!("Exceeded the maximum of {max} execution batches"),
                        ErrorCode::InternalServerError,
                    ));
                }
            }
            if self.should_halt() {
                for task in batch {
                    self.abandon(task);
                }
                break;
            }

            self.batch_count += 1;
            tracing::debug!(batch = self.batch_count, tasks = batch.len(), "Executing batch");
            self.execute_batch(batch).await;
        }
    }

    /// Every resolver of the batch is invoked before any of them is awaited. Completion then
    /// happens in task order, whatever the order in which the resolvers finished.
    async fn execute_batch(&mut self, batch: Vec<FieldResolverTask<'a>>) {
        let mut tasks = Vec::with_capacity(batch.len());
        let mut resolutions = Vec::with_capacity(batch.len());
        for task in batch {
            // Some ancestor was nulled by a sibling, nothing to resolve anymore.
            if self.builder.is_discarded(&task.path) {
                continue;
            }
            if self.should_halt() {
                self.abandon(task);
                continue;
            }
            tracing::trace!("Resolving {}", task.path);
            resolutions.push(task.invoke(self));
            tasks.push(task);
        }

        let cancellation = self.cancellation.clone();
        let deadline = self.deadline;
        let futures = resolutions.into_iter().map(move |resolution| {
            guarded(cancellation.clone(), deadline, async move {
                match resolution {
                    Ok(resolved) => resolved.into_value().await,
                    Err(err) => Err(err),
                }
            })
        });
        let results: Vec<ResolverResult<Value>> = match self.config.max_concurrent_resolvers {
            Some(limit) => stream::iter(futures).buffered(limit.get()).collect().await,
            None => future::join_all(futures).await,
        };

        for (task, result) in tasks.into_iter().zip(results) {
            self.complete_task(task, result);
        }
    }

    /// Nulls the position of a task that will never be resolved.
    fn abandon(&mut self, task: FieldResolverTask<'a>) {
        if self.builder.is_discarded(&task.path) {
            return;
        }
        let nullable = match task.selection.definition {
            Some(definition) => definition.ty().is_nullable(),
            None => true,
        };
        if nullable {
            self.builder.set_null(&task.path);
        } else {
            self.builder.propagate_null(task.null_boundary.as_ref());
        }
    }
}

/// Stops waiting for `resolution` once the operation is cancelled or its deadline is reached.
async fn guarded(
    cancellation: CancellationToken,
    deadline: Option<Instant>,
    resolution: impl Future<Output = ResolverResult<Value>> + Send,
) -> ResolverResult<Value> {
    let timeout = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => future::pending().await,
        }
    };
    tokio::select! {
        biased;
        result = resolution => result,
        _ = cancellation.cancelled() => Err(ResolverError::Cancelled),
        _ = timeout => Err(ResolverError::Timeout),
    }
}
