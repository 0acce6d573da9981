//! Behaviour of the execution engine, observed through complete operations.
mod basic;
mod batches;
mod lifecycle;
mod scalars;
mod subscriptions;

use engine::{Engine, Request};
use serde_json::Value;

#[ctor::ctor]
fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("ENGINE_LOG"))
        .with_test_writer()
        .try_init()
        .ok();
}

fn request(query: &str) -> Request {
    Request::parse(query).unwrap()
}

async fn execute(engine: &Engine, request: Request) -> Value {
    serde_json::to_value(engine.execute(request).await).unwrap()
}
