use engine::{ArgumentDefinition, Engine, FieldDefinition, ObjectType, Resolved, ResolverError, Response, Schema};
use futures::{stream, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::request;

fn engine() -> Engine {
    let query = ObjectType::new("Query").field(FieldDefinition::new("hello", "String"));
    let subscription = ObjectType::new("Subscription")
        .field(
            FieldDefinition::new("counter", "Int!")
                .argument(ArgumentDefinition::new("limit", "Int").default_value(3))
                .resolver(|ctx| {
                    let limit: i64 = ctx.argument_as("limit")?;
                    Ok(Resolved::stream(stream::iter((1..=limit).map(|n| Ok(json!(n))))))
                }),
        )
        .field(FieldDefinition::new("ticks", "Tick").resolver(|_| {
            Ok(Resolved::stream(stream::iter([Ok(json!({ "n": 2 })), Ok(json!({ "n": 3 }))])))
        }))
        .field(FieldDefinition::new("flaky", "Int").resolver(|_| {
            Ok(Resolved::stream(stream::iter([
                Ok(json!(1)),
                Err(ResolverError::new("lost connection")),
            ])))
        }))
        .field(FieldDefinition::new("endless", "Int").resolver(|_| {
            Ok(Resolved::stream(stream::iter([Ok(json!(1))]).chain(stream::pending())))
        }))
        .field(FieldDefinition::new("broken", "Int").resolver(|_| Ok(Resolved::value(1))));
    let tick = ObjectType::new("Tick")
        .field(FieldDefinition::new("n", "Int!"))
        .field(FieldDefinition::new("square", "Int!").resolver(|ctx| {
            let n = ctx.parent().get("n").and_then(Value::as_i64).unwrap_or_default();
            Ok(Resolved::value(n * n))
        }));

    let schema = Schema::build(query)
        .subscription(subscription)
        .object(tick)
        .finish()
        .unwrap();
    Engine::new(schema)
}

async fn collect(engine: &Engine, query: &str) -> Vec<Value> {
    engine
        .execute_stream(request(query))
        .map(|response| serde_json::to_value(response).unwrap())
        .collect()
        .await
}

#[tokio::test]
async fn one_response_per_event() {
    let responses = collect(&engine(), "subscription { counter }").await;
    assert_eq!(
        responses,
        vec![
            json!({ "data": { "counter": 1 } }),
            json!({ "data": { "counter": 2 } }),
            json!({ "data": { "counter": 3 } }),
        ]
    );

    let responses = collect(&engine(), "subscription { counter(limit: 1) }").await;
    assert_eq!(responses, vec![json!({ "data": { "counter": 1 } })]);
}

#[tokio::test]
async fn events_are_completed_like_any_field() {
    let responses = collect(&engine(), "subscription { ticks { n square } }").await;
    assert_eq!(
        responses,
        vec![
            json!({ "data": { "ticks": { "n": 2, "square": 4 } } }),
            json!({ "data": { "ticks": { "n": 3, "square": 9 } } }),
        ]
    );
}

#[tokio::test]
async fn failed_event_is_a_field_error() {
    let responses = collect(&engine(), "subscription { flaky }").await;

    insta::assert_json_snapshot!(responses, @r###"
    [
      {
        "data": {
          "flaky": 1
        }
      },
      {
        "data": {
          "flaky": null
        },
        "errors": [
          {
            "message": "lost connection",
            "locations": [
              {
                "line": 1,
                "column": 16
              }
            ],
            "path": [
              "flaky"
            ],
            "extensions": {
              "code": "RESOLVER_ERROR"
            }
          }
        ]
      }
    ]
    "###);
}

#[tokio::test]
async fn cancellation_ends_the_stream() {
    let token = CancellationToken::new();
    let mut responses = engine().execute_stream(request("subscription { endless }").cancellation_token(token.clone()));

    let first = responses.next().await.map(|response| response.data);
    assert_eq!(first, Some(Some(json!({ "endless": 1 }))));

    token.cancel();
    assert!(responses.next().await.is_none());
}

#[tokio::test]
async fn invalid_subscriptions() {
    let response = engine().execute(request("subscription { counter }")).await;
    assert_eq!(response.data, None);
    assert_eq!(response.errors[0].message, "Subscriptions must be executed as a stream");

    let responses: Vec<Response> = engine()
        .execute_stream(request("subscription { counter flaky }"))
        .collect()
        .await;
    assert_eq!(responses.len(), 1);
    assert_eq!(
        responses[0].errors[0].message,
        "A subscription must select exactly one root field"
    );

    let responses: Vec<Response> = engine().execute_stream(request("subscription { broken }")).collect().await;
    assert_eq!(responses[0].data, None);
    assert_eq!(
        responses[0].errors[0].message,
        "A subscription field must return a stream"
    );
}

#[tokio::test]
async fn queries_yield_a_single_response() {
    let responses = collect(&engine(), "{ hello }").await;
    assert_eq!(responses, vec![json!({ "data": { "hello": null } })]);
}
