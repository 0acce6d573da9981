use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use engine::{Engine, ExecutionConfig, FieldDefinition, ObjectType, Resolved, Schema};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::{execute, request};

type Calls = Arc<AtomicUsize>;

fn engine(config: ExecutionConfig) -> Engine {
    let query = ObjectType::new("Query")
        .field(FieldDefinition::new("fast", "String").resolver(|_| Ok(Resolved::value("fast"))))
        .field(FieldDefinition::new("slow", "String").resolver(|_| {
            Ok(Resolved::future(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(json!("slow"))
            }))
        }))
        .field(FieldDefinition::new("obj", "Obj").resolver(|_| Ok(Resolved::value(json!({})))));
    let obj = ObjectType::new("Obj").field(FieldDefinition::new("value", "String!").resolver(|ctx| {
        if let Some(calls) = ctx.data::<Calls>() {
            calls.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Resolved::value("value"))
    }));

    Engine::new(Schema::build(query).object(obj).finish().unwrap()).with_config(config)
}

fn with_timeout() -> ExecutionConfig {
    ExecutionConfig {
        timeout: Some(Duration::from_secs(1)),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn pending_resolvers_are_abandoned_on_timeout() {
    let response = execute(
        &engine(with_timeout()),
        request(indoc! {r#"
            query {
              fast
              slow
            }
        "#}),
    )
    .await;

    insta::assert_json_snapshot!(response, @r###"
    {
      "data": {
        "fast": "fast",
        "slow": null
      },
      "errors": [
        {
          "message": "The field resolution timed out",
          "locations": [
            {
              "line": 3,
              "column": 3
            }
          ],
          "path": [
            "slow"
          ],
          "extensions": {
            "code": "OPERATION_TIMEOUT"
          }
        }
      ]
    }
    "###);
}

#[tokio::test(start_paused = true)]
async fn no_resolver_is_invoked_after_the_deadline() {
    let calls = Calls::default();
    let query = indoc! {r#"
        query {
          slow
          obj {
            value
          }
        }
    "#};

    let response = execute(&engine(with_timeout()), request(query).data(calls.clone())).await;

    insta::assert_json_snapshot!(response, @r###"
    {
      "data": {
        "slow": null,
        "obj": null
      },
      "errors": [
        {
          "message": "The field resolution timed out",
          "locations": [
            {
              "line": 2,
              "column": 3
            }
          ],
          "path": [
            "slow"
          ],
          "extensions": {
            "code": "OPERATION_TIMEOUT"
          }
        },
        {
          "message": "The operation timed out",
          "extensions": {
            "code": "OPERATION_TIMEOUT"
          }
        }
      ]
    }
    "###);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancelled_request_resolves_nothing() {
    let token = CancellationToken::new();
    token.cancel();

    let response = execute(
        &engine(ExecutionConfig::default()),
        request("{ fast }").cancellation_token(token),
    )
    .await;

    insta::assert_json_snapshot!(response, @r###"
    {
      "data": {
        "fast": null
      },
      "errors": [
        {
          "message": "The operation was cancelled",
          "extensions": {
            "code": "OPERATION_CANCELLED"
          }
        }
      ]
    }
    "###);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_a_batch() {
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let query = indoc! {r#"
        query {
          slow
          obj {
            value
          }
        }
    "#};
    let response = execute(
        &engine(ExecutionConfig::default()),
        request(query).cancellation_token(token),
    )
    .await;

    assert_eq!(response["data"], json!({ "slow": null, "obj": null }));
    assert_eq!(
        response["errors"],
        json!([
            {
                "message": "The field resolution was cancelled",
                "locations": [{ "line": 2, "column": 3 }],
                "path": ["slow"],
                "extensions": { "code": "OPERATION_CANCELLED" }
            },
            {
                "message": "The operation was cancelled",
                "extensions": { "code": "OPERATION_CANCELLED" }
            }
        ])
    );
}
