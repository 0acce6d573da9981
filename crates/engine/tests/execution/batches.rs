use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex},
    time::Duration,
};

use engine::{Engine, ExecutionConfig, FieldDefinition, ObjectType, Resolved, ResolverContext, ResolverResult, Schema};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::{execute, request};

#[derive(Default)]
struct Log(Mutex<Vec<String>>);

impl Log {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

fn log(ctx: &ResolverContext<'_>) -> Arc<Log> {
    ctx.data::<Arc<Log>>().cloned().unwrap_or_default()
}

fn logged(name: &'static str) -> impl Fn(ResolverContext<'_>) -> ResolverResult<Resolved> + Send + Sync + 'static {
    move |ctx| {
        log(&ctx).push(format!("invoke {name}"));
        Ok(Resolved::value(name))
    }
}

fn delayed(name: &'static str, delay: Duration) -> impl Fn(ResolverContext<'_>) -> ResolverResult<Resolved> + Send + Sync + 'static {
    move |ctx| {
        let log = log(&ctx);
        Ok(Resolved::future(async move {
            log.push(format!("start {name}"));
            tokio::time::sleep(delay).await;
            log.push(format!("end {name}"));
            Ok(json!(name))
        }))
    }
}

fn schema() -> Schema {
    let query = ObjectType::new("Query")
        .field(FieldDefinition::new("foo", "Foo!").resolver(|ctx| {
            let log = log(&ctx);
            log.push("invoke foo");
            Ok(Resolved::future(async move {
                log.push("await foo");
                Ok(json!({}))
            }))
        }))
        .field(FieldDefinition::new("other", "String").resolver(logged("other")))
        .field(FieldDefinition::new("slow", "String").resolver(delayed("slow", Duration::from_millis(20))))
        .field(FieldDefinition::new("fast", "String").resolver(delayed("fast", Duration::from_millis(1))));
    let foo = ObjectType::new("Foo").field(FieldDefinition::new("bar", "Bar!").resolver(logged("bar")));
    let bar = ObjectType::new("Bar").field(FieldDefinition::new("baz", "String").resolver(logged("baz")));
    let mutation = ObjectType::new("Mutation")
        .field(FieldDefinition::new("first", "String").resolver(delayed("first", Duration::from_millis(20))))
        .field(FieldDefinition::new("second", "String").resolver(delayed("second", Duration::from_millis(1))));

    Schema::build(query)
        .mutation(mutation)
        .object(foo)
        .object(bar)
        .finish()
        .unwrap()
}

const NESTED: &str = indoc! {r#"
    query {
      foo {
        bar {
          baz
        }
      }
      other
    }
"#};

#[tokio::test]
async fn each_object_level_is_a_new_batch() {
    let log = Arc::new(Log::default());
    let response = execute(&Engine::new(schema()), request(NESTED).data(log.clone())).await;

    insta::assert_json_snapshot!(response, @r###"
    {
      "data": {
        "foo": {
          "bar": {
            "baz": "baz"
          }
        },
        "other": "other"
      }
    }
    "###);

    // Every resolver of a batch is invoked before any of them is awaited.
    assert_eq!(
        log.entries(),
        vec!["invoke foo", "invoke other", "await foo", "invoke bar", "invoke baz"]
    );
}

#[tokio::test]
async fn batch_limit_stops_the_execution() {
    let engine = Engine::new(schema()).with_config(ExecutionConfig {
        max_batches: NonZeroUsize::new(2),
        ..Default::default()
    });
    let response = execute(&engine, request(NESTED)).await;

    insta::assert_json_snapshot!(response, @r###"
    {
      "data": {
        "foo": {
          "bar": {
            "baz": null
          }
        },
        "other": "other"
      },
      "errors": [
        {
          "message": "Exceeded the maximum of 2 execution batches",
          "extensions": {
            "code": "INTERNAL_SERVER_ERROR"
          }
        }
      ]
    }
    "###);

    let engine = Engine::new(schema()).with_config(ExecutionConfig {
        max_batches: NonZeroUsize::new(3),
        ..Default::default()
    });
    let response = execute(&engine, request(NESTED)).await;
    assert_eq!(response["data"]["foo"]["bar"]["baz"], json!("baz"));
    assert_eq!(response.get("errors"), None);
}

#[tokio::test(start_paused = true)]
async fn mutation_root_fields_run_serially() {
    let query = indoc! {r#"
        mutation {
          first
          second
        }
    "#};

    let log = Arc::new(Log::default());
    let response = execute(&Engine::new(schema()), request(query).data(log.clone())).await;
    assert_eq!(response, json!({ "data": { "first": "first", "second": "second" } }));
    assert_eq!(
        log.entries(),
        vec!["start first", "end first", "start second", "end second"]
    );

    let engine = Engine::new(schema()).with_config(ExecutionConfig {
        serial_mutations: false,
        ..Default::default()
    });
    let log = Arc::new(Log::default());
    let response = execute(&engine, request(query).data(log.clone())).await;
    assert_eq!(response, json!({ "data": { "first": "first", "second": "second" } }));
    assert_eq!(
        log.entries(),
        vec!["start first", "start second", "end second", "end first"]
    );
}

#[tokio::test(start_paused = true)]
async fn concurrency_limit_within_a_batch() {
    let query = indoc! {r#"
        query {
          slow
          fast
        }
    "#};

    let log = Arc::new(Log::default());
    let response = execute(&Engine::new(schema()), request(query).data(log.clone())).await;
    assert_eq!(response, json!({ "data": { "slow": "slow", "fast": "fast" } }));
    assert_eq!(log.entries(), vec!["start slow", "start fast", "end fast", "end slow"]);

    let engine = Engine::new(schema()).with_config(ExecutionConfig {
        max_concurrent_resolvers: NonZeroUsize::new(1),
        ..Default::default()
    });
    let log = Arc::new(Log::default());
    let response = execute(&engine, request(query).data(log.clone())).await;
    // Completion stays in selection order whatever the resolution order.
    assert_eq!(response, json!({ "data": { "slow": "slow", "fast": "fast" } }));
    assert_eq!(log.entries(), vec!["start slow", "end slow", "start fast", "end fast"]);
}
