use engine::{ArgumentDefinition, Engine, ErrorCode, FieldDefinition, ObjectType, Request, Resolved, Schema};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::{execute, request};

fn engine() -> Engine {
    let query = ObjectType::new("Query")
        .field(FieldDefinition::new("hello", "String").resolver(|_| Ok(Resolved::value("world"))))
        .field(
            FieldDefinition::new("greet", "String!")
                .argument(ArgumentDefinition::new("name", "String").default_value("stranger"))
                .resolver(|ctx| {
                    let name: String = ctx.argument_as("name")?;
                    Ok(Resolved::value(format!("Hello, {name}")))
                }),
        )
        .field(
            FieldDefinition::new("user", "User")
                .argument(ArgumentDefinition::new("id", "ID!"))
                .resolver(|ctx| {
                    let id: String = ctx.argument_as("id")?;
                    Ok(Resolved::value(json!({ "id": id, "name": format!("User {id}") })))
                }),
        )
        .field(FieldDefinition::new("motd", "String"));

    let user = ObjectType::new("User")
        .field(FieldDefinition::new("id", "ID!"))
        .field(FieldDefinition::new("name", "String!"));

    Engine::new(Schema::build(query).object(user).finish().unwrap())
}

#[tokio::test]
async fn fields_aliases_and_typename() {
    let response = execute(
        &engine(),
        request(indoc! {r#"
            query {
              hello
              alias: hello
              __typename
              user(id: "1") {
                id
                name
                __typename
              }
            }
        "#}),
    )
    .await;

    insta::assert_json_snapshot!(response, @r###"
    {
      "data": {
        "hello": "world",
        "alias": "world",
        "__typename": "Query",
        "user": {
          "id": "1",
          "name": "User 1",
          "__typename": "User"
        }
      }
    }
    "###);
}

#[tokio::test]
async fn arguments_use_variables_and_defaults() {
    let query = indoc! {r#"
        query Greet($name: String) {
          default: greet
          named: greet(name: "Ada")
          fromVariable: greet(name: $name)
        }
    "#};

    let response = execute(&engine(), request(query).variable("name", "Grace")).await;
    insta::assert_json_snapshot!(response, @r###"
    {
      "data": {
        "default": "Hello, stranger",
        "named": "Hello, Ada",
        "fromVariable": "Hello, Grace"
      }
    }
    "###);

    // An argument bound to a missing variable falls back to its default.
    let response = execute(&engine(), request(query)).await;
    assert_eq!(response["data"]["fromVariable"], json!("Hello, stranger"));
}

#[tokio::test]
async fn fragments_and_conditional_fields() {
    let query = indoc! {r#"
        query ($withName: Boolean!) {
          user(id: "1") {
            ...UserId
            ... on User {
              id
            }
            name @include(if: $withName)
            skipped: id @skip(if: true)
          }
        }

        fragment UserId on User {
          id
        }
    "#};

    let response = execute(&engine(), request(query).variable("withName", false)).await;
    assert_eq!(response, json!({ "data": { "user": { "id": "1" } } }));

    let response = execute(&engine(), request(query).variable("withName", true)).await;
    assert_eq!(response, json!({ "data": { "user": { "id": "1", "name": "User 1" } } }));
}

#[tokio::test]
async fn default_resolver_reads_the_parent_value() {
    let response = execute(&engine(), request("{ motd }").root_value(json!({ "motd": "Welcome" }))).await;
    assert_eq!(response, json!({ "data": { "motd": "Welcome" } }));

    let response = execute(&engine(), request("{ motd }")).await;
    assert_eq!(response, json!({ "data": { "motd": null } }));
}

#[tokio::test]
async fn unknown_fields_are_reported() {
    let response = execute(&engine(), request("{ hello nope }")).await;

    insta::assert_json_snapshot!(response, @r###"
    {
      "data": {
        "hello": "world"
      },
      "errors": [
        {
          "message": "Cannot query field `nope` on type `Query`",
          "locations": [
            {
              "line": 1,
              "column": 9
            }
          ],
          "path": [
            "nope"
          ],
          "extensions": {
            "code": "FIELD_COLLECTION_ERROR"
          }
        }
      ]
    }
    "###);
}

#[tokio::test]
async fn unknown_type_conditions_are_reported() {
    let query = indoc! {r#"
        query {
          user(id: "1") {
            ... on Unknown {
              name
            }
            id
          }
        }
    "#};

    let response = execute(&engine(), request(query)).await;
    assert_eq!(response["data"], json!({ "user": { "id": "1" } }));
    assert_eq!(
        response["errors"][0]["message"],
        json!("Unknown type `Unknown` in type condition")
    );
    assert_eq!(response["errors"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn operation_selection() {
    let query = "query A { hello } query B { greet }";

    let response = execute(&engine(), request(query)).await;
    insta::assert_json_snapshot!(response, @r###"
    {
      "errors": [
        {
          "message": "Must provide operation name if query contains multiple operations",
          "extensions": {
            "code": "OPERATION_VALIDATION_ERROR"
          }
        }
      ]
    }
    "###);

    let response = execute(&engine(), request(query).operation_name("B")).await;
    assert_eq!(response, json!({ "data": { "greet": "Hello, stranger" } }));

    let response = execute(&engine(), request(query).operation_name("C")).await;
    assert_eq!(response["errors"][0]["message"], json!("Unknown operation named 'C'"));
}

#[tokio::test]
async fn request_errors_produce_no_data() {
    let response = engine()
        .execute(request("query ($id: ID!) { user(id: $id) { id } }"))
        .await;
    assert_eq!(response.data, None);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].code, ErrorCode::VariableError);
    assert_eq!(
        response.errors[0].message,
        "Variable `$id` of required type `ID!` was not provided"
    );

    let response = engine().execute(request("mutation { hello }")).await;
    assert_eq!(response.data, None);
    assert_eq!(
        response.errors[0].message,
        "The schema does not support mutation operations"
    );

    let error = Request::parse("{ hello").unwrap_err();
    assert_eq!(error.code, ErrorCode::OperationParsingError);
}
