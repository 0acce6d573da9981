use engine::{EnumType, Engine, FieldDefinition, ObjectType, Resolved, ScalarType, Schema, SerializeError};
use indoc::indoc;
use serde_json::{json, Value};

use super::{execute, request};

fn money(value: Value) -> Result<Value, SerializeError> {
    match value.as_f64() {
        Some(amount) => Ok(json!(format!("${amount:.2}"))),
        None => Err(SerializeError::other(format!("unexpected amount {value}"))),
    }
}

fn engine() -> Engine {
    let query = ObjectType::new("Query")
        .field(FieldDefinition::new("big", "Int").resolver(|_| Ok(Resolved::value(json!(1_099_511_627_776_i64)))))
        .field(FieldDefinition::new("price", "Money").resolver(|_| Ok(Resolved::value(4.5))))
        .field(FieldDefinition::new("money", "Money").resolver(|_| Ok(Resolved::value("oops"))))
        .field(FieldDefinition::new("color", "Color").resolver(|_| Ok(Resolved::value("PURPLE"))))
        .field(FieldDefinition::new("favorite", "Color!").resolver(|_| Ok(Resolved::value("RED"))));

    let schema = Schema::build(query)
        .scalar(ScalarType::new("Money", money))
        .enum_type(EnumType::new("Color", ["RED", "GREEN", "BLUE"]))
        .finish()
        .unwrap();
    Engine::new(schema)
}

#[tokio::test]
async fn serialization_failures_are_field_errors() {
    let response = execute(
        &engine(),
        request(indoc! {r#"
            query {
              big
              price
              money
              color
              favorite
            }
        "#}),
    )
    .await;

    // Unexpected failures of the custom scalar are masked.
    insta::assert_json_snapshot!(response, @r###"
    {
      "data": {
        "big": null,
        "price": "$4.50",
        "money": null,
        "color": null,
        "favorite": "RED"
      },
      "errors": [
        {
          "message": "Int cannot represent non 32-bit signed integer value: 1099511627776",
          "locations": [
            {
              "line": 2,
              "column": 3
            }
          ],
          "path": [
            "big"
          ],
          "extensions": {
            "code": "SERIALIZATION_ERROR"
          }
        },
        {
          "message": "Undefined field serialization error",
          "locations": [
            {
              "line": 4,
              "column": 3
            }
          ],
          "path": [
            "money"
          ],
          "extensions": {
            "code": "SERIALIZATION_ERROR"
          }
        },
        {
          "message": "Enum `Color` cannot represent value: \"PURPLE\"",
          "locations": [
            {
              "line": 5,
              "column": 3
            }
          ],
          "path": [
            "color"
          ],
          "extensions": {
            "code": "SERIALIZATION_ERROR"
          }
        }
      ]
    }
    "###);
}
