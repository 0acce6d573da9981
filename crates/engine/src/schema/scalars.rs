use serde_json::{Number, Value};

/// Failure of a leaf value serialization.
///
/// `InvalidValue` is the expected failure mode, the value doesn't fit the scalar, and its message
/// is shown to the client. Anything else is reported as `Other` and its details stay server side.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("{0}")]
    InvalidValue(String),
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl SerializeError {
    pub fn invalid_value(message: impl Into<String>) -> Self {
        SerializeError::InvalidValue(message.into())
    }

    pub fn other(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        SerializeError::Other(error.into())
    }
}

/// Converts a resolved value into its result representation.
pub trait ScalarSerializer: Send + Sync {
    fn serialize(&self, value: Value) -> Result<Value, SerializeError>;
}

impl<F> ScalarSerializer for F
where
    F: Fn(Value) -> Result<Value, SerializeError> + Send + Sync,
{
    fn serialize(&self, value: Value) -> Result<Value, SerializeError> {
        self(value)
    }
}

pub struct IntScalar;

impl ScalarSerializer for IntScalar {
    fn serialize(&self, value: Value) -> Result<Value, SerializeError> {
        let number = match &value {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.is_finite()).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        let Some(number) = number else {
            return Err(SerializeError::invalid_value(format!(
                "Int cannot represent non-integer value: {value}"
            )));
        };
        i32::try_from(number)
            .map(|n| Value::Number(n.into()))
            .map_err(|_| SerializeError::invalid_value(format!("Int cannot represent non 32-bit signed integer value: {value}")))
    }
}

pub struct FloatScalar;

impl ScalarSerializer for FloatScalar {
    fn serialize(&self, value: Value) -> Result<Value, SerializeError> {
        if value.is_number() {
            return Ok(value);
        }
        let number = match &value {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        number
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| SerializeError::invalid_value(format!("Float cannot represent non numeric value: {value}")))
    }
}

pub struct StringScalar;

impl ScalarSerializer for StringScalar {
    fn serialize(&self, value: Value) -> Result<Value, SerializeError> {
        match value {
            Value::String(_) => Ok(value),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            other => Err(SerializeError::invalid_value(format!(
                "String cannot represent value: {other}"
            ))),
        }
    }
}

pub struct BooleanScalar;

impl ScalarSerializer for BooleanScalar {
    fn serialize(&self, value: Value) -> Result<Value, SerializeError> {
        match value {
            Value::Bool(_) => Ok(value),
            Value::Number(n) if n.as_f64().is_some_and(f64::is_finite) => {
                Ok(Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)))
            }
            value => Err(SerializeError::invalid_value(format!(
                "Boolean cannot represent a non boolean value: {value}"
            ))),
        }
    }
}

pub struct IdScalar;

impl ScalarSerializer for IdScalar {
    fn serialize(&self, value: Value) -> Result<Value, SerializeError> {
        match value {
            Value::String(_) => Ok(value),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::String(n.to_string())),
            other => Err(SerializeError::invalid_value(format!("ID cannot represent value: {other}"))),
        }
    }
}
