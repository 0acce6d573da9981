mod code;
mod path;

pub use code::*;
pub use path::*;
use serde::ser::SerializeMap;
use std::borrow::Cow;

pub type GraphqlResult<T> = Result<T, GraphqlError>;

/// Position within the executable document, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Location { line, column }
    }
}

#[derive(Debug, Clone)]
pub struct GraphqlError {
    pub message: Cow<'static, str>,
    pub code: ErrorCode,
    pub locations: Vec<Location>,
    pub path: Option<ErrorPath>,
    // Serialized as a map, but kept as a Vec for efficiency.
    pub extensions: Vec<(Cow<'static, str>, serde_json::Value)>,
}

impl GraphqlError {
    pub fn new(message: impl Into<Cow<'static, str>>, code: ErrorCode) -> Self {
        GraphqlError {
            message: message.into(),
            code,
            locations: Vec::new(),
            path: None,
            extensions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    #[must_use]
    pub fn with_locations(mut self, locations: impl IntoIterator<Item = Location>) -> Self {
        self.locations.extend(locations);
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<ErrorPath>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<Cow<'static, str>>, value: impl Into<serde_json::Value>) -> Self {
        let key = key.into();
        self.extensions.push((key, value.into()));
        self
    }

    // ------------- //
    // Common errors //
    // ------------- //

    pub fn non_null_violation() -> Self {
        GraphqlError::new("Cannot return null for non-nullable field", ErrorCode::NonNullViolation)
    }

    pub fn null_list_item() -> Self {
        GraphqlError::new("The list does not allow null elements", ErrorCode::NonNullViolation)
    }

    pub fn masked_serialization_error() -> Self {
        GraphqlError::new("Undefined field serialization error", ErrorCode::SerializationError)
    }

    pub fn operation_cancelled() -> Self {
        GraphqlError::new("The operation was cancelled", ErrorCode::OperationCancelled)
    }

    pub fn operation_timeout() -> Self {
        GraphqlError::new("The operation timed out", ErrorCode::OperationTimeout)
    }

    pub fn internal_server_error() -> Self {
        GraphqlError::new("Internal server error", ErrorCode::InternalServerError)
    }
}

impl std::fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.message.fmt(f)
    }
}

impl std::error::Error for GraphqlError {}

impl serde::Serialize for GraphqlError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("message", &self.message)?;
        if !self.locations.is_empty() {
            map.serialize_entry("locations", &self.locations)?;
        }
        if let Some(path) = &self.path {
            map.serialize_entry("path", path)?;
        }
        map.serialize_entry("extensions", &Extensions(self))?;
        map.end()
    }
}

struct Extensions<'a>(&'a GraphqlError);

impl serde::Serialize for Extensions<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.0.extensions {
            if *key != "code" {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry("code", &self.0.code)?;
        map.end()
    }
}
