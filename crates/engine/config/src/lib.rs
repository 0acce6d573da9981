use std::{num::NonZeroUsize, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid execution configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Tunables of the execution engine, shared by every operation executed with it.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Deadline for a whole operation. Resolvers still pending when it elapses are abandoned
    /// and the partial result is returned.
    #[serde(deserialize_with = "duration_str::deserialize_option_duration")]
    pub timeout: Option<Duration>,
    /// How many resolver futures of a single batch may be awaited at the same time.
    /// Unbounded by default.
    pub max_concurrent_resolvers: Option<NonZeroUsize>,
    /// Upper bound on the number of batches, in other words the depth of the response.
    pub max_batches: Option<NonZeroUsize>,
    /// Whether root fields of a mutation are executed one after the other.
    pub serial_mutations: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            max_concurrent_resolvers: None,
            max_batches: None,
            serial_mutations: true,
        }
    }
}

impl ExecutionConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}
