//! Configuration arguments declared by a destination and supplied by the host.
//!
//! A destination declares the arguments it understands through
//! [`SyncDestinationPlugin::config_arguments`](crate::SyncDestinationPlugin::config_arguments).
//! The host collects values for them and hands them over as a
//! [`DestinationConfig`], which the destination validates before connecting.

use crate::error::{DestinationError, DestinationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declaration of a single string-valued configuration argument.
///
/// ```rust
/// # use sync_destination_protocol::ConfigArgument;
/// let queue = ConfigArgument::new("queue")
///     .required()
///     .placeholder("{queue name}")
///     .description("The name of the queue to publish changes to.");
///
/// assert!(queue.required);
/// assert_eq!(queue.max_occurrences, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigArgument {
    pub name: String,
    pub required: bool,
    pub max_occurrences: usize,
    pub placeholder: String,
    pub description: String,
}

impl ConfigArgument {
    /// An optional argument accepting a single value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            max_occurrences: 1,
            placeholder: "{value}".to_string(),
            description: String::new(),
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn max_occurrences(mut self, max_occurrences: usize) -> Self {
        self.max_occurrences = max_occurrences;
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum ArgumentValues {
    One(String),
    Many(Vec<String>),
}

impl ArgumentValues {
    fn as_slice(&self) -> &[String] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }
}

/// Argument values supplied by the host, keyed by argument name.
///
/// Deserializes from either `{"queue": "name"}` or `{"queue": ["name"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationConfig {
    arguments: BTreeMap<String, ArgumentValues>,
}

impl DestinationConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single-valued argument, replacing any previous values.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments
            .insert(name.into(), ArgumentValues::One(value.into()));
        self
    }

    #[must_use]
    pub fn with_values<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.arguments
            .insert(name.into(), ArgumentValues::Many(values));
        self
    }

    /// All values supplied for `name`, empty when the argument is absent.
    #[must_use]
    pub fn values(&self, name: &str) -> &[String] {
        self.arguments
            .get(name)
            .map(ArgumentValues::as_slice)
            .unwrap_or_default()
    }

    /// The first value supplied for `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    /// The first value supplied for `name`, which must be present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::Configuration`] if the argument is missing or blank.
    pub fn required_value(&self, name: &str) -> DestinationResult<&str> {
        match self.value(name) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            Some(_) => Err(DestinationError::Configuration(format!(
                "argument '{name}' must not be empty"
            ))),
            None => Err(DestinationError::Configuration(format!(
                "missing required argument '{name}'"
            ))),
        }
    }

    /// Check the supplied values against the declared arguments.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::Configuration`] for unknown arguments, missing
    /// required arguments, blank values, or more values than an argument allows.
    pub fn validate(&self, declared: &[ConfigArgument]) -> DestinationResult<()> {
        if let Some(unknown) = self
            .arguments
            .keys()
            .find(|name| !declared.iter().any(|argument| &argument.name == *name))
        {
            return Err(DestinationError::Configuration(format!(
                "unknown argument '{unknown}'"
            )));
        }

        for argument in declared {
            let values = self.values(&argument.name);

            if values.is_empty() {
                if argument.required {
                    return Err(DestinationError::Configuration(format!(
                        "missing required argument '{}'",
                        argument.name
                    )));
                }
                continue;
            }

            if values.len() > argument.max_occurrences {
                return Err(DestinationError::Configuration(format!(
                    "argument '{}' accepts at most {} value(s), got {}",
                    argument.name,
                    argument.max_occurrences,
                    values.len()
                )));
            }

            if values.iter().any(|value| value.trim().is_empty()) {
                return Err(DestinationError::Configuration(format!(
                    "argument '{}' must not be empty",
                    argument.name
                )));
            }
        }

        Ok(())
    }
}
