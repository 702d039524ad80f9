//! Registry configuration.

use serde::Deserialize;

fn default_attribute() -> String {
    "value".to_string()
}

fn default_initial_capacity() -> usize {
    64
}

/// Settings for a [`BindingRegistry`](crate::binding::BindingRegistry).
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryConfig {
    /// Attribute name used when a widget does not name one.
    #[serde(default = "default_attribute")]
    pub default_attribute: String,

    /// Pre-allocated slots in the registry map.
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
}

impl RegistryConfig {
    /// Parse a config from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_attribute: default_attribute(),
            initial_capacity: default_initial_capacity(),
        }
    }
}
