//! Registry keys.

use std::fmt;
use std::sync::Arc;

use crate::reactive::VariableId;

/// Composite key of one binding: variable identity plus attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
    variable: VariableId,
    attribute: Arc<str>,
}

impl BindingKey {
    pub fn new(variable: VariableId, attribute: &str) -> Self {
        Self {
            variable,
            attribute: Arc::from(attribute),
        }
    }

    pub fn variable(&self) -> VariableId {
        self.variable
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.variable, self.attribute)
    }
}
