//! Error types for the binding layer.
//!
//! The engine itself almost never fails: missing bindings are created and
//! sentinel payloads are ignored. Errors only arise at the boundary where
//! JSON payloads meet typed reactive cells.

use thiserror::Error;

use crate::reactive::VariableId;

/// Errors raised while moving values between view payloads and variables.
#[derive(Debug, Error)]
pub enum BindError {
    /// A variable's value could not be encoded as a view payload.
    #[error("failed to encode value of variable {variable}: {source}")]
    Encode {
        variable: VariableId,
        #[source]
        source: serde_json::Error,
    },

    /// A view payload could not be decoded into the variable's value type.
    #[error("failed to decode payload for variable {variable}: {source}")]
    Decode {
        variable: VariableId,
        #[source]
        source: serde_json::Error,
    },

    /// Public set on a computed variable that has no inverse.
    #[error("variable {0} is read-only")]
    ReadOnly(VariableId),

    /// Inbound event text that is not a valid view event.
    #[error("malformed view event: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BindError>;
