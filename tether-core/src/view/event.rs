//! Inbound widget events.
//!
//! A live widget reports user interaction as small JSON objects tagged by
//! `type`:
//!
//! ```json
//! {"type": "change", "value": 0.7}
//! {"type": "bang"}
//! {"type": "close"}
//! ```

use serde::{Deserialize, Serialize};

use crate::binding::Value;
use crate::error::Result;

/// One event sent by a live widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ViewEvent {
    /// The user changed the widget's value. `None` and JSON `null` are the
    /// "no data" sentinel.
    Change {
        #[serde(default)]
        value: Option<Value>,
    },

    /// The user triggered a pulse widget.
    Bang,

    /// The widget's live view went away.
    Close,
}

impl ViewEvent {
    /// Parse an event from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn change(value: impl Into<Value>) -> Self {
        Self::Change {
            value: Some(value.into()),
        }
    }

    /// The carried value, if this is a change with real data.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Change { value: Some(value) } if !value.is_null() => Some(value),
            _ => None,
        }
    }
}

/// What handling an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The variable's public setter was called.
    Applied,
    /// The pulse variable fired.
    Fired,
    /// Nothing happened.
    Ignored,
    /// The handle was detached.
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_each_kind() {
        assert_eq!(
            ViewEvent::from_json(r#"{"type":"change","value":0.7}"#).unwrap(),
            ViewEvent::change(0.7)
        );
        assert_eq!(ViewEvent::from_json(r#"{"type":"bang"}"#).unwrap(), ViewEvent::Bang);
        assert_eq!(ViewEvent::from_json(r#"{"type":"close"}"#).unwrap(), ViewEvent::Close);
    }

    #[test]
    fn null_and_missing_values_have_no_payload() {
        let missing = ViewEvent::from_json(r#"{"type":"change"}"#).unwrap();
        let null = ViewEvent::from_json(r#"{"type":"change","value":null}"#).unwrap();
        assert_eq!(missing.payload(), None);
        assert_eq!(null.payload(), None);
        assert_eq!(ViewEvent::change(json!([1, 2])).payload(), Some(&json!([1, 2])));
    }

    #[test]
    fn rejects_unknown_or_broken_events() {
        assert!(ViewEvent::from_json(r#"{"type":"drag"}"#).is_err());
        assert!(ViewEvent::from_json("not json").is_err());
        assert!(ViewEvent::from_json(r#"{"value":1}"#).is_err());
    }

    #[test]
    fn serializes_with_type_tag() {
        let text = serde_json::to_string(&ViewEvent::Bang).unwrap();
        assert_eq!(text, r#"{"type":"bang"}"#);
    }
}
