use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::conversation::HistoryEntry;

/// Body sent to the intent resolver. `history` reads oldest-first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRequest {
    pub user_id: String,
    pub query: String,
    pub history: Vec<HistoryEntry>,
}

/// Structured interpretation of a query as returned by the resolver.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentResponse {
    pub message: String,
    pub action: Option<String>,
    pub data: Option<Map<String, Value>>,
}

impl IntentResponse {
    pub fn message(message: impl Into<String>) -> Self {
        Self { message: message.into(), action: None, data: None }
    }

    /// Decodes a resolver payload field by field. Anything other than a JSON
    /// object yields `None`; inside an object, missing or mistyped fields fall
    /// back to an empty message, no action, and no data. A non-blank action is
    /// kept verbatim.
    pub fn from_loose_value(value: Value) -> Option<Self> {
        let Value::Object(mut object) = value else {
            return None;
        };

        let message = match object.remove("message") {
            Some(Value::String(message)) => message,
            _ => String::new(),
        };
        let action = match object.remove("action") {
            Some(Value::String(action)) if !action.trim().is_empty() => Some(action),
            _ => None,
        };
        let data = match object.remove("data") {
            Some(Value::Object(data)) => Some(data),
            _ => None,
        };

        Some(Self { message, action, data })
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref().filter(|action| !action.is_empty())
    }
}
