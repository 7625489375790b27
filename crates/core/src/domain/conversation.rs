use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub String);

/// Who authored a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(DomainError::InvalidTurnRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted message of a user's conversation. Written once, never updated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub user_id: String,
    pub role: TurnRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn as_history_entry(&self) -> HistoryEntry {
        HistoryEntry { role: self.role, text: self.text.clone() }
    }
}

/// Wire form of a turn as forwarded to the intent resolver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: TurnRole,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{ConversationTurn, TurnId, TurnRole};
    use crate::errors::DomainError;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!(TurnRole::parse("User").expect("user"), TurnRole::User);
        assert_eq!(TurnRole::parse(" assistant ").expect("assistant"), TurnRole::Assistant);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let error = TurnRole::parse("serqet").expect_err("unknown role");
        assert_eq!(error, DomainError::InvalidTurnRole("serqet".to_string()));
    }

    #[test]
    fn history_entry_serializes_role_as_lowercase() {
        let turn = ConversationTurn {
            id: TurnId("T-1".to_string()),
            user_id: "u-1".to_string(),
            role: TurnRole::Assistant,
            text: "Task created.".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(turn.as_history_entry()).expect("serialize");
        assert_eq!(json, serde_json::json!({ "role": "assistant", "text": "Task created." }));
    }
}
