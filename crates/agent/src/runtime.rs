use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use serqet_core::domain::conversation::TurnRole;
use serqet_core::errors::{ApplicationError, DomainError};
use serqet_db::repositories::ConversationRepository;

use crate::brain::{IntentClient, IntentClientError};
use crate::conversation::{load_context, record_turn};
use crate::tools::ToolDispatcher;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Upstream(#[from] IntentClientError),
}

impl From<AgentError> for ApplicationError {
    fn from(value: AgentError) -> Self {
        match value {
            AgentError::InvalidRequest(message) => {
                ApplicationError::Domain(DomainError::InvariantViolation(message))
            }
            AgentError::Upstream(error) => ApplicationError::Upstream(error.to_string()),
        }
    }
}

/// Final answer for one query.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AgentReply {
    pub message: String,
    pub action: Option<String>,
    pub data: Option<Map<String, Value>>,
}

pub struct AgentRuntime {
    history: Arc<dyn ConversationRepository>,
    intent_client: Arc<dyn IntentClient>,
    dispatcher: ToolDispatcher,
    history_limit: u32,
}

impl AgentRuntime {
    pub fn new(
        history: Arc<dyn ConversationRepository>,
        intent_client: Arc<dyn IntentClient>,
        dispatcher: ToolDispatcher,
        history_limit: u32,
    ) -> Self {
        Self { history, intent_client, dispatcher, history_limit: history_limit.max(1) }
    }

    pub fn history_limit(&self) -> u32 {
        self.history_limit
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub fn history(&self) -> &Arc<dyn ConversationRepository> {
        &self.history
    }

    /// Runs one query through context load, intent resolution, turn recording
    /// and tool dispatch. Every log event carries `correlation_id`.
    ///
    /// Only a resolver failure fails the call, and in that case nothing is
    /// written. History and dispatch failures are logged and the resolver's
    /// own reply is returned.
    pub async fn handle_query(
        &self,
        correlation_id: &str,
        user_id: &str,
        query: &str,
    ) -> Result<AgentReply, AgentError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AgentError::InvalidRequest("user_id must not be blank".to_string()));
        }
        if query.trim().is_empty() {
            return Err(AgentError::InvalidRequest("query must not be blank".to_string()));
        }

        let history = self.history.as_ref();

        let context = match load_context(history, user_id, self.history_limit).await {
            Ok(context) => context,
            Err(error) => {
                warn!(
                    event_name = "agent.history.read_failed",
                    correlation_id = %correlation_id,
                    user_id,
                    error = %error,
                    "continuing without conversation context"
                );
                Vec::new()
            }
        };

        let intent = match self.intent_client.resolve(user_id, query, &context).await {
            Ok(intent) => intent,
            Err(failure) => {
                error!(
                    event_name = "agent.brain.resolve_failed",
                    correlation_id = %correlation_id,
                    user_id,
                    error = %failure,
                    "intent resolver failed; request aborted"
                );
                return Err(AgentError::Upstream(failure));
            }
        };

        record_turn(history, correlation_id, user_id, TurnRole::User, query).await;

        let mut reply = AgentReply {
            message: intent.message.clone(),
            action: intent.action().map(str::to_string),
            data: intent.data,
        };

        if let Some(action) = reply.action.clone() {
            match self.dispatcher.dispatch(&action, reply.data.as_ref()).await {
                Ok(Some(outcome)) => {
                    reply.message = outcome.message;
                    reply.action = Some(outcome.next_action);
                }
                Ok(None) => {
                    debug!(
                        event_name = "agent.tools.action_passthrough",
                        correlation_id = %correlation_id,
                        action = %action,
                        "action not handled locally"
                    );
                }
                Err(error) => {
                    warn!(
                        event_name = "agent.tools.dispatch_failed",
                        correlation_id = %correlation_id,
                        action = %action,
                        error = %error,
                        "keeping resolver reply"
                    );
                }
            }
        }

        record_turn(history, correlation_id, user_id, TurnRole::Assistant, &reply.message).await;

        info!(
            event_name = "agent.query.completed",
            correlation_id = %correlation_id,
            user_id,
            context_turns = context.len(),
            action = reply.action.as_deref().unwrap_or(""),
            "query handled"
        );
        Ok(reply)
    }
}
