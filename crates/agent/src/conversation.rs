use serqet_core::domain::conversation::{ConversationTurn, HistoryEntry, TurnRole};
use serqet_db::repositories::{ConversationRepository, RepositoryError};
use tracing::warn;

/// Loads at most `limit` turns for `user_id` and returns them oldest-first.
pub async fn load_context(
    history: &dyn ConversationRepository,
    user_id: &str,
    limit: u32,
) -> Result<Vec<HistoryEntry>, RepositoryError> {
    let turns = history.recent(user_id, limit).await?;
    Ok(chronological(turns))
}

/// Orders turns by creation time regardless of the order the store returned
/// them in. Turns with equal timestamps keep their newest-first store order
/// reversed, which is insertion order.
pub fn oldest_first(mut turns: Vec<ConversationTurn>) -> Vec<ConversationTurn> {
    turns.reverse();
    turns.sort_by_key(|turn| turn.created_at);
    turns
}

pub fn chronological(turns: Vec<ConversationTurn>) -> Vec<HistoryEntry> {
    oldest_first(turns).iter().map(ConversationTurn::as_history_entry).collect()
}

/// Appends one turn. A storage failure is logged and reported as `false`.
pub async fn record_turn(
    history: &dyn ConversationRepository,
    correlation_id: &str,
    user_id: &str,
    role: TurnRole,
    text: &str,
) -> bool {
    match history.append(user_id, role, text).await {
        Ok(_) => true,
        Err(error) => {
            warn!(
                event_name = "agent.history.append_failed",
                correlation_id,
                user_id,
                role = role.as_str(),
                error = %error,
                "conversation turn was not persisted"
            );
            false
        }
    }
}
