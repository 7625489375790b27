use chrono::Utc;
use sqlx::Row;

use serqet_core::domain::conversation::{ConversationTurn, TurnId, TurnRole};

use super::{
    decode_err, decode_timestamp, encode_timestamp, new_record_id, ConversationRepository,
    RepositoryError,
};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> Result<ConversationTurn, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let user_id: String = row.try_get("user_id").map_err(decode_err)?;
    let role: String = row.try_get("role").map_err(decode_err)?;
    let text: String = row.try_get("text").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    Ok(ConversationTurn {
        id: TurnId(id),
        user_id,
        role: TurnRole::parse(&role).map_err(|e| RepositoryError::Decode(e.to_string()))?,
        text,
        created_at: decode_timestamp(&created_at)?,
    })
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn append(
        &self,
        user_id: &str,
        role: TurnRole,
        text: &str,
    ) -> Result<ConversationTurn, RepositoryError> {
        let turn = ConversationTurn {
            id: TurnId(new_record_id()),
            user_id: user_id.to_string(),
            role,
            text: text.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO conversation_turn (id, user_id, role, text, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&turn.id.0)
        .bind(&turn.user_id)
        .bind(turn.role.as_str())
        .bind(&turn.text)
        .bind(encode_timestamp(&turn.created_at))
        .execute(&self.pool)
        .await?;

        Ok(turn)
    }

    async fn recent(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ConversationTurn>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, role, text, created_at
             FROM conversation_turn
             WHERE user_id = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_turn).collect()
    }

    async fn latest(&self, limit: u32) -> Result<Vec<ConversationTurn>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, role, text, created_at FROM (
                 SELECT rowid AS seq, id, user_id, role, text, created_at
                 FROM conversation_turn
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?
             ) ORDER BY created_at ASC, seq ASC",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_turn).collect()
    }
}
