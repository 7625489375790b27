use chrono::Utc;
use sqlx::Row;

use serqet_core::domain::records::{NewSocialDraft, SocialDraft, SocialDraftId, SOCIAL_STATUS_DRAFT};

use super::{
    decode_err, decode_timestamp, encode_timestamp, new_record_id, RepositoryError,
    SocialDraftRepository,
};
use crate::DbPool;

pub struct SqlSocialDraftRepository {
    pool: DbPool,
}

impl SqlSocialDraftRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_draft(row: &sqlx::sqlite::SqliteRow) -> Result<SocialDraft, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let content: String = row.try_get("content").map_err(decode_err)?;
    let platform: String = row.try_get("platform").map_err(decode_err)?;
    let status: String = row.try_get("status").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    Ok(SocialDraft {
        id: SocialDraftId(id),
        content,
        platform,
        status,
        created_at: decode_timestamp(&created_at)?,
    })
}

#[async_trait::async_trait]
impl SocialDraftRepository for SqlSocialDraftRepository {
    async fn create(&self, draft: NewSocialDraft) -> Result<SocialDraft, RepositoryError> {
        let record = SocialDraft {
            id: SocialDraftId(new_record_id()),
            content: draft.content,
            platform: draft.platform,
            status: SOCIAL_STATUS_DRAFT.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO social_draft (id, content, platform, status, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(&record.content)
        .bind(&record.platform)
        .bind(&record.status)
        .bind(encode_timestamp(&record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list(&self) -> Result<Vec<SocialDraft>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, content, platform, status, created_at
             FROM social_draft
             ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_draft).collect()
    }
}

#[cfg(test)]
mod tests {
    use serqet_core::domain::records::NewSocialDraft;

    use crate::repositories::{SocialDraftRepository, SqlSocialDraftRepository};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn drafts_are_created_with_draft_status_and_listed_newest_first() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlSocialDraftRepository::new(pool);

        let first = repo
            .create(NewSocialDraft { content: "Shipping day".to_string(), platform: "x".to_string() })
            .await
            .expect("create");
        let second = repo
            .create(NewSocialDraft {
                content: "Hiring!".to_string(),
                platform: "linkedin".to_string(),
            })
            .await
            .expect("create");

        assert_eq!(first.status, "draft");
        assert_eq!(repo.list().await.expect("list"), vec![second, first]);
    }
}
