use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use serqet_core::domain::conversation::{ConversationTurn, TurnRole};
use serqet_core::domain::records::{
    ExpenseRecord, JobApplication, NewExpense, NewJobApplication, NewSocialDraft, NewTask,
    SocialDraft, TaskRecord,
};

pub mod conversation;
pub mod expense;
pub mod job;
pub mod memory;
pub mod social;
pub mod task;

pub use conversation::SqlConversationRepository;
pub use expense::SqlExpenseRepository;
pub use job::SqlJobApplicationRepository;
pub use memory::{
    InMemoryConversationRepository, InMemoryExpenseRepository, InMemoryJobApplicationRepository,
    InMemorySocialDraftRepository, InMemoryTaskRepository,
};
pub use social::SqlSocialDraftRepository;
pub use task::SqlTaskRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("arithmetic overflow: {0}")]
    Overflow(String),
}

/// Ordered log of conversation turns per user.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn append(
        &self,
        user_id: &str,
        role: TurnRole,
        text: &str,
    ) -> Result<ConversationTurn, RepositoryError>;

    /// At most `limit` turns for `user_id`, newest first.
    async fn recent(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ConversationTurn>, RepositoryError>;

    /// The latest `limit` turns across all users, oldest first.
    async fn latest(&self, limit: u32) -> Result<Vec<ConversationTurn>, RepositoryError>;
}

#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn create(&self, expense: NewExpense) -> Result<ExpenseRecord, RepositoryError>;
    async fn list(&self) -> Result<Vec<ExpenseRecord>, RepositoryError>;
    async fn total(&self) -> Result<Decimal, RepositoryError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: NewTask) -> Result<TaskRecord, RepositoryError>;
    async fn list(&self) -> Result<Vec<TaskRecord>, RepositoryError>;
}

#[async_trait]
pub trait SocialDraftRepository: Send + Sync {
    async fn create(&self, draft: NewSocialDraft) -> Result<SocialDraft, RepositoryError>;
    async fn list(&self) -> Result<Vec<SocialDraft>, RepositoryError>;
}

#[async_trait]
pub trait JobApplicationRepository: Send + Sync {
    async fn create(
        &self,
        application: NewJobApplication,
    ) -> Result<JobApplication, RepositoryError>;
    async fn list(&self) -> Result<Vec<JobApplication>, RepositoryError>;
}

pub(crate) fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Fixed-width RFC 3339 so that text ordering in SQLite matches time ordering.
pub(crate) fn encode_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {e}")))
}

/// Sum of expense amounts, or `Overflow` once it leaves the `Decimal` range.
pub(crate) fn checked_total(
    amounts: impl IntoIterator<Item = Decimal>,
) -> Result<Decimal, RepositoryError> {
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| {
        total.checked_add(amount).ok_or_else(|| {
            RepositoryError::Overflow(format!("expense total exceeds {}", Decimal::MAX))
        })
    })
}

pub(crate) fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
