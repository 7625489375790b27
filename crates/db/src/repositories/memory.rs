use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use serqet_core::domain::conversation::{ConversationTurn, TurnId, TurnRole};
use serqet_core::domain::records::{
    ExpenseId, ExpenseRecord, JobApplication, JobApplicationId, NewExpense, NewJobApplication,
    NewSocialDraft, NewTask, SocialDraft, SocialDraftId, TaskId, TaskRecord, SOCIAL_STATUS_DRAFT,
    TASK_STATUS_PENDING,
};

use super::{
    checked_total, new_record_id, ConversationRepository, ExpenseRepository,
    JobApplicationRepository, RepositoryError, SocialDraftRepository, TaskRepository,
};

/// Turns kept in insertion order.
#[derive(Default)]
pub struct InMemoryConversationRepository {
    turns: RwLock<Vec<ConversationTurn>>,
}

impl InMemoryConversationRepository {
    pub async fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.read().await.clone()
    }
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
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
        self.turns.write().await.push(turn.clone());
        Ok(turn)
    }

    async fn recent(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ConversationTurn>, RepositoryError> {
        let turns = self.turns.read().await;
        Ok(turns
            .iter()
            .rev()
            .filter(|turn| turn.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn latest(&self, limit: u32) -> Result<Vec<ConversationTurn>, RepositoryError> {
        let turns = self.turns.read().await;
        let skip = turns.len().saturating_sub(limit as usize);
        Ok(turns.iter().skip(skip).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryExpenseRepository {
    records: RwLock<Vec<ExpenseRecord>>,
}

#[async_trait::async_trait]
impl ExpenseRepository for InMemoryExpenseRepository {
    async fn create(&self, expense: NewExpense) -> Result<ExpenseRecord, RepositoryError> {
        let record = ExpenseRecord {
            id: ExpenseId(new_record_id()),
            amount: expense.amount,
            category: expense.category,
            description: expense.description,
            created_at: Utc::now(),
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<ExpenseRecord>, RepositoryError> {
        Ok(self.records.read().await.iter().rev().cloned().collect())
    }

    async fn total(&self) -> Result<Decimal, RepositoryError> {
        checked_total(self.records.read().await.iter().map(|record| record.amount))
    }
}

#[derive(Default)]
pub struct InMemoryTaskRepository {
    records: RwLock<Vec<TaskRecord>>,
}

#[async_trait::async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: NewTask) -> Result<TaskRecord, RepositoryError> {
        let record = TaskRecord {
            id: TaskId(new_record_id()),
            title: task.title,
            status: TASK_STATUS_PENDING.to_string(),
            due_date: task.due_date,
            created_at: Utc::now(),
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<TaskRecord>, RepositoryError> {
        let mut records: Vec<_> = self.records.read().await.iter().rev().cloned().collect();
        // Stable sort keeps newest-first inside each status.
        records.sort_by(|a, b| b.status.cmp(&a.status));
        Ok(records)
    }
}

#[derive(Default)]
pub struct InMemorySocialDraftRepository {
    records: RwLock<Vec<SocialDraft>>,
}

#[async_trait::async_trait]
impl SocialDraftRepository for InMemorySocialDraftRepository {
    async fn create(&self, draft: NewSocialDraft) -> Result<SocialDraft, RepositoryError> {
        let record = SocialDraft {
            id: SocialDraftId(new_record_id()),
            content: draft.content,
            platform: draft.platform,
            status: SOCIAL_STATUS_DRAFT.to_string(),
            created_at: Utc::now(),
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<SocialDraft>, RepositoryError> {
        Ok(self.records.read().await.iter().rev().cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryJobApplicationRepository {
    records: RwLock<Vec<JobApplication>>,
}

#[async_trait::async_trait]
impl JobApplicationRepository for InMemoryJobApplicationRepository {
    async fn create(
        &self,
        application: NewJobApplication,
    ) -> Result<JobApplication, RepositoryError> {
        let record = JobApplication {
            id: JobApplicationId(new_record_id()),
            company: application.company,
            role: application.role,
            status: application.status,
            link: application.link,
            salary_range: application.salary_range,
            created_at: Utc::now(),
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<JobApplication>, RepositoryError> {
        Ok(self.records.read().await.iter().rev().cloned().collect())
    }
}
