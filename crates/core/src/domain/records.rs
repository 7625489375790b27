//! Records written by tool calls. Each kind is stored independently and has no
//! identity shared with the others.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const TASK_STATUS_PENDING: &str = "Pending";
pub const SOCIAL_STATUS_DRAFT: &str = "draft";
pub const JOB_STATUS_APPLIED: &str = "Applied";
pub const SALARY_RANGE_UNSPECIFIED: &str = "Not specified";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpenseId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocialDraftId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobApplicationId(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: ExpenseId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub title: String,
    pub status: String,
    pub due_date: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialDraft {
    pub id: SocialDraftId,
    pub content: String,
    pub platform: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: JobApplicationId,
    pub company: String,
    pub role: String,
    pub status: String,
    pub link: String,
    pub salary_range: String,
    pub created_at: DateTime<Utc>,
}

/// Field set for a new expense; id and timestamp are assigned by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewExpense {
    pub amount: Decimal,
    pub category: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub due_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSocialDraft {
    pub content: String,
    pub platform: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewJobApplication {
    pub company: String,
    pub role: String,
    pub status: String,
    pub link: String,
    pub salary_range: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum DomainRecord {
    Expense(ExpenseRecord),
    Task(TaskRecord),
    SocialDraft(SocialDraft),
    JobApplication(JobApplication),
}

impl DomainRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Expense(_) => "expense",
            Self::Task(_) => "task",
            Self::SocialDraft(_) => "social_draft",
            Self::JobApplication(_) => "job_application",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Expense(record) => &record.id.0,
            Self::Task(record) => &record.id.0,
            Self::SocialDraft(record) => &record.id.0,
            Self::JobApplication(record) => &record.id.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{DomainRecord, ExpenseId, ExpenseRecord};

    #[test]
    fn expense_amount_serializes_as_number() {
        let record = ExpenseRecord {
            id: ExpenseId("E-1".to_string()),
            amount: Decimal::new(4250, 2),
            category: "food".to_string(),
            description: "lunch".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["amount"], serde_json::json!(42.5));
    }

    #[test]
    fn domain_record_reports_kind_and_id() {
        let record = DomainRecord::Expense(ExpenseRecord {
            id: ExpenseId("E-2".to_string()),
            amount: Decimal::ONE,
            category: "misc".to_string(),
            description: String::new(),
            created_at: Utc::now(),
        });

        assert_eq!(record.kind(), "expense");
        assert_eq!(record.id(), "E-2");
    }
}
