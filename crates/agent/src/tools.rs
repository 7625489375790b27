use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::info;

use serqet_core::domain::records::{
    DomainRecord, NewExpense, NewJobApplication, NewSocialDraft, NewTask, JOB_STATUS_APPLIED,
    SALARY_RANGE_UNSPECIFIED,
};
use serqet_db::repositories::{
    ExpenseRepository, InMemoryExpenseRepository, InMemoryJobApplicationRepository,
    InMemorySocialDraftRepository, InMemoryTaskRepository, JobApplicationRepository,
    RepositoryError, SocialDraftRepository, TaskRepository,
};

const ACTION_PREFIX: &str = "execute_";

pub const RECORD_EXPENSE: &str = "record_expense";
pub const CREATE_SOCIAL_DRAFT: &str = "create_social_draft";
pub const CREATE_TASK: &str = "create_task";
pub const TRACK_JOB_APPLICATION: &str = "track_job_application";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("`{action}` rejected field `{field}`: {reason}")]
    Validation { action: &'static str, field: &'static str, reason: String },
    #[error("`{action}` could not be stored: {source}")]
    Storage {
        action: &'static str,
        #[source]
        source: RepositoryError,
    },
}

/// A resolver action decoded into its typed field set. Nothing is written
/// until a value of this type exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolCall {
    RecordExpense(NewExpense),
    CreateSocialDraft(NewSocialDraft),
    CreateTask(NewTask),
    TrackJobApplication(NewJobApplication),
}

impl ToolCall {
    /// Returns `Ok(None)` for actions outside the supported set.
    pub fn decode(
        action: &str,
        data: Option<&Map<String, Value>>,
    ) -> Result<Option<Self>, DispatchError> {
        let Some(name) = canonical_action(action) else {
            return Ok(None);
        };
        let payload = Payload { action: name, data };

        let call = match name {
            RECORD_EXPENSE => Self::RecordExpense(NewExpense {
                amount: payload.amount("amount")?,
                category: payload.required_str("category")?,
                description: payload.required_str("description")?,
            }),
            CREATE_SOCIAL_DRAFT => Self::CreateSocialDraft(NewSocialDraft {
                content: payload.required_str("content")?,
                platform: payload.required_str("platform")?,
            }),
            CREATE_TASK => Self::CreateTask(NewTask {
                title: payload.required_str("title")?,
                due_date: payload.optional_str("due_date")?,
            }),
            TRACK_JOB_APPLICATION => Self::TrackJobApplication(NewJobApplication {
                company: payload.required_str("company")?,
                role: payload.required_str("role")?,
                status: payload
                    .optional_str("status")?
                    .unwrap_or_else(|| JOB_STATUS_APPLIED.to_string()),
                link: payload.optional_str("link")?.unwrap_or_default(),
                salary_range: payload
                    .optional_str("salary_range")?
                    .unwrap_or_else(|| SALARY_RANGE_UNSPECIFIED.to_string()),
            }),
            _ => return Ok(None),
        };

        Ok(Some(call))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RecordExpense(_) => RECORD_EXPENSE,
            Self::CreateSocialDraft(_) => CREATE_SOCIAL_DRAFT,
            Self::CreateTask(_) => CREATE_TASK,
            Self::TrackJobApplication(_) => TRACK_JOB_APPLICATION,
        }
    }
}

fn canonical_action(action: &str) -> Option<&'static str> {
    let trimmed = action.trim();
    let bare = trimmed.strip_prefix(ACTION_PREFIX).unwrap_or(trimmed);
    [RECORD_EXPENSE, CREATE_SOCIAL_DRAFT, CREATE_TASK, TRACK_JOB_APPLICATION]
        .into_iter()
        .find(|name| *name == bare)
}

struct Payload<'a> {
    action: &'static str,
    data: Option<&'a Map<String, Value>>,
}

impl Payload<'_> {
    fn invalid(&self, field: &'static str, reason: impl Into<String>) -> DispatchError {
        DispatchError::Validation { action: self.action, field, reason: reason.into() }
    }

    fn field(&self, field: &str) -> Option<&Value> {
        self.data.and_then(|data| data.get(field)).filter(|value| !value.is_null())
    }

    fn required_str(&self, field: &'static str) -> Result<String, DispatchError> {
        match self.field(field) {
            None => Err(self.invalid(field, "missing")),
            Some(Value::String(value)) if value.trim().is_empty() => {
                Err(self.invalid(field, "must not be blank"))
            }
            Some(Value::String(value)) => Ok(value.trim().to_string()),
            Some(other) => Err(self.invalid(field, format!("expected a string, got {other}"))),
        }
    }

    fn optional_str(&self, field: &'static str) -> Result<Option<String>, DispatchError> {
        match self.field(field) {
            None => Ok(None),
            Some(Value::String(value)) if value.trim().is_empty() => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.trim().to_string())),
            Some(other) => Err(self.invalid(field, format!("expected a string, got {other}"))),
        }
    }

    fn amount(&self, field: &'static str) -> Result<Decimal, DispatchError> {
        let number = match self.field(field) {
            None => return Err(self.invalid(field, "missing")),
            Some(Value::Number(number)) => number,
            Some(other) => {
                return Err(self.invalid(field, format!("expected a number, got {other}")))
            }
        };

        let amount =
            number_to_decimal(number).ok_or_else(|| self.invalid(field, "not a decimal amount"))?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(self.invalid(field, "must not be negative"));
        }
        Ok(amount)
    }
}

fn number_to_decimal(number: &Number) -> Option<Decimal> {
    let text = number.to_string();
    Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)).ok()
}

/// Result of a successful dispatch: the reply that replaces the resolver's
/// message, the UI hint for the client, and the record that was written.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchOutcome {
    pub message: String,
    pub next_action: String,
    pub record: DomainRecord,
}

#[derive(Clone)]
pub struct RecordStores {
    pub expenses: Arc<dyn ExpenseRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub social_drafts: Arc<dyn SocialDraftRepository>,
    pub job_applications: Arc<dyn JobApplicationRepository>,
}

impl RecordStores {
    pub fn in_memory() -> Self {
        Self {
            expenses: Arc::new(InMemoryExpenseRepository::default()),
            tasks: Arc::new(InMemoryTaskRepository::default()),
            social_drafts: Arc::new(InMemorySocialDraftRepository::default()),
            job_applications: Arc::new(InMemoryJobApplicationRepository::default()),
        }
    }
}

#[derive(Clone)]
pub struct ToolDispatcher {
    stores: RecordStores,
}

impl ToolDispatcher {
    pub fn new(stores: RecordStores) -> Self {
        Self { stores }
    }

    pub fn stores(&self) -> &RecordStores {
        &self.stores
    }

    /// Decodes and executes `action`. Unknown actions yield `Ok(None)` and
    /// write nothing.
    pub async fn dispatch(
        &self,
        action: &str,
        data: Option<&Map<String, Value>>,
    ) -> Result<Option<DispatchOutcome>, DispatchError> {
        match ToolCall::decode(action, data)? {
            Some(call) => self.execute(call).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn execute(&self, call: ToolCall) -> Result<DispatchOutcome, DispatchError> {
        let action = call.name();
        let storage = |source: RepositoryError| DispatchError::Storage { action, source };

        let outcome = match call {
            ToolCall::RecordExpense(expense) => {
                let record = self.stores.expenses.create(expense).await.map_err(storage)?;
                let cents =
                    record.amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                DispatchOutcome {
                    message: format!("Recorded ${cents:.2} in {}.", record.category),
                    next_action: "view_finance".to_string(),
                    record: DomainRecord::Expense(record),
                }
            }
            ToolCall::CreateSocialDraft(draft) => {
                let record = self.stores.social_drafts.create(draft).await.map_err(storage)?;
                DispatchOutcome {
                    message: "Draft saved to Social Hub.".to_string(),
                    next_action: "view_social".to_string(),
                    record: DomainRecord::SocialDraft(record),
                }
            }
            ToolCall::CreateTask(task) => {
                let record = self.stores.tasks.create(task).await.map_err(storage)?;
                DispatchOutcome {
                    message: "Task created.".to_string(),
                    next_action: "view_tasks".to_string(),
                    record: DomainRecord::Task(record),
                }
            }
            ToolCall::TrackJobApplication(application) => {
                let record =
                    self.stores.job_applications.create(application).await.map_err(storage)?;
                DispatchOutcome {
                    message: format!(
                        "Logged your application for {} at {}.",
                        record.role, record.company
                    ),
                    next_action: "view_jobs".to_string(),
                    record: DomainRecord::JobApplication(record),
                }
            }
        };

        info!(
            event_name = "agent.tools.record_created",
            action,
            record_kind = outcome.record.kind(),
            record_id = outcome.record.id(),
            "tool call stored a record"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use serde_json::{json, Map, Value};

    use serqet_core::domain::records::{
        DomainRecord, ExpenseRecord, NewExpense, NewJobApplication, NewTask,
    };
    use serqet_db::repositories::{
        ExpenseRepository, RepositoryError, SocialDraftRepository, TaskRepository,
    };

    use super::{DispatchError, RecordStores, ToolCall, ToolDispatcher};

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    struct FailingExpenses;

    #[async_trait::async_trait]
    impl ExpenseRepository for FailingExpenses {
        async fn create(&self, _expense: NewExpense) -> Result<ExpenseRecord, RepositoryError> {
            Err(RepositoryError::Unavailable("disk full".to_string()))
        }

        async fn list(&self) -> Result<Vec<ExpenseRecord>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn total(&self) -> Result<Decimal, RepositoryError> {
            Ok(Decimal::ZERO)
        }
    }

    #[test]
    fn decode_accepts_prefixed_and_bare_action_names() {
        let payload = data(json!({ "title": "Buy milk" }));
        let expected = ToolCall::CreateTask(NewTask { title: "Buy milk".to_string(), due_date: None });

        assert_eq!(
            ToolCall::decode("execute_create_task", Some(&payload)).expect("decode"),
            Some(expected.clone())
        );
        assert_eq!(ToolCall::decode("create_task", Some(&payload)).expect("decode"), Some(expected));
    }

    #[test]
    fn decode_ignores_unknown_actions() {
        let payload = data(json!({ "anything": 1 }));

        assert_eq!(ToolCall::decode("do_nothing", Some(&payload)).expect("decode"), None);
        assert_eq!(ToolCall::decode("execute_", None).expect("decode"), None);
    }

    #[test]
    fn decode_rejects_missing_required_field() {
        let payload = data(json!({ "amount": 10, "description": "lunch" }));

        let error = ToolCall::decode("record_expense", Some(&payload)).expect_err("must fail");

        assert!(matches!(
            error,
            DispatchError::Validation { action: "record_expense", field: "category", .. }
        ));
    }

    #[test]
    fn decode_rejects_recognised_action_without_data() {
        let error = ToolCall::decode("create_social_draft", None).expect_err("must fail");

        assert!(matches!(error, DispatchError::Validation { field: "content", .. }));
    }

    #[test]
    fn decode_rejects_mistyped_and_negative_amounts() {
        let as_string = data(json!({ "amount": "12", "category": "food", "description": "x" }));
        let negative = data(json!({ "amount": -3.5, "category": "food", "description": "x" }));

        for payload in [as_string, negative] {
            let error = ToolCall::decode("record_expense", Some(&payload)).expect_err("must fail");
            assert!(matches!(error, DispatchError::Validation { field: "amount", .. }));
        }
    }

    #[test]
    fn decode_rejects_blank_required_string() {
        let payload = data(json!({ "company": "   ", "role": "Engineer" }));

        let error = ToolCall::decode("track_job_application", Some(&payload)).expect_err("must fail");

        assert!(matches!(error, DispatchError::Validation { field: "company", .. }));
    }

    #[test]
    fn decode_fills_job_application_defaults() {
        let payload =
            data(json!({ "company": "Acme", "role": "Engineer", "status": null, "salary_range": "" }));

        let call = ToolCall::decode("execute_track_job_application", Some(&payload))
            .expect("decode")
            .expect("recognised");

        assert_eq!(
            call,
            ToolCall::TrackJobApplication(NewJobApplication {
                company: "Acme".to_string(),
                role: "Engineer".to_string(),
                status: "Applied".to_string(),
                link: String::new(),
                salary_range: "Not specified".to_string(),
            })
        );
    }

    #[test]
    fn decode_rejects_mistyped_optional_field() {
        let payload = data(json!({ "title": "Buy milk", "due_date": 20260301 }));

        let error = ToolCall::decode("create_task", Some(&payload)).expect_err("must fail");

        assert!(matches!(error, DispatchError::Validation { field: "due_date", .. }));
    }

    #[tokio::test]
    async fn dispatch_records_expense_with_two_decimal_message() {
        let dispatcher = ToolDispatcher::new(RecordStores::in_memory());
        let payload = data(json!({ "amount": 42.5, "category": "food", "description": "lunch" }));

        let outcome = dispatcher
            .dispatch("execute_record_expense", Some(&payload))
            .await
            .expect("dispatch")
            .expect("recognised");

        assert_eq!(outcome.message, "Recorded $42.50 in food.");
        assert_eq!(outcome.next_action, "view_finance");
        let stored = dispatcher.stores().expenses.list().await.expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].amount, Decimal::new(425, 1));
        assert_eq!(outcome.record, DomainRecord::Expense(stored[0].clone()));
    }

    #[tokio::test]
    async fn expense_message_rounds_half_cents_up() {
        let dispatcher = ToolDispatcher::new(RecordStores::in_memory());

        for (amount, expected) in [
            (json!(0.005), "Recorded $0.01 in x."),
            (json!(0.015), "Recorded $0.02 in x."),
            (json!(2.675), "Recorded $2.68 in x."),
            (json!(3.004), "Recorded $3.00 in x."),
        ] {
            let payload = data(json!({ "amount": amount, "category": "x", "description": "y" }));
            let outcome = dispatcher
                .dispatch("record_expense", Some(&payload))
                .await
                .expect("dispatch")
                .expect("recognised");

            assert_eq!(outcome.message, expected);
        }
    }

    #[tokio::test]
    async fn dispatch_creates_pending_task() {
        let dispatcher = ToolDispatcher::new(RecordStores::in_memory());
        let payload = data(json!({ "title": "Buy milk" }));

        let outcome = dispatcher
            .dispatch("create_task", Some(&payload))
            .await
            .expect("dispatch")
            .expect("recognised");

        assert_eq!(outcome.message, "Task created.");
        assert_eq!(outcome.next_action, "view_tasks");
        let tasks = dispatcher.stores().tasks.list().await.expect("list");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, "Pending");
    }

    #[tokio::test]
    async fn dispatch_saves_social_draft_and_job_application() {
        let dispatcher = ToolDispatcher::new(RecordStores::in_memory());

        let draft = dispatcher
            .dispatch(
                "create_social_draft",
                Some(&data(json!({ "content": "Shipped it", "platform": "linkedin" }))),
            )
            .await
            .expect("dispatch")
            .expect("recognised");
        let job = dispatcher
            .dispatch(
                "track_job_application",
                Some(&data(json!({ "company": "Acme", "role": "Engineer" }))),
            )
            .await
            .expect("dispatch")
            .expect("recognised");

        assert_eq!(draft.message, "Draft saved to Social Hub.");
        assert_eq!(draft.next_action, "view_social");
        assert_eq!(job.message, "Logged your application for Engineer at Acme.");
        assert_eq!(job.next_action, "view_jobs");
        let drafts = dispatcher.stores().social_drafts.list().await.expect("list");
        assert_eq!(drafts[0].status, "draft");
    }

    #[tokio::test]
    async fn invalid_payload_writes_nothing() {
        let dispatcher = ToolDispatcher::new(RecordStores::in_memory());
        let payload = data(json!({ "amount": 10, "description": "lunch" }));

        let result = dispatcher.dispatch("record_expense", Some(&payload)).await;

        assert!(matches!(result, Err(DispatchError::Validation { .. })));
        assert!(dispatcher.stores().expenses.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn storage_failure_surfaces_as_dispatch_error() {
        let stores = RecordStores { expenses: Arc::new(FailingExpenses), ..RecordStores::in_memory() };
        let dispatcher = ToolDispatcher::new(stores);
        let payload = data(json!({ "amount": 1, "category": "food", "description": "gum" }));

        let result = dispatcher.dispatch("record_expense", Some(&payload)).await;

        assert!(matches!(result, Err(DispatchError::Storage { action: "record_expense", .. })));
    }
}
