//! JSON API for the assistant gateway.
//!
//! - `POST /api/v1/intent`          — run one query through the agent runtime
//! - `GET  /api/v1/modules`         — feature modules the client can show
//! - `GET  /api/v1/history`         — conversation turns, oldest first
//! - `GET  /api/v1/social/posts`    — social drafts, newest first
//! - `GET  /api/v1/finance/summary` — expense total plus every expense record
//! - `GET  /api/v1/tasks`           — tasks, grouped by status
//! - `GET  /api/v1/jobs`            — job applications, newest first

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use serqet_agent::conversation::oldest_first;
use serqet_agent::{AgentReply, AgentRuntime, RecordStores};
use serqet_core::domain::conversation::ConversationTurn;
use serqet_core::domain::records::{ExpenseRecord, JobApplication, SocialDraft, TaskRecord};
use serqet_core::errors::{ApplicationError, InterfaceError};
use serqet_db::repositories::{ConversationRepository, RepositoryError};

const DEFAULT_HISTORY_PAGE: u32 = 20;
const MAX_HISTORY_PAGE: u32 = 100;

#[derive(Clone)]
pub struct ApiState {
    runtime: Arc<AgentRuntime>,
    history: Arc<dyn ConversationRepository>,
    stores: RecordStores,
}

impl ApiState {
    pub fn new(
        runtime: Arc<AgentRuntime>,
        history: Arc<dyn ConversationRepository>,
        stores: RecordStores,
    ) -> Self {
        Self { runtime, history, stores }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct IntentBody {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ApiError {
    fn message(error: impl Into<String>) -> Self {
        Self { error: error.into(), detail: None, correlation_id: None }
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

pub const MODULES: [ModuleInfo; 4] = [
    ModuleInfo {
        id: "social",
        name: "Social Media",
        description: "Manage your social presence.",
        icon: "social",
    },
    ModuleInfo {
        id: "finance",
        name: "Finances",
        description: "Track income and expenses.",
        icon: "finance",
    },
    ModuleInfo { id: "task", name: "Task", description: "Organize your to-dos.", icon: "tasks" },
    ModuleInfo {
        id: "jobs",
        name: "Jobs",
        description: "Track your job applications.",
        icon: "jobs",
    },
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FinanceSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expenses: Decimal,
    pub recent_records: Vec<ExpenseRecord>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/intent", post(resolve_intent))
        .route("/api/v1/modules", get(list_modules))
        .route("/api/v1/history", get(list_history))
        .route("/api/v1/social/posts", get(list_social_posts))
        .route("/api/v1/finance/summary", get(finance_summary))
        .route("/api/v1/tasks", get(list_tasks))
        .route("/api/v1/jobs", get(list_jobs))
        .with_state(state)
}

pub async fn resolve_intent(
    State(state): State<ApiState>,
    Json(body): Json<IntentBody>,
) -> ApiResult<AgentReply> {
    let correlation_id = Uuid::new_v4().to_string();
    match state.runtime.handle_query(&correlation_id, &body.user_id, &body.query).await {
        Ok(reply) => Ok(Json(reply)),
        Err(agent_error) => {
            let detail = agent_error.to_string();
            let interface = ApplicationError::from(agent_error).into_interface(&correlation_id);
            let status = status_for(&interface);
            warn!(
                event_name = "api.intent.failed",
                correlation_id = %correlation_id,
                user_id = %body.user_id,
                status = status.as_u16(),
                error = %interface,
                "intent request failed"
            );
            Err((
                status,
                Json(ApiError {
                    error: interface.user_message().to_string(),
                    detail: Some(detail),
                    correlation_id: Some(correlation_id),
                }),
            ))
        }
    }
}

fn status_for(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn list_modules() -> Json<Vec<ModuleInfo>> {
    Json(MODULES.to_vec())
}

pub async fn list_history(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<ConversationTurn>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_PAGE).clamp(1, MAX_HISTORY_PAGE);
    let user_id = query.user_id.as_deref().map(str::trim).filter(|id| !id.is_empty());

    let turns = match user_id {
        Some(user_id) => state.history.recent(user_id, limit).await.map(oldest_first),
        None => state.history.latest(limit).await,
    };
    turns.map(Json).map_err(|error| storage_failure("history", "Could not fetch history", error))
}

pub async fn list_social_posts(State(state): State<ApiState>) -> ApiResult<Vec<SocialDraft>> {
    state.stores.social_drafts.list().await.map(Json).map_err(|error| {
        storage_failure("social_posts", "Could not fetch social posts", error)
    })
}

pub async fn finance_summary(State(state): State<ApiState>) -> ApiResult<FinanceSummary> {
    let expenses = &state.stores.expenses;
    let load = async { Ok::<_, RepositoryError>((expenses.total().await?, expenses.list().await?)) };

    let (total_expenses, recent_records) = load
        .await
        .map_err(|error| storage_failure("finance_summary", "Could not fetch finances", error))?;
    Ok(Json(FinanceSummary { total_expenses, recent_records }))
}

pub async fn list_tasks(State(state): State<ApiState>) -> ApiResult<Vec<TaskRecord>> {
    state
        .stores
        .tasks
        .list()
        .await
        .map(Json)
        .map_err(|error| storage_failure("tasks", "Could not fetch tasks", error))
}

pub async fn list_jobs(State(state): State<ApiState>) -> ApiResult<Vec<JobApplication>> {
    state
        .stores
        .job_applications
        .list()
        .await
        .map(Json)
        .map_err(|error| storage_failure("jobs", "Could not fetch jobs", error))
}

fn storage_failure(
    resource: &'static str,
    message: &'static str,
    error: RepositoryError,
) -> (StatusCode, Json<ApiError>) {
    let correlation_id = Uuid::new_v4().to_string();
    error!(
        event_name = "api.listing.failed",
        correlation_id = %correlation_id,
        resource,
        error = %error,
        "listing query failed"
    );
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError { correlation_id: Some(correlation_id), ..ApiError::message(message) }),
    )
}
