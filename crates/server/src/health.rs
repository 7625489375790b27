use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use serqet_db::DbPool;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    brain_endpoint: String,
}

impl HealthState {
    pub fn new(db_pool: DbPool, brain_endpoint: impl Into<String>) -> Self {
        Self { db_pool, brain_endpoint: brain_endpoint.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub database: ProbeResult,
    /// Reported, never probed: the resolver is only called on demand.
    pub brain_endpoint: String,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Database round-trip; 503 when it fails.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let database = probe_database(&state.db_pool).await;
    let ready = database.status == "ready";

    let report = HealthReport {
        status: if ready { "ready" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database,
        brain_endpoint: state.brain_endpoint.clone(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(report))
}

async fn probe_database(pool: &DbPool) -> ProbeResult {
    let probe = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM conversation_turn")
        .fetch_one(pool)
        .await;
    match probe {
        Ok(turns) => ProbeResult { status: "ready", detail: format!("{turns} conversation turns") },
        Err(error) => ProbeResult { status: "degraded", detail: format!("probe failed: {error}") },
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use serqet_db::{connect_with_settings, migrations};

    use crate::health::{health, HealthState};

    const BRAIN: &str = "http://localhost:8000/brain/v1/process_intent";

    #[tokio::test]
    async fn health_is_ready_with_migrated_database() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let (code, Json(report)) = health(State(HealthState::new(pool.clone(), BRAIN))).await;

        assert_eq!(code, StatusCode::OK);
        assert_eq!(report.status, "ready");
        assert_eq!(report.database.detail, "0 conversation turns");
        assert_eq!(report.brain_endpoint, BRAIN);

        pool.close().await;
    }

    #[tokio::test]
    async fn health_degrades_when_schema_is_missing() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");

        let (code, Json(report)) = health(State(HealthState::new(pool, BRAIN))).await;

        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.status, "degraded");
        assert_eq!(report.database.status, "degraded");
    }

    #[tokio::test]
    async fn health_degrades_when_pool_is_closed() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        pool.close().await;

        let (code, Json(report)) = health(State(HealthState::new(pool, BRAIN))).await;

        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert!(report.database.detail.starts_with("probe failed"));
    }
}
