use std::sync::Arc;

use serqet_agent::{AgentRuntime, HttpIntentClient, RecordStores, ToolDispatcher};
use serqet_core::config::{AppConfig, ConfigError, LoadOptions};
use serqet_db::repositories::{
    ConversationRepository, SqlConversationRepository, SqlExpenseRepository,
    SqlJobApplicationRepository, SqlSocialDraftRepository, SqlTaskRepository,
};
use serqet_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub history: Arc<dyn ConversationRepository>,
    pub stores: RecordStores,
    pub agent_runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("intent client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let intent_client =
        HttpIntentClient::from_config(&config.brain).map_err(BootstrapError::HttpClient)?;
    info!(
        event_name = "system.bootstrap.brain_configured",
        correlation_id = "bootstrap",
        endpoint = %intent_client.endpoint(),
        timeout_secs = config.brain.timeout_secs,
        "intent resolver client ready"
    );

    let history: Arc<dyn ConversationRepository> =
        Arc::new(SqlConversationRepository::new(db_pool.clone()));
    let stores = RecordStores {
        expenses: Arc::new(SqlExpenseRepository::new(db_pool.clone())),
        tasks: Arc::new(SqlTaskRepository::new(db_pool.clone())),
        social_drafts: Arc::new(SqlSocialDraftRepository::new(db_pool.clone())),
        job_applications: Arc::new(SqlJobApplicationRepository::new(db_pool.clone())),
    };
    let agent_runtime = Arc::new(AgentRuntime::new(
        history.clone(),
        Arc::new(intent_client),
        ToolDispatcher::new(stores.clone()),
        config.conversation.history_limit,
    ));

    Ok(Application { config, db_pool, history, stores, agent_runtime })
}

#[cfg(test)]
mod tests {
    use serqet_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn options(overrides: ConfigOverrides) -> LoadOptions {
        LoadOptions {
            config_path: Some("does-not-exist/serqet.toml".into()),
            overrides,
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_wires_runtime() {
        let app = bootstrap(options(ConfigOverrides {
            database_url: Some("sqlite::memory:?cache=shared".to_string()),
            history_limit: Some(4),
            ..ConfigOverrides::default()
        }))
        .await
        .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('conversation_turn', 'expense_record', 'task_record', 'social_draft', 'job_application')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("count tables");

        assert_eq!(table_count, 5);
        assert_eq!(app.agent_runtime.history_limit(), 4);

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_config() {
        let result = bootstrap(options(ConfigOverrides {
            database_url: Some("sqlite::memory:".to_string()),
            brain_base_url: Some("ftp://brain.internal".to_string()),
            ..ConfigOverrides::default()
        }))
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("brain.base_url"));
    }
}
