use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serqet_core::config::{AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let file_path = detect_config_path();
    let file_doc = file_path.as_deref().and_then(load_config_file_doc);
    let sources = SourceLookup { file_path: file_path.as_deref(), file_doc: file_doc.as_ref() };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for Entry { key, value, env_keys } in effective_values(&config) {
        lines.push(render_line(key, &value, sources.source_of(key, env_keys)));
    }
    lines.push(format!("- brain intent url = {}", config.brain.intent_url()));

    CommandResult::text(lines.join("\n"))
}

struct Entry {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn entry(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Entry {
    Entry { key, value, env_keys }
}

fn effective_values(config: &AppConfig) -> Vec<Entry> {
    vec![
        entry("database.url", config.database.url.clone(), &["SERQET_DATABASE_URL"]),
        entry(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["SERQET_DATABASE_MAX_CONNECTIONS"],
        ),
        entry(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["SERQET_DATABASE_TIMEOUT_SECS"],
        ),
        entry("brain.base_url", config.brain.base_url.clone(), &["SERQET_BRAIN_BASE_URL"]),
        entry(
            "brain.intent_path",
            config.brain.intent_path.clone(),
            &["SERQET_BRAIN_INTENT_PATH"],
        ),
        entry(
            "brain.timeout_secs",
            config.brain.timeout_secs.to_string(),
            &["SERQET_BRAIN_TIMEOUT_SECS"],
        ),
        entry(
            "conversation.history_limit",
            config.conversation.history_limit.to_string(),
            &["SERQET_CONVERSATION_HISTORY_LIMIT"],
        ),
        entry(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["SERQET_SERVER_BIND_ADDRESS"],
        ),
        entry("server.port", config.server.port.to_string(), &["SERQET_SERVER_PORT"]),
        entry(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["SERQET_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["SERQET_LOGGING_LEVEL", "SERQET_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["SERQET_LOGGING_FORMAT", "SERQET_LOG_FORMAT"],
        ),
    ]
}

struct SourceLookup<'a> {
    file_path: Option<&'a Path>,
    file_doc: Option<&'a Value>,
}

impl SourceLookup<'_> {
    fn source_of(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if self.file_doc.is_some_and(|doc| contains_path(doc, key_path)) {
            let file = self
                .file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file})");
        }

        "default".to_string()
    }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("serqet.toml"), PathBuf::from("config/serqet.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
