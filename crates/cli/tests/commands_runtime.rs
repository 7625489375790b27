use std::env;
use std::net::TcpListener;
use std::sync::{Mutex, OnceLock};
use std::thread;

use axum::{http::StatusCode, Router};
use serde_json::Value;
use serqet_cli::commands::{config, doctor, migrate};

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("SERQET_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert!(payload["message"].as_str().unwrap_or_default().contains("migrations applied"));
    });
}

#[test]
fn migrate_returns_config_failure_for_invalid_brain_url() {
    with_env(&[("SERQET_BRAIN_BASE_URL", "brain.local:8000")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn config_attributes_env_overrides() {
    with_env(
        &[("SERQET_DATABASE_URL", "sqlite::memory:"), ("SERQET_CONVERSATION_HISTORY_LIMIT", "4")],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0);

            assert!(result
                .output
                .contains("- database.url = sqlite::memory: (source: env (SERQET_DATABASE_URL))"));
            assert!(result.output.contains(
                "- conversation.history_limit = 4 (source: env (SERQET_CONVERSATION_HISTORY_LIMIT))"
            ));
            assert!(result.output.contains("- brain.timeout_secs = 10 (source: default)"));
        },
    );
}

#[test]
fn doctor_passes_when_database_and_brain_respond() {
    let brain_url = spawn_http_stub();
    with_env(
        &[("SERQET_DATABASE_URL", "sqlite::memory:"), ("SERQET_BRAIN_BASE_URL", &brain_url)],
        || {
            let result = doctor::run(true);
            let payload = parse_payload(&result.output);

            assert_eq!(payload["overall_status"], "pass", "unexpected report: {payload}");
            assert_eq!(result.exit_code, 0);
            assert_eq!(check(&payload, "brain_reachability")["status"], "pass");
        },
    );
}

#[test]
fn doctor_fails_when_brain_is_unreachable() {
    let closed_port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let brain_url = format!("http://127.0.0.1:{closed_port}");

    with_env(
        &[("SERQET_DATABASE_URL", "sqlite::memory:"), ("SERQET_BRAIN_BASE_URL", &brain_url)],
        || {
            let result = doctor::run(true);
            let payload = parse_payload(&result.output);

            assert_eq!(payload["overall_status"], "fail");
            assert_eq!(result.exit_code, 1);
            assert_eq!(check(&payload, "config_validation")["status"], "pass");
            assert_eq!(check(&payload, "database_connectivity")["status"], "pass");
            assert_eq!(check(&payload, "brain_reachability")["status"], "fail");
        },
    );
}

#[test]
fn doctor_skips_probes_when_config_invalid() {
    with_env(&[("SERQET_BRAIN_TIMEOUT_SECS", "soon")], || {
        let result = doctor::run(false);

        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] database_connectivity"));
        assert!(result.output.contains("- [skip] brain_reachability"));
    });
}

fn check<'a>(payload: &'a Value, name: &str) -> &'a Value {
    payload["checks"]
        .as_array()
        .and_then(|checks| checks.iter().find(|check| check["name"] == name))
        .unwrap_or_else(|| panic!("missing check `{name}` in {payload}"))
}

/// Brain stand-in on its own runtime thread; every route answers 404, which
/// is enough for a reachability check.
fn spawn_http_stub() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
    let address = listener.local_addr().expect("stub addr");
    listener.set_nonblocking(true).expect("nonblocking stub");

    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("stub runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
            let router = Router::new().fallback(|| async { StatusCode::NOT_FOUND });
            let _ = axum::serve(listener, router).await;
        });
    });
    format!("http://{address}")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SERQET_DATABASE_URL",
        "SERQET_DATABASE_MAX_CONNECTIONS",
        "SERQET_DATABASE_TIMEOUT_SECS",
        "SERQET_BRAIN_BASE_URL",
        "SERQET_BRAIN_INTENT_PATH",
        "SERQET_BRAIN_TIMEOUT_SECS",
        "SERQET_CONVERSATION_HISTORY_LIMIT",
        "SERQET_SERVER_BIND_ADDRESS",
        "SERQET_SERVER_PORT",
        "SERQET_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "SERQET_LOGGING_LEVEL",
        "SERQET_LOGGING_FORMAT",
        "SERQET_LOG_LEVEL",
        "SERQET_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
