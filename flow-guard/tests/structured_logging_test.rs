//! Integration tests for structured logging functionality.

use flow_guard::prelude::*;
use serde_json::json;

/// Test helper to capture structured logs
struct LogCapture {
    logs: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

impl LogCapture {
    fn new() -> Self {
        Self {
            logs: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    fn captured_logs(&self) -> Vec<String> {
        self.logs.lock().unwrap().clone()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let s = String::from_utf8_lossy(buf).to_string();
        self.logs.lock().unwrap().push(s);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn json_subscriber(capture: &LogCapture, filter: &str) -> impl tracing::Subscriber + Send + Sync {
    let logs = capture.logs.clone();
    tracing_subscriber::fmt()
        .json()
        .with_writer(move || LogCapture { logs: logs.clone() })
        .with_env_filter(filter)
        .finish()
}

#[test]
fn test_validation_run_logging() {
    let capture = LogCapture::new();
    let _guard =
        tracing::subscriber::set_default(json_subscriber(&capture, "info,flow_guard=debug"));

    let v = Validator::new(Schema::new().path("a", ["isString:not string"]))
        .unwrap()
        .set_name("orders");
    assert!(!v.validate(&mut json!({"a": 1})).unwrap());

    let combined_logs = capture.captured_logs().join("");
    assert!(
        combined_logs.contains(r#""level":"DEBUG""#),
        "Should contain debug logs"
    );
    assert!(
        combined_logs.contains(r#""message":"validation started""#),
        "Should contain start message"
    );
    assert!(
        combined_logs.contains(r#""message":"validation finished""#),
        "Should contain completion message"
    );
    assert!(
        combined_logs.contains("orders"),
        "Should contain the validator name"
    );
}

#[test]
fn test_rule_details_are_gated() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(json_subscriber(&capture, "flow_guard=trace"));

    let quiet = Validator::new(Schema::new().path("a", ["isString"])).unwrap();
    quiet.validate(&mut json!({"a": "x"})).unwrap();
    assert!(
        !capture.captured_logs().join("").contains("rule evaluated"),
        "Rule details should be off by default"
    );

    let verbose = Validator::new(Schema::new().path("a", ["isString"]))
        .unwrap()
        .with_log_config(LogConfig::verbose());
    verbose.validate(&mut json!({"a": "x"})).unwrap();

    let combined_logs = capture.captured_logs().join("");
    assert!(combined_logs.contains(r#""message":"rule evaluated""#));
    assert!(combined_logs.contains(r#""rule":"isString""#));
}

#[test]
fn test_default_fill_logging() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(json_subscriber(&capture, "flow_guard=debug"));

    let v = Validator::new(Schema::new().path("role", vec![Rule::default_value("member")])).unwrap();
    v.validate(&mut json!({})).unwrap();

    let combined_logs = capture.captured_logs().join("");
    assert!(combined_logs.contains(r#""message":"default applied""#));
    assert!(combined_logs.contains(r#""path":"role""#));

    let production = LogCapture::new();
    let _guard =
        tracing::subscriber::set_default(json_subscriber(&production, "flow_guard=debug"));
    let v = v.with_log_config(LogConfig::production());
    v.validate(&mut json!({})).unwrap();
    assert!(!production.captured_logs().join("").contains("default applied"));
}
