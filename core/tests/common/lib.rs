//! Shared helpers for gate integration tests: a scratch directory holding the
//! instruction document and audit log, plus canned Messages API responses.

#![allow(clippy::expect_used)]

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use shellgate_core::AuditStatus;
use shellgate_core::BackendConfig;
use shellgate_core::GateConfig;
use shellgate_core::config::Credential;
use tempfile::TempDir;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

pub const TEST_API_KEY: &str = "sk-ant-test-key";

pub const TEST_POLICY: &str = "Approve commands that only read state. Escalate anything that writes, deletes, installs, or reaches the network.";

/// Temp directory with a policy document and a (not yet created) audit log.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("policy.md"), TEST_POLICY).expect("write policy");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn instructions_path(&self) -> PathBuf {
        self.dir.path().join("policy.md")
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("gate.log")
    }

    pub fn log(&self) -> String {
        std::fs::read_to_string(self.log_path()).unwrap_or_default()
    }

    /// Status of every resolved record in the audit log, in order.
    pub fn statuses(&self) -> Vec<AuditStatus> {
        audit_statuses(&self.log())
    }

    /// First-party config pointed at `server`.
    pub fn config_for(&self, server: &MockServer) -> GateConfig {
        GateConfig {
            model: "claude-opus-4-5".to_string(),
            backend: BackendConfig::FirstParty {
                base_url: server.uri(),
                credential: Some(Credential::ApiKey(TEST_API_KEY.to_string())),
            },
            max_tokens: 64,
            timeout: Duration::from_secs(5),
            log_path: self.log_path(),
            instructions_path: self.instructions_path(),
        }
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

pub fn audit_statuses(log: &str) -> Vec<AuditStatus> {
    log.lines()
        .filter_map(|line| line.strip_prefix('['))
        .filter_map(|rest| rest.split_once("] "))
        .filter_map(|(_, status)| AuditStatus::parse(status))
        .collect()
}

/// Messages API body whose only content is one tool call.
pub fn tool_use_response(name: &str, input: Value) -> Value {
    json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "model": "claude-opus-4-5",
        "content": [
            {"type": "tool_use", "id": "toolu_test", "name": name, "input": input}
        ],
        "stop_reason": "tool_use",
        "usage": {"input_tokens": 120, "output_tokens": 12}
    })
}

/// Messages API body carrying a `classify` call with `decision`.
pub fn classify_response(decision: &str) -> Value {
    tool_use_response("classify", json!({ "decision": decision }))
}

/// Anthropic-style error body.
pub fn error_body(error_type: &str, message: &str) -> Value {
    json!({
        "type": "error",
        "error": {"type": error_type, "message": message}
    })
}

/// Answer every first-party Messages request with `template`.
pub async fn mount_messages(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Answer every first-party Messages request with a `classify` call.
pub async fn mount_decision(server: &MockServer, decision: &str) {
    mount_messages(
        server,
        ResponseTemplate::new(200).set_body_json(classify_response(decision)),
    )
    .await;
}

/// Hook event as the host writes it to stdin.
pub fn hook_event(command: &str) -> String {
    json!({
        "session_id": "test-session",
        "hook_event_name": "PreToolUse",
        "tool_name": "Bash",
        "tool_input": {"command": command, "description": "test"}
    })
    .to_string()
}

/// Body of every request `server` has received.
pub async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .map(|request| serde_json::from_slice(&request.body).expect("JSON request body"))
        .collect()
}
