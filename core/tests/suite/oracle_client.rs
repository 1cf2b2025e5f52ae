use std::time::Duration;

use aws_credential_types::Credentials;
use gate_test_support::TEST_API_KEY;
use gate_test_support::Workspace;
use gate_test_support::classify_response;
use gate_test_support::error_body;
use gate_test_support::mount_decision;
use gate_test_support::mount_messages;
use gate_test_support::request_bodies;
use gate_test_support::tool_use_response;
use pretty_assertions::assert_eq;
use serde_json::json;
use shellgate_core::AnthropicOracle;
use shellgate_core::BackendConfig;
use shellgate_core::ClassificationContract;
use shellgate_core::ClassificationDecision;
use shellgate_core::Oracle;
use shellgate_core::OracleError;
use shellgate_core::config::Credential;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::header;
use wiremock::matchers::header_exists;
use wiremock::matchers::header_regex;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn contract() -> ClassificationContract {
    ClassificationContract::from_instructions("Approve read-only commands.")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sends_forced_classify_request() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", TEST_API_KEY))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(classify_response("auto_approve")))
        .expect(1)
        .mount(&server)
        .await;

    let oracle = AnthropicOracle::from_config(&workspace.config_for(&server)).expect("oracle");
    let answer = oracle
        .classify("git log --oneline", &contract())
        .await
        .expect("answer");

    assert_eq!(answer.decision, ClassificationDecision::AutoApprove);
    assert_eq!(answer.raw, r#"{"decision":"auto_approve"}"#);

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(body["model"], "claude-opus-4-5");
    assert_eq!(body["max_tokens"], 64);
    assert_eq!(body["tool_choice"], json!({"type": "tool", "name": "classify"}));
    assert_eq!(body["tools"][0]["name"], "classify");
    assert_eq!(body["tools"][0]["description"], "Approve read-only commands.");
    assert_eq!(
        body["tools"][0]["input_schema"]["properties"]["decision"]["enum"],
        json!(["auto_approve", "escalate"])
    );
    assert_eq!(
        body["messages"],
        json!([{"role": "user", "content": "git log --oneline"}])
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn auth_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("authorization", "Bearer oauth-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(classify_response("escalate")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = workspace.config_for(&server);
    config.backend = BackendConfig::FirstParty {
        base_url: server.uri(),
        credential: Some(Credential::AuthToken("oauth-token".to_string())),
    };
    let oracle = AnthropicOracle::from_config(&config).expect("oracle");

    let answer = oracle.classify("make", &contract()).await.expect("answer");
    assert_eq!(answer.decision, ClassificationDecision::Escalate);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bedrock_invokes_model_path() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();

    Mock::given(method("POST"))
        .and(path(
            "/model/us.anthropic.claude-opus-4-5-20251101-v1%3A0/invoke",
        ))
        .and(header("authorization", "Bearer bedrock-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(classify_response("auto_approve")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = workspace.config_for(&server);
    config.model = "us.anthropic.claude-opus-4-5-20251101-v1:0".to_string();
    config.backend = BackendConfig::Bedrock {
        base_url: server.uri(),
        region: "us-east-1".to_string(),
        bearer_token: Some("bedrock-key".to_string()),
    };
    let oracle = AnthropicOracle::from_config(&config).expect("oracle");

    let answer = oracle.classify("ls", &contract()).await.expect("answer");
    assert_eq!(answer.decision, ClassificationDecision::AutoApprove);

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies[0]["anthropic_version"], "bedrock-2023-05-31");
    assert!(bodies[0].get("model").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bedrock_without_api_key_signs_with_sigv4() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();

    Mock::given(method("POST"))
        .and(path("/model/anthropic.claude-opus-4-5/invoke"))
        .and(header_regex(
            "authorization",
            r"^AWS4-HMAC-SHA256 Credential=AKIDTEST/\d{8}/eu-west-1/bedrock/aws4_request, SignedHeaders=[a-z0-9;-]+, Signature=[0-9a-f]{64}$",
        ))
        .and(header_exists("x-amz-date"))
        .and(header("x-amz-security-token", "session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(classify_response("escalate")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = workspace.config_for(&server);
    config.model = "anthropic.claude-opus-4-5".to_string();
    config.backend = BackendConfig::Bedrock {
        base_url: server.uri(),
        region: "eu-west-1".to_string(),
        bearer_token: None,
    };
    let credentials = Credentials::new(
        "AKIDTEST",
        "secret-key",
        Some("session-token".to_string()),
        None,
        "test",
    );
    let oracle = AnthropicOracle::from_config(&config)
        .expect("oracle")
        .with_aws_credentials(credentials);

    let answer = oracle.classify("terraform apply", &contract()).await.expect("answer");
    assert_eq!(answer.decision, ClassificationDecision::Escalate);

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies[0]["anthropic_version"], "bedrock-2023-05-31");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mount_messages(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(classify_response("auto_approve"))
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let mut config = workspace.config_for(&server);
    config.timeout = Duration::from_millis(200);
    let oracle = AnthropicOracle::from_config(&config).expect("oracle");

    let err = oracle.classify("ls", &contract()).await.expect_err("timeout");
    assert!(matches!(err, OracleError::Timeout), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_credentials_are_authentication_errors() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mount_messages(
        &server,
        ResponseTemplate::new(401)
            .set_body_json(error_body("authentication_error", "invalid x-api-key")),
    )
    .await;

    let oracle = AnthropicOracle::from_config(&workspace.config_for(&server)).expect("oracle");
    let err = oracle.classify("ls", &contract()).await.expect_err("401");
    assert!(
        matches!(err, OracleError::Authentication { status: 401, ref message } if message == "invalid x-api-key"),
        "got {err:?}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rate_limit_is_not_retried() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(error_body("rate_limit_error", "slow down")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let oracle = AnthropicOracle::from_config(&workspace.config_for(&server)).expect("oracle");
    let err = oracle.classify("ls", &contract()).await.expect_err("429");
    assert!(matches!(err, OracleError::RateLimited { .. }), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_error_keeps_error_type() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mount_messages(
        &server,
        ResponseTemplate::new(529).set_body_json(error_body("overloaded_error", "Overloaded")),
    )
    .await;

    let oracle = AnthropicOracle::from_config(&workspace.config_for(&server)).expect("oracle");
    match oracle.classify("ls", &contract()).await {
        Err(OracleError::ApiResponse {
            status,
            message,
            error_type,
        }) => {
            assert_eq!(status, 529);
            assert_eq!(message, "Overloaded");
            assert_eq!(error_type.as_deref(), Some("overloaded_error"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_json_body_is_malformed() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mount_messages(
        &server,
        ResponseTemplate::new(200).set_body_string("<html>gateway</html>"),
    )
    .await;

    let oracle = AnthropicOracle::from_config(&workspace.config_for(&server)).expect("oracle");
    let err = oracle.classify("ls", &contract()).await.expect_err("not JSON");
    assert!(matches!(err, OracleError::MalformedResponse(_)), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn text_answer_violates_contract() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mount_messages(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_test",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "auto_approve"}],
            "stop_reason": "end_turn"
        })),
    )
    .await;

    let oracle = AnthropicOracle::from_config(&workspace.config_for(&server)).expect("oracle");
    let err = oracle.classify("ls", &contract()).await.expect_err("no tool call");
    assert!(matches!(err, OracleError::ContractViolation(_)), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn out_of_enum_decision_violates_contract() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mount_decision(&server, "approve").await;

    let oracle = AnthropicOracle::from_config(&workspace.config_for(&server)).expect("oracle");
    let err = oracle.classify("ls", &contract()).await.expect_err("bad enum");
    assert!(matches!(err, OracleError::ContractViolation(_)), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn foreign_tool_violates_contract() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mount_messages(
        &server,
        ResponseTemplate::new(200).set_body_json(tool_use_response(
            "run_shell",
            json!({"decision": "auto_approve"}),
        )),
    )
    .await;

    let oracle = AnthropicOracle::from_config(&workspace.config_for(&server)).expect("oracle");
    let err = oracle.classify("ls", &contract()).await.expect_err("wrong tool");
    assert!(matches!(err, OracleError::ContractViolation(_)), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_endpoint_is_network_error() {
    let workspace = Workspace::new();
    let server = MockServer::start().await;
    let mut config = workspace.config_for(&server);
    // Port 9 (discard) is closed on test hosts.
    config.backend = BackendConfig::FirstParty {
        base_url: "http://127.0.0.1:9".to_string(),
        credential: Some(Credential::ApiKey(TEST_API_KEY.to_string())),
    };

    let oracle = AnthropicOracle::from_config(&config).expect("oracle");
    let err = oracle.classify("ls", &contract()).await.expect_err("refused");
    assert!(matches!(err, OracleError::Network(_)), "got {err:?}");
}
