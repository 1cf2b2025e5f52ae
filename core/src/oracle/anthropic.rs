//! Anthropic Messages API oracle.
//!
//! One non-streaming request per invocation, with the `classify` tool forced
//! through `tool_choice`. Two transports share the body and response format:
//! - first party: `POST {base}/v1/messages`
//! - Bedrock: `POST {base}/model/{model}/invoke`, authenticated with a
//!   Bedrock API key when one is set and SigV4 from the AWS chain otherwise

use std::time::Duration;

use async_trait::async_trait;
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::provider::SharedCredentialsProvider;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::{BackendConfig, Credential, GateConfig};
use crate::contract::ClassificationContract;

use super::{Oracle, OracleAnswer, OracleError, OracleResult, parse_messages_response, sigv4};

/// Anthropic API version header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Version marker Bedrock expects inside the request body.
pub const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

const USER_AGENT: &str = concat!("shellgate/", env!("CARGO_PKG_VERSION"));

/// Anthropic error response format.
#[derive(Debug, Deserialize)]
struct AnthropicError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Anthropic error wrapper.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: AnthropicError,
}

/// Bedrock reports errors as a bare message.
#[derive(Debug, Deserialize)]
struct BedrockErrorResponse {
    message: String,
}

/// How a prepared request is authenticated.
#[derive(Debug, PartialEq, Eq)]
enum Auth<'a> {
    /// The credential is already in the headers.
    Headers,
    /// Sign with SigV4 for `region` right before sending.
    SigV4 { region: &'a str },
}

/// Oracle backed by a Claude model.
#[derive(Debug, Clone)]
pub struct AnthropicOracle {
    client: reqwest::Client,
    backend: BackendConfig,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    aws_credentials: Option<SharedCredentialsProvider>,
}

impl AnthropicOracle {
    /// Build an oracle whose HTTP client enforces the configured timeout.
    pub fn from_config(config: &GateConfig) -> OracleResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| OracleError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Creates an oracle with a custom HTTP client.
    pub fn with_client(client: reqwest::Client, config: &GateConfig) -> Self {
        Self {
            client,
            backend: config.backend.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: config.timeout,
            aws_credentials: None,
        }
    }

    /// Sign Bedrock requests with `provider` instead of the default AWS chain.
    pub fn with_aws_credentials(mut self, provider: impl ProvideCredentials + 'static) -> Self {
        self.aws_credentials = Some(SharedCredentialsProvider::new(provider));
        self
    }

    /// Builds the request body. The command is the only user content.
    fn build_request_body(&self, command: &str, contract: &ClassificationContract) -> Value {
        let mut body = json!({
            "max_tokens": self.max_tokens,
            "tools": [contract.to_tool()],
            "tool_choice": contract.tool_choice(),
            "messages": [
                { "role": "user", "content": command }
            ],
        });

        match self.backend {
            BackendConfig::FirstParty { .. } => {
                body["model"] = json!(self.model);
            }
            BackendConfig::Bedrock { .. } => {
                body["anthropic_version"] = json!(BEDROCK_ANTHROPIC_VERSION);
            }
        }

        body
    }

    /// Endpoint, headers, and remaining auth step for the selected backend.
    fn endpoint(&self) -> OracleResult<(String, HeaderMap, Auth<'_>)> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match &self.backend {
            BackendConfig::FirstParty {
                base_url,
                credential,
            } => {
                match credential {
                    Some(Credential::ApiKey(key)) => {
                        headers.insert("x-api-key", header_value(key)?);
                    }
                    Some(Credential::AuthToken(token)) => {
                        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
                    }
                    None => return Err(OracleError::NotAuthenticated),
                }
                headers.insert(
                    "anthropic-version",
                    HeaderValue::from_static(ANTHROPIC_VERSION),
                );
                let url = format!("{}/v1/messages", base_url.trim_end_matches('/'));
                Ok((url, headers, Auth::Headers))
            }
            BackendConfig::Bedrock {
                base_url,
                region,
                bearer_token,
            } => {
                let url = format!(
                    "{}/model/{}/invoke",
                    base_url.trim_end_matches('/'),
                    urlencoding::encode(&self.model)
                );
                match bearer_token {
                    Some(token) => {
                        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
                        Ok((url, headers, Auth::Headers))
                    }
                    None => Ok((url, headers, Auth::SigV4 { region })),
                }
            }
        }
    }
}

fn header_value(value: &str) -> OracleResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| OracleError::InvalidConfig("credential is not a valid header value".into()))
}

/// Classify a non-success response by status.
fn error_from_status(status: u16, body: &str) -> OracleError {
    let (message, error_type) = if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        (parsed.error.message, Some(parsed.error.error_type))
    } else if let Ok(parsed) = serde_json::from_str::<BedrockErrorResponse>(body) {
        (parsed.message, None)
    } else {
        (body.to_string(), None)
    };

    match status {
        401 | 403 => OracleError::Authentication { status, message },
        429 => OracleError::RateLimited { message },
        _ => OracleError::ApiResponse {
            status,
            message,
            error_type,
        },
    }
}

#[async_trait]
impl Oracle for AnthropicOracle {
    async fn classify(
        &self,
        command: &str,
        contract: &ClassificationContract,
    ) -> OracleResult<OracleAnswer> {
        let (url, mut headers, auth) = self.endpoint()?;
        let body = serde_json::to_vec(&self.build_request_body(command, contract))
            .map_err(|e| OracleError::InvalidConfig(format!("failed to encode request: {e}")))?;

        if let Auth::SigV4 { region } = auth {
            tracing::debug!(region, "signing Bedrock request with AWS credentials");
            let credentials =
                sigv4::resolve_credentials(self.aws_credentials.as_ref(), region, self.timeout)
                    .await?;
            sigv4::sign_request(&url, &mut headers, &body, region, credentials)?;
        }

        tracing::debug!(
            backend = self.backend.label(),
            model = %self.model,
            command_len = command.len(),
            "sending classification request"
        );

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(OracleError::from_transport)?;

        let status = response.status();
        let text = response.text().await.map_err(OracleError::from_transport)?;

        if !status.is_success() {
            return Err(error_from_status(status.as_u16(), &text));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| OracleError::MalformedResponse(format!("response is not JSON: {e}")))?;

        parse_messages_response(&value)
    }
}
