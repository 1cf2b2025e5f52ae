//! Oracle boundary.
//!
//! An [`Oracle`] turns a command plus the [`ClassificationContract`] into a
//! [`ClassificationDecision`], or an error. It never guesses: an answer that
//! does not fit the contract is an [`OracleError::ContractViolation`].

mod anthropic;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
mod sigv4;

pub use anthropic::{ANTHROPIC_VERSION, AnthropicOracle, BEDROCK_ANTHROPIC_VERSION};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::contract::{CLASSIFY_TOOL_NAME, ClassificationContract};
use crate::decision::ClassificationDecision;

/// Errors from the oracle boundary.
#[derive(Debug, Error)]
pub enum OracleError {
    /// No credentials are configured for the selected backend.
    #[error("Not authenticated with provider")]
    NotAuthenticated,

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Network request failed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Credentials were rejected (401/403).
    #[error("Authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    /// Provider asked us to slow down (429).
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// API returned any other error response.
    #[error("API error ({status}): {message}")]
    ApiResponse {
        /// HTTP status code.
        status: u16,
        /// Error message from API.
        message: String,
        /// Error type (if provided).
        error_type: Option<String>,
    },

    /// The AWS credential chain failed for a reason other than "no credentials".
    #[error("AWS credentials unavailable: {0}")]
    AwsCredentials(String),

    /// SigV4 signing of the Bedrock request failed.
    #[error("Request signing failed: {0}")]
    Signing(String),

    /// Response body was not JSON.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Response was JSON but did not carry a valid `classify` answer.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl OracleError {
    /// Map a transport failure, keeping timeouts distinct.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err)
        }
    }
}

/// Result type for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;

/// A decision as returned by the oracle, with its raw payload for auditing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleAnswer {
    pub decision: ClassificationDecision,
    /// The tool input exactly as the oracle produced it, re-serialized.
    pub raw: String,
}

/// Anything that can classify a command under the contract.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Issue one classification request. No retries.
    async fn classify(
        &self,
        command: &str,
        contract: &ClassificationContract,
    ) -> OracleResult<OracleAnswer>;
}

/// Stand-in used when the real oracle could not be constructed. Every call
/// fails, so the gate still records the invocation and escalates.
#[derive(Debug, Clone)]
pub struct UnavailableOracle {
    reason: String,
}

impl UnavailableOracle {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Oracle for UnavailableOracle {
    async fn classify(
        &self,
        _command: &str,
        _contract: &ClassificationContract,
    ) -> OracleResult<OracleAnswer> {
        Err(OracleError::InvalidConfig(self.reason.clone()))
    }
}

/// Arguments of the `classify` tool. `decision` must be one of the enum
/// values; anything else fails deserialization.
#[derive(Debug, Deserialize)]
struct ClassifyInput {
    decision: ClassificationDecision,
}

/// Validate a `classify` tool input.
pub(crate) fn parse_tool_input(input: &Value) -> OracleResult<OracleAnswer> {
    let raw = input.to_string();
    let ClassifyInput { decision } = ClassifyInput::deserialize(input)
        .map_err(|e| OracleError::ContractViolation(format!("invalid classify input {raw}: {e}")))?;
    Ok(OracleAnswer { decision, raw })
}

/// Pull the forced `classify` call out of a Messages API response body.
pub(crate) fn parse_messages_response(body: &Value) -> OracleResult<OracleAnswer> {
    let blocks = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| OracleError::ContractViolation("response has no content blocks".into()))?;

    let tool_use = blocks
        .iter()
        .find(|block| block.get("type").and_then(Value::as_str) == Some("tool_use"))
        .ok_or_else(|| {
            let stop_reason = body
                .get("stop_reason")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            OracleError::ContractViolation(format!(
                "response has no tool_use block (stop_reason: {stop_reason})"
            ))
        })?;

    let name = tool_use.get("name").and_then(Value::as_str).unwrap_or_default();
    if name != CLASSIFY_TOOL_NAME {
        return Err(OracleError::ContractViolation(format!(
            "unexpected tool {name:?}"
        )));
    }

    let input = tool_use
        .get("input")
        .ok_or_else(|| OracleError::ContractViolation("tool_use block has no input".into()))?;
    parse_tool_input(input)
}
