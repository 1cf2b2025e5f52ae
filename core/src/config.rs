//! Gate configuration.
//!
//! Everything comes from the environment with hardcoded defaults; the CLI may
//! override individual fields afterwards. Nothing here fails: credentials are
//! checked when the oracle is called, so a missing key escalates instead of
//! crashing the hook.

use std::path::PathBuf;
use std::time::Duration;

/// Audit log location shared by every gate instance on the machine.
pub const DEFAULT_LOG_PATH: &str = "/tmp/bash_classifier_log.log";

/// Instruction document expected next to the executable.
pub const DEFAULT_INSTRUCTIONS_FILENAME: &str = "classify_bash_prompt.md";

pub const DEFAULT_MODEL: &str = "claude-opus-4-5";

/// Bedrock needs a provider-qualified model id.
pub const DEFAULT_BEDROCK_MODEL: &str = "us.anthropic.claude-opus-4-5-20251101-v1:0";

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

pub const DEFAULT_BEDROCK_REGION: &str = "us-east-1";

/// The answer is one tool call with one enum argument.
pub const DEFAULT_MAX_TOKENS: u32 = 64;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable names.
pub mod env {
    pub const MODEL: &str = "BASH_CLASSIFIER_MODEL";
    pub const USE_BEDROCK: &str = "CLAUDE_CODE_USE_BEDROCK";
    pub const LOG_PATH: &str = "BASH_CLASSIFIER_LOG";
    pub const INSTRUCTIONS_PATH: &str = "BASH_CLASSIFIER_PROMPT";
    pub const TIMEOUT_SECS: &str = "BASH_CLASSIFIER_TIMEOUT_SECS";
    pub const ANTHROPIC_BASE_URL: &str = "ANTHROPIC_BASE_URL";
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
    pub const ANTHROPIC_AUTH_TOKEN: &str = "ANTHROPIC_AUTH_TOKEN";
    pub const AWS_REGION: &str = "AWS_REGION";
    pub const AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
    pub const AWS_BEARER_TOKEN_BEDROCK: &str = "AWS_BEARER_TOKEN_BEDROCK";
    pub const BEDROCK_BASE_URL: &str = "ANTHROPIC_BEDROCK_BASE_URL";
}

/// First-party credential, in order of preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Sent as `x-api-key`.
    ApiKey(String),
    /// Sent as `Authorization: Bearer`.
    AuthToken(String),
}

/// Which transport carries the classification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Anthropic Messages API.
    FirstParty {
        base_url: String,
        credential: Option<Credential>,
    },
    /// Amazon Bedrock `InvokeModel`. Uses the Bedrock API key when set and
    /// otherwise signs with SigV4 for `region` using the default AWS chain.
    Bedrock {
        base_url: String,
        region: String,
        bearer_token: Option<String>,
    },
}

impl BackendConfig {
    pub fn is_bedrock(&self) -> bool {
        matches!(self, Self::Bedrock { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FirstParty { .. } => "anthropic",
            Self::Bedrock { .. } => "bedrock",
        }
    }
}

/// Resolved settings for one gate process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub model: String,
    pub backend: BackendConfig,
    pub max_tokens: u32,
    /// Upper bound on the whole oracle request.
    pub timeout: Duration,
    pub log_path: PathBuf,
    pub instructions_path: PathBuf,
}

impl GateConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let backend = if get(env::USE_BEDROCK).is_some_and(|v| flag_enabled(&v)) {
            let region = get(env::AWS_REGION)
                .or_else(|| get(env::AWS_DEFAULT_REGION))
                .unwrap_or_else(|| DEFAULT_BEDROCK_REGION.to_string());
            BackendConfig::Bedrock {
                base_url: get(env::BEDROCK_BASE_URL)
                    .unwrap_or_else(|| format!("https://bedrock-runtime.{region}.amazonaws.com")),
                region,
                bearer_token: get(env::AWS_BEARER_TOKEN_BEDROCK),
            }
        } else {
            let credential = get(env::ANTHROPIC_API_KEY)
                .map(Credential::ApiKey)
                .or_else(|| get(env::ANTHROPIC_AUTH_TOKEN).map(Credential::AuthToken));
            BackendConfig::FirstParty {
                base_url: get(env::ANTHROPIC_BASE_URL)
                    .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
                credential,
            }
        };

        let model = get(env::MODEL).unwrap_or_else(|| {
            if backend.is_bedrock() {
                DEFAULT_BEDROCK_MODEL.to_string()
            } else {
                DEFAULT_MODEL.to_string()
            }
        });

        let timeout = match get(env::TIMEOUT_SECS) {
            Some(raw) => parse_timeout(&raw).unwrap_or_else(|| {
                tracing::warn!(
                    value = %raw,
                    "invalid {}, using default",
                    env::TIMEOUT_SECS
                );
                DEFAULT_TIMEOUT
            }),
            None => DEFAULT_TIMEOUT,
        };

        Self {
            model,
            backend,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout,
            log_path: get(env::LOG_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
            instructions_path: get(env::INSTRUCTIONS_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(default_instructions_path),
        }
    }
}

/// A toggle counts as on unless it spells out "off".
fn flag_enabled(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

fn parse_timeout(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().parse().ok()?;
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

/// `classify_bash_prompt.md` beside the running executable, falling back to
/// the working directory.
fn default_instructions_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_INSTRUCTIONS_FILENAME)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTRUCTIONS_FILENAME))
}
