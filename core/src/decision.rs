//! Decision values and their mapping to hook output.
//!
//! This is the only place an allow directive is constructed. Both matches
//! below are exhaustive: a new decision or verdict variant does not
//! compile until its mapping is written.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::audit::AuditStatus;
use crate::error::GateError;
use crate::oracle::OracleAnswer;

/// Hook stage the allow directive is addressed to.
pub const PRE_TOOL_USE: &str = "PreToolUse";

/// The two answers the oracle may give.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationDecision {
    /// Read-only, non-mutating: run without asking.
    AutoApprove,
    /// Anything else: defer to the human.
    Escalate,
}

impl ClassificationDecision {
    /// Every decision, in schema order.
    pub const ALL: [Self; 2] = [Self::AutoApprove, Self::Escalate];

    /// Wire value used in the tool schema.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AutoApprove => "auto_approve",
            Self::Escalate => "escalate",
        }
    }
}

impl std::fmt::Display for ClassificationDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Oracle answered `auto_approve`.
    Allow {
        /// Raw tool input as returned by the oracle.
        raw: String,
    },
    /// Oracle answered `escalate`.
    Escalate { raw: String },
    /// No decision could be obtained.
    Error { detail: String },
}

impl Verdict {
    /// Fold a classification outcome into a verdict. Errors never approve.
    pub fn from_outcome(outcome: Result<OracleAnswer, GateError>) -> Self {
        match outcome {
            Ok(OracleAnswer { decision, raw }) => match decision {
                ClassificationDecision::AutoApprove => Self::Allow { raw },
                ClassificationDecision::Escalate => Self::Escalate { raw },
            },
            Err(e) => Self::Error {
                detail: e.to_string(),
            },
        }
    }

    /// Output for the host, if any. Absence means "ask the human".
    pub fn hook_output(&self) -> Option<HookOutput> {
        match self {
            Self::Allow { .. } => Some(HookOutput::allow()),
            Self::Escalate { .. } => None,
            Self::Error { .. } => None,
        }
    }

    pub fn status(&self) -> AuditStatus {
        match self {
            Self::Allow { .. } => AuditStatus::Allow,
            Self::Escalate { .. } => AuditStatus::Escalate,
            Self::Error { .. } => AuditStatus::Error,
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }
}

/// Structured allow directive understood by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    hook_specific_output: HookSpecificOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct HookSpecificOutput {
    hook_event_name: &'static str,
    permission_decision: &'static str,
}

impl HookOutput {
    fn allow() -> Self {
        Self {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: PRE_TOOL_USE,
                permission_decision: "allow",
            },
        }
    }

    /// Write the directive as a single JSON line.
    pub fn write_to(&self, mut writer: impl Write) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        writer.write_all(&line)?;
        writer.flush()
    }
}
