//! Root of the `shellgate-core` library.
//!
//! A pre-execution gate for shell commands proposed by an agent. Each command
//! is sent to a model that is forced to answer through a single `classify`
//! tool with an enum-typed `decision` field. Only an explicit `auto_approve`
//! produces an allow directive; every other outcome, including every failure,
//! produces nothing and leaves the command to the host's normal approval flow.

// Stdout carries the hook protocol. Library code must never print to it (or
// to stderr); diagnostics go through `tracing`.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod audit;
pub mod config;
pub mod contract;
pub mod decision;
pub mod error;
pub mod event;
pub mod gate;
pub mod oracle;

pub use audit::{AuditLog, AuditRecord, AuditStatus};
pub use config::{BackendConfig, GateConfig};
pub use contract::{CLASSIFY_TOOL_NAME, ClassificationContract};
pub use decision::{ClassificationDecision, HookOutput, Verdict};
pub use error::{GateError, InstructionsError, Result};
pub use event::InvocationEvent;
pub use gate::Gate;
pub use oracle::{
    AnthropicOracle, Oracle, OracleAnswer, OracleError, OracleResult, UnavailableOracle,
};
