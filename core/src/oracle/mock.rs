//! Scripted oracle for tests.
//!
//! Answers go through the same tool-input validation as the HTTP oracle, so a
//! corrupted decision is rejected exactly as it would be in production.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Oracle, OracleAnswer, OracleError, OracleResult, parse_tool_input};
use crate::contract::ClassificationContract;
use crate::decision::ClassificationDecision;

type ErrorFactory = Arc<dyn Fn() -> OracleError + Send + Sync>;

enum Behavior {
    ToolInput(Value),
    Fail(ErrorFactory),
}

/// Oracle that returns a fixed answer and records every command it sees.
pub struct MockOracle {
    behavior: Behavior,
    calls: Mutex<Vec<String>>,
    descriptions: Mutex<Vec<String>>,
}

impl MockOracle {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
            descriptions: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `decision`.
    pub fn deciding(decision: ClassificationDecision) -> Self {
        Self::with_tool_input(json!({ "decision": decision.as_str() }))
    }

    /// Always answers with this raw `classify` input, valid or not.
    pub fn with_tool_input(input: Value) -> Self {
        Self::new(Behavior::ToolInput(input))
    }

    /// Always fails with the error produced by `make_error`.
    pub fn failing(make_error: impl Fn() -> OracleError + Send + Sync + 'static) -> Self {
        Self::new(Behavior::Fail(Arc::new(make_error)))
    }

    /// Commands received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Contract descriptions received so far, in order.
    pub fn descriptions(&self) -> Vec<String> {
        self.descriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn classify(
        &self,
        command: &str,
        contract: &ClassificationContract,
    ) -> OracleResult<OracleAnswer> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.to_string());
        self.descriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(contract.description().to_string());

        match &self.behavior {
            Behavior::ToolInput(input) => parse_tool_input(input),
            Behavior::Fail(make_error) => Err(make_error()),
        }
    }
}
