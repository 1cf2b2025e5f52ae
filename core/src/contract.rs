//! The `classify` tool contract.
//!
//! The model is not asked for prose. It is handed exactly one tool whose only
//! argument is an enum, and the request forces that tool. The instruction
//! document becomes the tool description, so the policy can change without
//! touching this crate.

use std::path::Path;

use serde::Serialize;
use serde_json::{Value, json};

use crate::decision::ClassificationDecision;
use crate::error::InstructionsError;

/// Name of the single operation the oracle may invoke.
pub const CLASSIFY_TOOL_NAME: &str = "classify";

/// Name of the required argument carrying the decision.
pub const DECISION_FIELD: &str = "decision";

/// Immutable tool definition sent with every classification request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationContract {
    name: &'static str,
    description: String,
    input_schema: Value,
}

impl ClassificationContract {
    /// Build the contract around the given policy text.
    pub fn from_instructions(instructions: impl Into<String>) -> Self {
        let allowed: Vec<&'static str> = ClassificationDecision::ALL
            .into_iter()
            .map(ClassificationDecision::as_str)
            .collect();

        Self {
            name: CLASSIFY_TOOL_NAME,
            description: instructions.into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "decision": {
                        "type": "string",
                        "enum": allowed,
                    },
                },
                "required": [DECISION_FIELD],
            }),
        }
    }

    /// Read the instruction document and build the contract from it.
    pub fn load(path: &Path) -> Result<Self, InstructionsError> {
        let instructions =
            std::fs::read_to_string(path).map_err(|e| InstructionsError::new(path, e))?;
        tracing::debug!(
            path = %path.display(),
            bytes = instructions.len(),
            "loaded classification instructions"
        );
        Ok(Self::from_instructions(instructions))
    }

    /// The policy text bound to the tool.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Tool definition in Messages API form.
    pub fn to_tool(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.input_schema,
        })
    }

    /// `tool_choice` that leaves the model no option but this tool.
    pub fn tool_choice(&self) -> Value {
        json!({ "type": "tool", "name": self.name })
    }
}
