//! One invocation, start to finish.
//!
//! [`Gate::run`] reads the hook event, records that the command was seen,
//! classifies it, appends the outcome to the audit log and finally writes the
//! allow directive when (and only when) the verdict is [`Verdict::Allow`].
//! Audit and output failures are logged and never change the verdict.
//!
//! The instruction document is read once, in [`Gate::new`]. A gate that could
//! not read it escalates every command it is asked about.

use std::io::{Read, Write};
use std::path::Path;

use chrono::Local;

use crate::audit::{AuditLog, AuditRecord};
use crate::contract::ClassificationContract;
use crate::decision::Verdict;
use crate::error::{InstructionsError, Result};
use crate::event::InvocationEvent;
use crate::oracle::{Oracle, OracleAnswer};

pub struct Gate<O> {
    oracle: O,
    contract: std::result::Result<ClassificationContract, InstructionsError>,
    audit: AuditLog,
}

impl<O: Oracle> Gate<O> {
    /// Build a gate, loading the contract from `instructions_path` now.
    pub fn new(oracle: O, instructions_path: impl AsRef<Path>, audit: AuditLog) -> Self {
        Self {
            oracle,
            contract: ClassificationContract::load(instructions_path.as_ref()),
            audit,
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Handle one hook invocation read from `input`, writing the allow
    /// directive (if any) to `output`.
    pub async fn run(&self, input: impl Read, output: &mut impl Write) -> Verdict {
        let event = InvocationEvent::from_reader(input);
        let command = event.command();
        let observed_at = Local::now();

        if let Err(e) = self.audit.observe(observed_at, command) {
            tracing::warn!(
                path = %self.audit.path().display(),
                error = %e,
                "failed to write audit log"
            );
        }

        let verdict = self.evaluate(command).await;

        let record = AuditRecord::new(observed_at, command, &verdict);
        if let Err(e) = self.audit.append(&record) {
            tracing::warn!(
                path = %self.audit.path().display(),
                error = %e,
                "failed to write audit log"
            );
        }

        tracing::info!(
            status = %verdict.status(),
            session_id = event.session_id.as_deref().unwrap_or_default(),
            "command classified"
        );

        if let Some(directive) = verdict.hook_output() {
            if let Err(e) = directive.write_to(&mut *output) {
                tracing::warn!(error = %e, "failed to write hook output");
            }
        }

        verdict
    }

    /// Classify `command` without touching the audit log or any output.
    pub async fn evaluate(&self, command: &str) -> Verdict {
        let outcome = self.classify(command).await;
        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "classification failed, escalating");
        }
        Verdict::from_outcome(outcome)
    }

    async fn classify(&self, command: &str) -> Result<OracleAnswer> {
        let contract = self.contract.as_ref().map_err(Clone::clone)?;
        Ok(self.oracle.classify(command, contract).await?)
    }
}
