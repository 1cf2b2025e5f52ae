//! Command-line entry point for the `shellgate` hook.
//!
//! The host runs the binary once per candidate command, with the hook event on
//! stdin. Stdout carries the allow directive or nothing; all diagnostics go to
//! stderr.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use shellgate_core::AnthropicOracle;
use shellgate_core::AuditLog;
use shellgate_core::ClassificationContract;
use shellgate_core::Gate;
use shellgate_core::GateConfig;
use shellgate_core::Oracle;
use shellgate_core::UnavailableOracle;
use shellgate_core::Verdict;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "shellgate",
    version,
    about = "Classify a proposed shell command and auto-approve it only if it is read-only"
)]
pub struct Cli {
    /// Model identifier (overrides BASH_CLASSIFIER_MODEL).
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Audit log path (overrides BASH_CLASSIFIER_LOG).
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Instruction document (overrides BASH_CLASSIFIER_PROMPT).
    #[arg(long = "prompt", value_name = "FILE")]
    pub prompt: Option<PathBuf>,

    /// Print the `classify` tool definition as JSON and exit without reading stdin.
    #[arg(long = "print-contract")]
    pub print_contract: bool,
}

impl Cli {
    /// Environment config with command-line overrides applied.
    pub fn resolve_config(&self) -> GateConfig {
        let mut config = GateConfig::from_env();
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(path) = &self.log_file {
            config.log_path = path.clone();
        }
        if let Some(path) = &self.prompt {
            config.instructions_path = path.clone();
        }
        config
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins; the default is `warn`.
pub fn init_logging() {
    let default_level = "warn";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    let config = cli.resolve_config();

    if cli.print_contract {
        return print_contract(&config);
    }

    tracing::debug!(
        model = %config.model,
        backend = config.backend.label(),
        log = %config.log_path.display(),
        instructions = %config.instructions_path.display(),
        "resolved configuration"
    );

    match AnthropicOracle::from_config(&config) {
        Ok(oracle) => {
            gate_stdin(oracle, &config).await;
        }
        Err(e) => {
            tracing::error!(error = %e, "oracle unavailable, escalating");
            gate_stdin(UnavailableOracle::new(e.to_string()), &config).await;
        }
    }

    // Exit status is always success once stdin was handled; silence on
    // stdout is the escalation.
    Ok(())
}

async fn gate_stdin<O: Oracle>(oracle: O, config: &GateConfig) -> Verdict {
    let gate = Gate::new(
        oracle,
        &config.instructions_path,
        AuditLog::new(config.log_path.clone()),
    );
    let mut stdout = std::io::stdout();
    gate.run(std::io::stdin(), &mut stdout).await
}

fn print_contract(config: &GateConfig) -> anyhow::Result<()> {
    let contract = ClassificationContract::load(&config.instructions_path)
        .context("loading classification instructions")?;
    let json = serde_json::to_string_pretty(&contract.to_tool())
        .context("formatting contract as JSON")?;

    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}
