use clap::Parser;
use shellgate_cli::Cli;
use shellgate_cli::init_logging;
use shellgate_cli::run_main;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();
    run_main(Cli::parse()).await
}
