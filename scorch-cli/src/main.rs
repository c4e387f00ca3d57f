//! SCORCH Command-Line Interface
//!
//! Entry point for the scorch-cli binary.

use scorch_cli::run_cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_cli().await
}
