//! SCORCH CLI Library
//!
//! Command-line front end for the SCORCH ledger, presale/vesting schedule
//! and distribution collaborators. State lives in a JSON snapshot on disk;
//! fixed deployment parameters come from `scorch.toml`.
//!
//! ## Layout
//!
//! - `argument_parsing`: clap definitions and `run_cli`
//! - `cli_config`: TOML configuration
//! - `state`: snapshot persistence and wiring of the live handles
//! - `commands`: one handler per subcommand, plus the keeper loop
//! - `output`: testable printing

pub mod argument_parsing;
pub mod cli_config;
pub mod commands;
pub mod error;
pub mod output;
pub mod state;

pub use argument_parsing::{run_cli, ScorchCli, ScorchCommand};
pub use cli_config::{load_config, ScorchConfig};
pub use error::{CliError, CliResult};
pub use output::{ConsoleOutput, Output};
pub use state::{ScorchSystem, StateSnapshot};

/// SCORCH CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
