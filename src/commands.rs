//! CLI command definitions
//!
//! Defines the clap commands for the stepguard CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Execute scenarios defined in YAML files
    Run {
        /// Paths to the YAML scenario files
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,

        /// Verbose output (step data and debug logs)
        #[arg(long, short)]
        verbose: bool,

        /// Default precondition wait in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Default delay between precondition checks in milliseconds
        #[arg(long)]
        poll_ms: Option<u64>,

        /// WebDriver server URL for every UI scenario
        #[arg(long)]
        webdriver_url: Option<String>,

        /// Base URL for every HTTP scenario
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Parse and check scenarios without running them
    Validate {
        /// Paths to the YAML scenario files
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,
    },

    /// Show the config file location and effective settings
    Config,
}

impl Commands {
    pub fn verbose(&self) -> bool {
        matches!(self, Commands::Run { verbose: true, .. })
    }
}
