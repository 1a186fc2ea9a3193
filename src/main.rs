//! stepguard - guarded action runner
//!
//! Runs YAML scenarios against a WebDriver/Appium server or an HTTP API,
//! one bounded wait per step, one report line per outcome.

use clap::Parser;
use stepguard::{cli, commands::Commands, common::logging};

#[derive(Parser)]
#[command(name = "stepguard", about = "Run scenarios of guarded UI and API actions")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.command.verbose());

    match cli::dispatch(cli.command).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
