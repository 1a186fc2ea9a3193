//! CLI command handling
//!
//! Dispatches CLI commands and prints their results.

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::paths::config_path;
use crate::common::Result;
use crate::scenario::{run_scenario, RunOptions, Scenario};

/// Dispatch a CLI command
///
/// Returns `Ok(false)` when the command ran but something it checked did
/// not pass.
pub async fn dispatch(command: Commands) -> Result<bool> {
    match command {
        Commands::Run {
            scenarios,
            verbose,
            timeout_ms,
            poll_ms,
            webdriver_url,
            base_url,
        } => {
            let mut config = Config::load()?;
            if let Some(ms) = timeout_ms {
                config.wait.timeout_ms = ms;
            }
            if let Some(ms) = poll_ms {
                config.wait.poll_ms = ms;
            }

            let mut options = RunOptions::from_config(&config);
            options.verbose = verbose;
            options.webdriver_url = webdriver_url;
            options.base_url = base_url;

            let mut failed = Vec::new();
            for path in &scenarios {
                let result = run_scenario(path, &config, &options).await?;
                if !result.passed() {
                    failed.push(result.name);
                }
            }

            if scenarios.len() > 1 {
                println!(
                    "{} of {} scenarios passed",
                    scenarios.len() - failed.len(),
                    scenarios.len()
                );
                for name in &failed {
                    println!("  {} {}", "✗".red(), name);
                }
            }
            Ok(failed.is_empty())
        }

        Commands::Validate { scenarios } => {
            let mut all_valid = true;
            for path in &scenarios {
                match Scenario::load(path) {
                    Ok(scenario) => println!(
                        "  {} {} ({} steps)",
                        "✓".green(),
                        path.display(),
                        scenario.steps.len()
                    ),
                    Err(e) => {
                        all_valid = false;
                        println!("  {} {}", "✗".red(), e);
                    }
                }
            }
            Ok(all_valid)
        }

        Commands::Config => {
            match config_path() {
                Some(path) if path.exists() => println!("Config file: {}", path.display()),
                Some(path) => println!("Config file: {} (not found, using defaults)", path.display()),
                None => println!("Config file: unavailable on this platform"),
            }

            let config = Config::load()?;
            println!();
            println!("[wait]");
            println!("timeout_ms = {}", config.wait.timeout_ms);
            println!("poll_ms = {}", config.wait.poll_ms);
            println!();
            println!("[webdriver]");
            println!("url = {:?}", config.webdriver.url);
            println!("command_timeout_secs = {}", config.webdriver.command_timeout_secs);
            println!();
            println!("[http]");
            println!("connect_timeout_secs = {}", config.http.connect_timeout_secs);
            println!("user_agent = {:?}", config.http.user_agent);
            Ok(true)
        }
    }
}
