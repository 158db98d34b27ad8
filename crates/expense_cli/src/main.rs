//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `expense_core` wiring.
//! - Open the configured store and report what it holds.

use expense_core::{init_logging, CoreConfig, ExpenseStore, ExpenseTracker};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("expense_cli error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = CoreConfig::from_env()?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(config.log_level, log_dir)?;
    }

    let tracker = ExpenseTracker::new(ExpenseStore::open(&config.storage)?);
    let expenses = tracker.get_expenses()?;

    println!("expense_core ping={}", expense_core::ping());
    println!("expense_core version={}", expense_core::core_version());
    println!("expense_core driver={}", tracker.repository().driver());
    println!("expense_core expenses={}", expenses.len());
    Ok(())
}
