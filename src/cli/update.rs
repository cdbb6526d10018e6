//! Handlers for each CLI mode.

use anyhow::Result;
use colored::Colorize;
use tracing::debug;

use crate::config::UpdaterConfig;
use crate::update::{AutoUpdater, UpdateOutcome, UpdateReport};
use crate::utils::platform::command_exists;

/// Compare, then update if the versions differ.
pub async fn auto(config: UpdaterConfig) -> Result<()> {
    warn_missing_install_tool(&config);
    let updater = AutoUpdater::new(config)?;

    println!("{}", "Checking for updates...".cyan());
    match updater.try_auto_update().await? {
        UpdateOutcome::UpToDate(comparison) => {
            println!(
                "{}",
                format!("Already up to date ({})", comparison.current_version).green()
            );
        }
        UpdateOutcome::Updated {
            comparison,
            report,
        } => {
            if !comparison.is_error() {
                println!(
                    "Updated {} -> {}",
                    comparison.current_version, comparison.remote_version
                );
            }
            print_report(&report);
        }
    }
    Ok(())
}

/// Print the version comparison against the reference updates would use.
pub async fn check(config: UpdaterConfig, json: bool) -> Result<()> {
    let updater = AutoUpdater::new(config)?;
    updater.wait_ready().await?;
    let comparison = updater.try_compare_versions().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
        return Ok(());
    }

    if comparison.up_to_date {
        println!(
            "{}",
            format!("Up to date ({})", comparison.current_version).green()
        );
    } else {
        println!(
            "{}",
            format!(
                "Update available: {} -> {} ({})",
                comparison.current_version,
                comparison.remote_version,
                updater.reference()
            )
            .yellow()
        );
        println!("Run `git-autoupdate` to install it");
    }
    Ok(())
}

/// Update without comparing versions.
pub async fn force(config: UpdaterConfig) -> Result<()> {
    warn_missing_install_tool(&config);
    let updater = AutoUpdater::new(config)?;
    let reference = updater.wait_ready().await?;

    println!("{}", format!("Updating to '{reference}'...").cyan());
    let report = updater.try_force_update().await?;
    print_report(&report);
    Ok(())
}

/// Restore the last backup.
pub async fn rollback(config: UpdaterConfig) -> Result<()> {
    let updater = AutoUpdater::new(config)?;

    println!("{}", "Restoring the previous version...".yellow());
    updater.restore_backup().await?;
    println!("{}", "Restored from backup".green());
    Ok(())
}

fn print_report(report: &UpdateReport) {
    let stages = report.stages.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
    println!("{}", format!("Installed '{}'", report.reference).green());
    debug!("Completed stages: {stages}");
}

/// Warn when the install command's program is not on `PATH`.
fn warn_missing_install_tool(config: &UpdaterConfig) {
    let Some(program) = config.install_command().and_then(|cmd| cmd.split_whitespace().next())
    else {
        return;
    };
    if !command_exists(program) {
        eprintln!(
            "{}: `{program}` was not found on PATH; the dependency install will fail",
            "warning".yellow()
        );
    }
}
