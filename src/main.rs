//! git-autoupdate CLI entry point
//!
//! Parses arguments, runs the selected mode and renders failures with a
//! suggestion before exiting with status 1.

use anyhow::Result;
use clap::Parser;
use git_autoupdate::cli;
use git_autoupdate::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
