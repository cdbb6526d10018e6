//! Test utilities for git-autoupdate
//!
//! Helpers shared by unit and integration tests:
//! - [`init_test_logging`] wires `tracing` output into the test harness
//! - [`UpdateFixture`] lays out an installed application, an update source
//!   and a temp location in one temporary directory
//! - [`FixtureCloner`] and [`FailingCloner`] replace git in the download stage
//!
//! Available in unit tests and, with the `test-utils` feature, to the
//! integration tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use git_autoupdate::test_utils::{FixtureCloner, UpdateFixture};
//! use git_autoupdate::update::AutoUpdater;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let fixture = UpdateFixture::new("1.0.0", "2.0.0")?;
//! let cloner = FixtureCloner::new(fixture.source_dir());
//! let updater = AutoUpdater::with_cloner(fixture.config(), Arc::new(cloner))?;
//! assert!(updater.force_update().await);
//! # Ok(())
//! # }
//! ```

pub mod cloner;
pub mod fixtures;

pub use cloner::{FailingCloner, FixtureCloner};
pub use fixtures::UpdateFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`. Without either, tests run
/// silently. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true) // Show targets like "git"
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
