//! Integration test suite for git-autoupdate
//!
//! End-to-end tests driving [`git_autoupdate::update::AutoUpdater`] against
//! on-disk fixtures, `mockito` HTTP servers and the real shell, plus tests of
//! the `git-autoupdate` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **auto_update**: version comparison, release resolution and the update decision
//! - **pipeline**: stage ordering, failure isolation, ignored files, dependency diagnostics
//! - **cli**: argument handling and error rendering of the binary

mod auto_update;
mod cli;
mod pipeline;

use git_autoupdate::test_utils::fixtures::manifest;
use mockito::{Mock, ServerGuard};

/// Serve `version` as the manifest of `owner/app` at `reference`.
pub async fn serve_manifest(server: &mut ServerGuard, reference: &str, version: &str) -> Mock {
    server
        .mock("GET", format!("/owner/app/{reference}/package.json").as_str())
        .with_status(200)
        .with_body(manifest(version))
        .create_async()
        .await
}
