//! On-disk layout for update tests.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::UpdaterConfig;

/// Repository URL used by fixtures. Nothing is fetched from it.
pub const FIXTURE_REPOSITORY: &str = "https://github.com/owner/app";

/// A temporary directory holding:
///
/// ```text
/// app/      installed application (package.json, index.js)
/// source/   content of the update (package.json, index.js, README.md)
/// tmp/      temp location for the workspace
/// ```
///
/// Removed when dropped.
pub struct UpdateFixture {
    temp: TempDir,
}

impl UpdateFixture {
    /// Installed application at `installed` and update content at `available`.
    pub fn new(installed: &str, available: &str) -> Result<Self> {
        let fixture = Self {
            temp: TempDir::new().context("Failed to create fixture directory")?,
        };
        fs::create_dir_all(fixture.temp_location())?;

        fixture.write_app_file("package.json", &manifest(installed))?;
        fixture.write_app_file("index.js", "console.log('v1');\n")?;

        fixture.write_source_file("package.json", &manifest(available))?;
        fixture.write_source_file("index.js", "console.log('v2');\n")?;
        fixture.write_source_file("README.md", "# app\n")?;
        fixture.write_source_file(".git/HEAD", "ref: refs/heads/master\n")?;
        Ok(fixture)
    }

    /// Root of the fixture.
    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Installed application directory.
    pub fn app_dir(&self) -> PathBuf {
        self.root().join("app")
    }

    /// Directory a [`super::FixtureCloner`] should copy.
    pub fn source_dir(&self) -> PathBuf {
        self.root().join("source")
    }

    /// Configured temp location.
    pub fn temp_location(&self) -> PathBuf {
        self.root().join("tmp")
    }

    /// Configuration for this fixture: no dependency stage, no completion
    /// command, and a short grace period.
    pub fn config(&self) -> UpdaterConfig {
        UpdaterConfig::new(FIXTURE_REPOSITORY, self.temp_location())
            .with_app_dir(self.app_dir())
            .with_install_command(None)
            .with_post_command_grace(std::time::Duration::from_millis(10))
    }

    /// Write `relative` under the application directory.
    pub fn write_app_file(&self, relative: &str, content: &str) -> Result<PathBuf> {
        write_file(&self.app_dir(), relative, content)
    }

    /// Write `relative` under the update source.
    pub fn write_source_file(&self, relative: &str, content: &str) -> Result<PathBuf> {
        write_file(&self.source_dir(), relative, content)
    }

    /// Read `relative` from the application directory.
    pub fn read_app_file(&self, relative: &str) -> Result<String> {
        let path = self.app_dir().join(relative);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// `package.json` body declaring `version`.
pub fn manifest(version: &str) -> String {
    format!("{{\n  \"name\": \"app\",\n  \"version\": \"{version}\"\n}}\n")
}

fn write_file(root: &Path, relative: &str, content: &str) -> Result<PathBuf> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
