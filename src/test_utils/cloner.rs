//! [`Cloner`] implementations that never run git.

use anyhow::Result;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::core::UpdateError;
use crate::git::{Cloner, display_url};
use crate::utils::fs::{CopyOptions, copy_dir};

/// Copies a prepared directory instead of cloning, recording each call.
#[derive(Debug, Clone)]
pub struct FixtureCloner {
    source: PathBuf,
    calls: Arc<Mutex<Vec<ClonedRef>>>,
}

/// One recorded [`FixtureCloner`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClonedRef {
    /// URL as passed in, token included
    pub url: String,
    /// Requested branch or tag
    pub reference: String,
}

impl FixtureCloner {
    /// Cloner copying `source` for every reference.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            calls: Arc::default(),
        }
    }

    /// Calls so far, oldest first.
    pub fn calls(&self) -> Vec<ClonedRef> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// References requested so far.
    pub fn references(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.reference).collect()
    }
}

impl Cloner for FixtureCloner {
    fn clone_ref<'a>(
        &'a self,
        url: &'a str,
        target: &'a Path,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(ClonedRef {
                    url: url.to_string(),
                    reference: reference.to_string(),
                });
            }
            let source = self.source.clone();
            let target = target.to_path_buf();
            tokio::task::spawn_blocking(move || {
                copy_dir(&source, &target, &CopyOptions::default())
            })
            .await?
        })
    }
}

/// Fails every clone as if the reference did not exist.
#[derive(Debug, Clone, Default)]
pub struct FailingCloner;

impl Cloner for FailingCloner {
    fn clone_ref<'a>(
        &'a self,
        url: &'a str,
        _target: &'a Path,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            Err(UpdateError::Clone {
                url: display_url(url),
                reference: reference.to_string(),
                reason: format!("Remote branch {reference} not found in upstream origin"),
            }
            .into())
        })
    }
}
