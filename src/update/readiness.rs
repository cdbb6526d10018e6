//! Readiness gate for release-based updates.
//!
//! When an updater tracks the latest release, its reference is unknown until
//! the release lookup finishes. The gate holds that lookup's state in a
//! `tokio::sync::watch` channel owned by one [`super::AutoUpdater`], so
//! several updaters in one process never share it and waiters are woken
//! instead of polling.
//!
//! ```text
//! Configured ──(release lookup starts)──▶ Pending ──▶ Resolved(tag)
//!                                                 └─▶ Failed(error)
//! ```
//!
//! `Resolved` and `Failed` are terminal: the tag is written once.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::core::UpdateError;

/// Where the effective reference comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceState {
    /// Use the configured branch. Ready.
    Configured,
    /// The release lookup is in flight. Not ready.
    Pending,
    /// The latest release tag. Ready.
    Resolved(String),
    /// The release lookup failed. Ready, but updates are refused.
    Failed(UpdateError),
}

impl ReferenceState {
    /// Whether waiters may proceed.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Single-writer, many-reader cell for the effective reference.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    state: Arc<watch::Sender<ReferenceState>>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    /// A ready gate using the configured branch.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(ReferenceState::Configured);
        Self {
            state: Arc::new(state),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ReferenceState {
        self.state.borrow().clone()
    }

    /// Whether no release lookup is in flight.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    /// Close the gate while the release lookup runs.
    ///
    /// Has no effect once a tag has been resolved or the lookup has failed.
    pub fn mark_pending(&self) {
        self.state.send_if_modified(|state| {
            if matches!(state, ReferenceState::Configured) {
                *state = ReferenceState::Pending;
                true
            } else {
                false
            }
        });
    }

    /// Publish the resolved tag and open the gate.
    ///
    /// Returns `false` if the gate was not pending, in which case nothing changes.
    pub fn resolve(&self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        self.finish(ReferenceState::Resolved(tag))
    }

    /// Record a failed lookup and open the gate.
    pub fn fail(&self, error: UpdateError) -> bool {
        self.finish(ReferenceState::Failed(error))
    }

    fn finish(&self, terminal: ReferenceState) -> bool {
        self.state.send_if_modified(move |state| {
            if matches!(state, ReferenceState::Pending) {
                *state = terminal;
                true
            } else {
                false
            }
        })
    }

    /// The resolved tag, if any.
    #[must_use]
    pub fn resolved_tag(&self) -> Option<String> {
        match &*self.state.borrow() {
            ReferenceState::Resolved(tag) => Some(tag.clone()),
            _ => None,
        }
    }

    /// Wait until the gate is open and return the state it opened with.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ReleaseResolution`] when `timeout` elapses first.
    pub async fn wait_ready(
        &self,
        timeout: Option<Duration>,
    ) -> Result<ReferenceState, UpdateError> {
        let mut receiver = self.state.subscribe();
        let wait = async move {
            match receiver.wait_for(ReferenceState::is_ready).await {
                Ok(state) => Ok((*state).clone()),
                Err(_) => Err(UpdateError::ReleaseResolution {
                    reason: "release lookup was dropped".to_string(),
                }),
            }
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                UpdateError::ReleaseResolution {
                    reason: format!("not resolved within {} ms", limit.as_millis()),
                }
            })?,
            None => wait.await,
        }
    }
}
