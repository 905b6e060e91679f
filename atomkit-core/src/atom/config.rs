//! Atom configuration.
//!
//! Every atom carries an [`AtomConfig`]. The defaults reproduce the classic
//! atom behavior: upstream subscriptions are never dropped, and an
//! asynchronous result that finishes after a newer one has been applied is
//! discarded.

use serde::{Deserialize, Serialize};

use super::error::{AtomError, Result};

/// What a derived atom does with upstream atoms it stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamPolicy {
    /// Keep every upstream subscription ever made. The set only grows.
    #[default]
    Retain,

    /// After each derivation, unsubscribe from upstream atoms that the
    /// derivation did not read this time.
    Prune,
}

/// What happens when recomputations finish out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleResults {
    /// Apply a result only if its generation is newer than the last applied one.
    #[default]
    Discard,

    /// Apply every result as it completes; the last to finish wins.
    Apply,
}

/// Per-atom configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AtomConfig {
    /// Upstream subscription policy.
    pub upstream: UpstreamPolicy,

    /// Out-of-order completion policy.
    pub stale_results: StaleResults,

    /// Name used in logs and `Debug` output.
    pub label: Option<String>,
}

impl AtomConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upstream(mut self, upstream: UpstreamPolicy) -> Self {
        self.upstream = upstream;
        self
    }

    pub fn with_stale_results(mut self, stale_results: StaleResults) -> Self {
        self.stale_results = stale_results;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AtomError::Config(e.to_string()))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
