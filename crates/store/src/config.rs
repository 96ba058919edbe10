//! Serializable configuration for projections and the async driver.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sift_core::Identity;

use crate::{FilterSpec, Projector, SortSpec};

/// Host-named filter/sort plus observed paths, as loaded from JSON or env.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Name of a host filter method.
    pub filter: Option<String>,
    /// Name of a host comparator method.
    pub sort: Option<String>,
    /// Whitespace-separated observed paths.
    pub observe: String,
}

impl ProjectionConfig {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("parsing projection config")
    }

    /// Read `SIFT_FILTER`, `SIFT_SORT` and `SIFT_OBSERVE`.
    pub fn from_env() -> Self {
        Self {
            filter: std::env::var("SIFT_FILTER").ok().filter(|s| !s.is_empty()),
            sort: std::env::var("SIFT_SORT").ok().filter(|s| !s.is_empty()),
            observe: std::env::var("SIFT_OBSERVE").unwrap_or_default(),
        }
    }

    /// Install this configuration on `p`. Filter and sort changes schedule a recompute.
    pub fn apply_to<T: Clone + Identity>(&self, p: &mut Projector<T>) {
        p.set_filter(self.filter.as_ref().map(|n| FilterSpec::Named(n.clone())));
        p.set_sort(self.sort.as_ref().map(|n| SortSpec::Named(n.clone())));
        p.set_observe(&self.observe);
    }
}

/// Knobs for [`spawn_projection`](crate::spawn_projection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Command channel capacity.
    pub mailbox: usize,
}

impl Default for DriverConfig {
    fn default() -> Self { Self { mailbox: 256 } }
}

impl DriverConfig {
    /// Defaults, overridden by `SIFT_MAILBOX_CAP` when it parses.
    pub fn from_env() -> Self {
        let mailbox = std::env::var("SIFT_MAILBOX_CAP")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(256);
        Self { mailbox }
    }
}
