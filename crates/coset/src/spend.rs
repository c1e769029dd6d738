//! Local spend accounting against a configurable ceiling.
//!
//! The guard checks the ceiling before a paid operation, never after, so a
//! forced or already-approved update may push the total past the limit.

use serde::{Deserialize, Serialize};

/// Ceiling on cumulative spend, in token base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum SpendLimit {
    #[default]
    Unbounded,
    /// A negative limit is accepted and counts as already exceeded.
    Limited(i128),
}

/// Snapshot of what has been spent and the current ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendState {
    pub spent_total: u128,
    pub spending_limit: SpendLimit,
}

/// Single-writer owner of a [`SpendState`].
#[derive(Debug, Clone, Default)]
pub struct SpendGuard {
    state: SpendState,
}

impl SpendGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: i128) -> Self {
        let mut guard = Self::new();
        guard.set_limit(limit);
        guard
    }

    /// Whether a paid operation may start.
    pub fn can_spend(&self, force: bool) -> bool {
        if force {
            return true;
        }
        match self.state.spending_limit {
            SpendLimit::Unbounded => true,
            SpendLimit::Limited(limit) => i128::try_from(self.state.spent_total)
                .map(|spent| spent < limit)
                .unwrap_or(false),
        }
    }

    /// Add a settled cost. Not clamped against the limit.
    pub fn record(&mut self, amount: u128) {
        self.state.spent_total = self.state.spent_total.saturating_add(amount);
        tracing::debug!(
            amount = %amount,
            spent_total = %self.state.spent_total,
            "recorded spend"
        );
    }

    /// Replace the limit; applies to the next gate check.
    pub fn set_limit(&mut self, limit: i128) {
        self.state.spending_limit = SpendLimit::Limited(limit);
    }

    /// Remove the limit.
    pub fn clear_limit(&mut self) {
        self.state.spending_limit = SpendLimit::Unbounded;
    }

    pub fn spent(&self) -> u128 {
        self.state.spent_total
    }

    pub fn limit(&self) -> SpendLimit {
        self.state.spending_limit
    }

    pub fn state(&self) -> SpendState {
        self.state
    }
}
