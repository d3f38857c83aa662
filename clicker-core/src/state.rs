//! Canonical persisted snapshot of player progression.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Everything that survives a restart.
///
/// Sets and maps are ordered so that encoding the same state twice always yields
/// the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveState {
    pub score: u64,
    /// UI preference persisted next to gameplay data for historical reasons.
    pub controls_visible: bool,
    pub unlocked_achievements: BTreeSet<String>,
    /// Absent key means not purchased.
    pub purchased_upgrades: BTreeMap<String, bool>,
    pub mini_event_click_count: u64,
}

impl SaveState {
    /// Builder-style helper used by tools and tests.
    #[must_use]
    pub fn with_score(mut self, score: u64) -> Self {
        self.score = score;
        self
    }

    #[must_use]
    pub fn with_achievements<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unlocked_achievements = ids.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_upgrades<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.purchased_upgrades = ids.into_iter().map(|id| (id.into(), true)).collect();
        self
    }

    #[must_use]
    pub fn is_purchased(&self, upgrade_id: &str) -> bool {
        self.purchased_upgrades
            .get(upgrade_id)
            .copied()
            .unwrap_or(false)
    }

    /// True for the all-zero first-run state.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        *self == Self::default()
    }
}
