//! Live progression for one play session: score, achievements, upgrades.
//!
//! Every score mutation in [`ProgressionModel`] is followed by an achievement
//! check, so thresholds crossed by clicks, console adjustments, passive income or a
//! restore are never missed.

pub mod achievements;
pub mod mini_event;
pub mod upgrades;

use std::time::Duration;

pub use achievements::{
    AchievementDefinition, AchievementRegistry, AchievementTracker, AchievementTrigger,
    UnlockNotification,
};
pub use mini_event::{MiniEventOutcome, MiniEventReward};
pub use upgrades::{UpgradeCatalog, UpgradeDefinition, UpgradeEffect, UpgradeStore};

use crate::error::PurchaseError;
use crate::state::SaveState;

#[derive(Debug, Clone)]
pub struct ProgressionModel {
    score: u64,
    controls_visible: bool,
    mini_event_clicks: u64,
    achievements: AchievementTracker,
    upgrades: UpgradeStore,
    passive_carry: Duration,
}

impl Default for ProgressionModel {
    fn default() -> Self {
        Self::from_state(SaveState::default())
    }
}

impl ProgressionModel {
    /// Model over the shipped registries.
    #[must_use]
    pub fn from_state(state: SaveState) -> Self {
        Self::with_registries(state, AchievementRegistry::standard(), UpgradeCatalog::standard())
    }

    /// Model over custom registries. Saved achievement ids are taken as-is; a
    /// silent check against the loaded state then fills in anything missing.
    #[must_use]
    pub fn with_registries(
        state: SaveState,
        achievements: AchievementRegistry,
        catalog: UpgradeCatalog,
    ) -> Self {
        let mut model = Self {
            score: state.score,
            controls_visible: state.controls_visible,
            mini_event_clicks: state.mini_event_click_count,
            achievements: AchievementTracker::with_unlocked(
                achievements,
                state.unlocked_achievements,
            ),
            upgrades: UpgradeStore::with_purchased(catalog, state.purchased_upgrades),
            passive_carry: Duration::ZERO,
        };
        model.reconcile_quietly();
        model
    }

    /// Snapshot of everything that is persisted.
    #[must_use]
    pub fn snapshot(&self) -> SaveState {
        SaveState {
            score: self.score,
            controls_visible: self.controls_visible,
            unlocked_achievements: self.achievements.unlocked().clone(),
            purchased_upgrades: self.upgrades.purchased().clone(),
            mini_event_click_count: self.mini_event_clicks,
        }
    }

    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    #[must_use]
    pub const fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    pub fn set_controls_visible(&mut self, visible: bool) {
        self.controls_visible = visible;
    }

    #[must_use]
    pub const fn mini_event_clicks(&self) -> u64 {
        self.mini_event_clicks
    }

    #[must_use]
    pub const fn achievements(&self) -> &AchievementTracker {
        &self.achievements
    }

    #[must_use]
    pub const fn upgrades(&self) -> &UpgradeStore {
        &self.upgrades
    }

    #[must_use]
    pub const fn notification(&self) -> Option<&UnlockNotification> {
        self.achievements.notification()
    }

    /// Apply a signed adjustment, clamping at zero. Returns the new score.
    pub fn add_score(&mut self, delta: i64) -> u64 {
        let score = if delta >= 0 {
            self.score.saturating_add(delta.unsigned_abs())
        } else {
            self.score.saturating_sub(delta.unsigned_abs())
        };
        self.set_score(score)
    }

    /// Overwrite the score (console `reset points`). Returns the new score.
    pub fn set_score(&mut self, score: u64) -> u64 {
        self.score = score;
        self.achievements.check(self.score);
        self.score
    }

    /// Run the score, mini-event and upgrade checks against current values.
    /// Returns ids unlocked by this call.
    pub fn check_achievements(&mut self) -> Vec<String> {
        self.reconcile()
    }

    /// One manual click. Returns the points gained.
    pub fn click(&mut self) -> u64 {
        let gained = self.upgrades.points_per_click();
        self.score = self.score.saturating_add(gained);
        self.achievements.check(self.score);
        gained
    }

    /// Buy an upgrade with the current score. Returns the remaining score.
    ///
    /// # Errors
    ///
    /// See [`UpgradeStore::purchase`]; the score is untouched on error.
    pub fn purchase(&mut self, id: &str) -> Result<u64, PurchaseError> {
        self.score = self.upgrades.purchase(id, self.score)?;
        self.achievements.check_upgrades(&self.upgrades);
        Ok(self.score)
    }

    /// Count a caught mini event and apply its reward.
    pub fn record_mini_event(&mut self, reward: MiniEventReward) -> MiniEventOutcome {
        self.mini_event_clicks = self.mini_event_clicks.saturating_add(1);
        let mut outcome = MiniEventOutcome::default();
        match reward {
            MiniEventReward::Points(points) => {
                self.score = self.score.saturating_add(points);
                outcome.points = points;
            }
            MiniEventReward::Upgrade => {
                let next = self.upgrades.first_unpurchased().map(|def| def.id.clone());
                if let Some(id) = next
                    && self.upgrades.grant(&id).is_ok()
                {
                    outcome.upgrade = Some(id);
                }
            }
        }
        outcome.unlocked = self.reconcile();
        outcome
    }

    /// Unlock a secret achievement (e.g. the console was opened).
    pub fn unlock_secret(&mut self, id: &str) -> bool {
        self.achievements.unlock_secret(id)
    }

    /// Forget all purchases. Achievements are never reset.
    pub fn reset_upgrades(&mut self) {
        self.upgrades.reset();
    }

    /// Per-frame update: ages the notification and pays passive income for each
    /// whole second elapsed. Returns passive points gained.
    pub fn tick(&mut self, dt: Duration) -> u64 {
        self.achievements.tick(dt);
        let rate = self.upgrades.passive_per_second();
        if rate == 0 {
            self.passive_carry = Duration::ZERO;
            return 0;
        }
        self.passive_carry = self.passive_carry.saturating_add(dt);
        let whole_secs = self.passive_carry.as_secs();
        self.passive_carry -= Duration::from_secs(whole_secs);
        let gained = rate.saturating_mul(whole_secs);
        if gained > 0 {
            self.score = self.score.saturating_add(gained);
            self.achievements.check(self.score);
        }
        gained
    }

    /// Replace every persisted field in one step, then silently re-run the
    /// achievement checks so registry flags agree with the new state.
    pub fn replace(&mut self, state: SaveState) {
        self.score = state.score;
        self.controls_visible = state.controls_visible;
        self.mini_event_clicks = state.mini_event_click_count;
        self.achievements.replace_unlocked(state.unlocked_achievements);
        self.upgrades.replace_purchased(state.purchased_upgrades);
        self.passive_carry = Duration::ZERO;
        self.reconcile_quietly();
    }

    fn reconcile(&mut self) -> Vec<String> {
        let mut unlocked = self.achievements.check(self.score);
        unlocked.extend(self.achievements.check_mini_events(self.mini_event_clicks));
        unlocked.extend(self.achievements.check_upgrades(&self.upgrades));
        unlocked
    }

    /// Backfill for loaded or restored state: no popup and no burst credit.
    fn reconcile_quietly(&mut self) {
        self.achievements.set_quiet(true);
        self.reconcile();
        self.achievements.set_quiet(false);
    }
}
