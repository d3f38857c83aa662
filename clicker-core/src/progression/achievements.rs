//! Achievement registry and unlock tracking.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use super::upgrades::UpgradeStore;
use crate::constants::NOTIFICATION_TTL;

/// What unlocks an achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "threshold", rename_all = "snake_case")]
pub enum AchievementTrigger {
    /// Score reached at least once.
    Score(u64),
    /// Lifetime mini-event clicks reached.
    MiniEventClicks(u64),
    /// The upgrade with this id is owned.
    UpgradeOwned(String),
    /// Unlocked explicitly by the game (e.g. discovering the console).
    Secret,
    /// `count` other achievements unlocked within `window` of tracker time.
    Burst { count: usize, window: Duration },
    /// Every other achievement in the registry is unlocked.
    AllUnlocked,
}

impl AchievementTrigger {
    /// Ordering key: score thresholds first (ascending), then mini-event
    /// thresholds, upgrades, secrets, and finally the meta achievements.
    const fn sort_key(&self) -> (u8, u64) {
        match self {
            Self::Score(threshold) => (0, *threshold),
            Self::MiniEventClicks(threshold) => (1, *threshold),
            Self::UpgradeOwned(_) => (2, 0),
            Self::Secret => (3, 0),
            Self::Burst { count, .. } => (4, *count as u64),
            Self::AllUnlocked => (5, 0),
        }
    }

    /// Meta triggers depend on other unlocks and never count toward a burst.
    const fn is_meta(&self) -> bool {
        matches!(self, Self::Burst { .. } | Self::AllUnlocked)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub trigger: AchievementTrigger,
}

impl AchievementDefinition {
    #[must_use]
    pub fn new(id: &str, name: &str, description: &str, trigger: AchievementTrigger) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            trigger,
        }
    }

    /// Score needed to unlock, for score-triggered achievements.
    #[must_use]
    pub const fn score_threshold(&self) -> Option<u64> {
        match self.trigger {
            AchievementTrigger::Score(threshold) => Some(threshold),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_secret(&self) -> bool {
        matches!(self.trigger, AchievementTrigger::Secret)
    }
}

/// Immutable set of achievement definitions, kept in trigger order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementRegistry {
    definitions: Vec<AchievementDefinition>,
}

impl AchievementRegistry {
    /// Build a registry. Later definitions reusing an id are dropped.
    #[must_use]
    pub fn new(definitions: Vec<AchievementDefinition>) -> Self {
        let mut seen = HashSet::new();
        let mut definitions: Vec<_> = definitions
            .into_iter()
            .filter(|def| seen.insert(def.id.clone()))
            .collect();
        definitions.sort_by_key(|def| def.trigger.sort_key());
        Self { definitions }
    }

    /// The achievements shipped with the game.
    #[must_use]
    pub fn standard() -> Self {
        use AchievementTrigger::{AllUnlocked, Burst, MiniEventClicks, Score, Secret, UpgradeOwned};
        Self::new(vec![
            AchievementDefinition::new("first_click", "First Click", "Score your first point", Score(1)),
            AchievementDefinition::new("ten_clicks", "10 Clicks", "Reach 10 points", Score(10)),
            AchievementDefinition::new("hundred_points", "100 Points", "Reach 100 points", Score(100)),
            AchievementDefinition::new("thousand_points", "1,000 Points", "Reach a thousand points", Score(1_000)),
            AchievementDefinition::new("million_points", "1,000,000 Points", "Reach a million points", Score(1_000_000)),
            AchievementDefinition::new("billion_points", "1,000,000,000 Points", "Reach a billion points", Score(1_000_000_000)),
            AchievementDefinition::new("mini_event_1", "Mini Event: First Catch", "Click a mini event for the first time", MiniEventClicks(1)),
            AchievementDefinition::new("mini_event_10", "Mini Event: 10 Catches", "Click 10 mini events", MiniEventClicks(10)),
            AchievementDefinition::new("mini_event_100", "Mini Event: 100 Catches", "Click 100 mini events", MiniEventClicks(100)),
            AchievementDefinition::new("manual_phase", "Manual Phase", "Buy the hold-to-click upgrade", UpgradeOwned("hold_click".into())),
            AchievementDefinition::new("console", "Console Unlocked", "You found the secret console!", Secret),
            AchievementDefinition::new(
                "triple_unlock",
                "Triple Unlock",
                "Unlock 3 achievements within 5 seconds",
                Burst { count: 3, window: Duration::from_secs(5) },
            ),
            AchievementDefinition::new("perfeicao_15", "Perfection 1.5", "Unlock every other achievement", AllUnlocked),
        ])
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&AchievementDefinition> {
        self.definitions.iter().find(|def| def.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AchievementDefinition> {
        self.definitions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for AchievementRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Latest unlock popup for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockNotification {
    pub achievement_id: String,
    pub title: String,
    remaining: Duration,
}

impl UnlockNotification {
    #[must_use]
    pub const fn remaining(&self) -> Duration {
        self.remaining
    }
}

/// Tracks which achievements are unlocked and the single pending notification.
#[derive(Debug, Clone)]
pub struct AchievementTracker {
    registry: AchievementRegistry,
    unlocked: BTreeSet<String>,
    pending: Option<UnlockNotification>,
    ttl: Duration,
    /// Time advanced by [`Self::tick`]; burst windows are measured against it.
    clock: Duration,
    /// Clock readings of recent non-meta unlocks.
    recent: Vec<Duration>,
    quiet: bool,
}

impl AchievementTracker {
    #[must_use]
    pub fn new(registry: AchievementRegistry) -> Self {
        Self {
            registry,
            unlocked: BTreeSet::new(),
            pending: None,
            ttl: NOTIFICATION_TTL,
            clock: Duration::ZERO,
            recent: Vec::new(),
            quiet: false,
        }
    }

    /// Seed with previously unlocked ids, without raising notifications. Ids the
    /// registry does not know are kept so they survive the next save.
    #[must_use]
    pub fn with_unlocked(registry: AchievementRegistry, unlocked: BTreeSet<String>) -> Self {
        Self {
            unlocked,
            ..Self::new(registry)
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &AchievementRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn unlocked(&self) -> &BTreeSet<String> {
        &self.unlocked
    }

    #[must_use]
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains(id)
    }

    /// Unlock every score achievement whose threshold is at or below `score`,
    /// lowest threshold first. Returns the ids unlocked by this call.
    pub fn check(&mut self, score: u64) -> Vec<String> {
        self.unlock_matching(|trigger| matches!(trigger, AchievementTrigger::Score(t) if *t <= score))
    }

    /// Same as [`AchievementTracker::check`] for mini-event click thresholds.
    pub fn check_mini_events(&mut self, clicks: u64) -> Vec<String> {
        self.unlock_matching(
            |trigger| matches!(trigger, AchievementTrigger::MiniEventClicks(t) if *t <= clicks),
        )
    }

    /// Unlock every achievement tied to an upgrade `upgrades` owns.
    pub fn check_upgrades(&mut self, upgrades: &UpgradeStore) -> Vec<String> {
        self.unlock_matching(
            |trigger| matches!(trigger, AchievementTrigger::UpgradeOwned(id) if upgrades.is_purchased(id)),
        )
    }

    /// Unlock a secret achievement by id. Returns true if it was newly unlocked.
    pub fn unlock_secret(&mut self, id: &str) -> bool {
        self.unlock_matching_def(|def| def.id == id && def.is_secret())
            .iter()
            .any(|unlocked| unlocked == id)
    }

    fn unlock_matching(&mut self, pred: impl Fn(&AchievementTrigger) -> bool) -> Vec<String> {
        self.unlock_matching_def(|def| pred(&def.trigger))
    }

    /// Unlock the non-meta definitions matching `pred`, in registry order, then
    /// any meta achievement those unlocks complete.
    fn unlock_matching_def(&mut self, pred: impl Fn(&AchievementDefinition) -> bool) -> Vec<String> {
        let mut newly: Vec<String> = self
            .registry
            .iter()
            .filter(|def| !def.trigger.is_meta() && !self.unlocked.contains(&def.id) && pred(*def))
            .map(|def| def.id.clone())
            .collect();
        for id in &newly {
            self.mark(id);
            if !self.quiet {
                self.recent.push(self.clock);
            }
        }
        newly.extend(self.unlock_meta());
        newly
    }

    fn unlock_meta(&mut self) -> Vec<String> {
        let mut newly: Vec<String> = self
            .registry
            .iter()
            .filter(|def| !self.unlocked.contains(&def.id))
            .filter(|def| {
                matches!(def.trigger, AchievementTrigger::Burst { count, window }
                    if self.unlocks_within(window) >= count)
            })
            .map(|def| def.id.clone())
            .collect();
        for id in &newly {
            self.mark(id);
        }

        let complete = self
            .registry
            .iter()
            .filter(|def| def.trigger != AchievementTrigger::AllUnlocked)
            .all(|def| self.unlocked.contains(&def.id));
        if complete {
            let finals: Vec<String> = self
                .registry
                .iter()
                .filter(|def| {
                    def.trigger == AchievementTrigger::AllUnlocked && !self.unlocked.contains(&def.id)
                })
                .map(|def| def.id.clone())
                .collect();
            for id in &finals {
                self.mark(id);
            }
            newly.extend(finals);
        }
        newly
    }

    fn unlocks_within(&self, window: Duration) -> usize {
        self.recent
            .iter()
            .filter(|at| self.clock.saturating_sub(**at) <= window)
            .count()
    }

    fn mark(&mut self, id: &str) {
        self.unlocked.insert(id.to_string());
        if self.quiet {
            return;
        }
        let name = self.registry.get(id).map_or(id, |def| def.name.as_str());
        self.pending = Some(UnlockNotification {
            achievement_id: id.to_string(),
            title: format!("Achievement unlocked: {name}"),
            remaining: self.ttl,
        });
    }

    /// Pending notification, if it has not expired.
    #[must_use]
    pub const fn notification(&self) -> Option<&UnlockNotification> {
        self.pending.as_ref()
    }

    /// Age the pending notification by one frame and advance the burst clock.
    pub fn tick(&mut self, dt: Duration) {
        if let Some(note) = self.pending.as_mut() {
            note.remaining = note.remaining.saturating_sub(dt);
            if note.remaining.is_zero() {
                self.pending = None;
            }
        }
        self.clock = self.clock.saturating_add(dt);
        let horizon = self
            .registry
            .iter()
            .filter_map(|def| match def.trigger {
                AchievementTrigger::Burst { window, .. } => Some(window),
                _ => None,
            })
            .max()
            .unwrap_or_default();
        let now = self.clock;
        self.recent.retain(|at| now.saturating_sub(*at) <= horizon);
    }

    /// While quiet, unlocks raise no notification and do not count toward a
    /// burst. Used when loaded or restored state is reconciled.
    pub(crate) fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    /// Wholesale replacement used by restore. The only path that may drop ids.
    pub(crate) fn replace_unlocked(&mut self, unlocked: BTreeSet<String>) {
        self.unlocked = unlocked;
        self.pending = None;
        self.recent.clear();
    }
}

impl Default for AchievementTracker {
    fn default() -> Self {
        Self::new(AchievementRegistry::standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_orders_by_score_threshold() {
        let registry = AchievementRegistry::new(vec![
            AchievementDefinition::new("c", "C", "", AchievementTrigger::Score(100)),
            AchievementDefinition::new("s", "S", "", AchievementTrigger::Secret),
            AchievementDefinition::new("a", "A", "", AchievementTrigger::Score(1)),
            AchievementDefinition::new("b", "B", "", AchievementTrigger::Score(10)),
        ]);
        let ids: Vec<_> = registry.iter().map(|def| def.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c", "s"]);
    }

    #[test]
    fn duplicate_ids_keep_first_definition() {
        let registry = AchievementRegistry::new(vec![
            AchievementDefinition::new("a", "First", "", AchievementTrigger::Score(5)),
            AchievementDefinition::new("a", "Second", "", AchievementTrigger::Score(1)),
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().name, "First");
    }

    #[test]
    fn check_crosses_several_thresholds_at_once() {
        let mut tracker = AchievementTracker::default();
        let newly = tracker.check(150);
        assert_eq!(newly, ["first_click", "ten_clicks", "hundred_points", "triple_unlock"]);
        let note = tracker.notification().unwrap();
        assert_eq!(note.achievement_id, "triple_unlock");
        assert_eq!(note.remaining(), NOTIFICATION_TTL);
    }

    #[test]
    fn check_never_removes_unlocked_ids() {
        let mut tracker = AchievementTracker::default();
        tracker.check(100);
        tracker.check(0);
        tracker.check(5);
        assert!(tracker.is_unlocked("hundred_points"));
        assert_eq!(tracker.unlocked().len(), 4);
    }

    #[test]
    fn score_check_ignores_mini_event_and_secret_triggers() {
        let mut tracker = AchievementTracker::default();
        tracker.check(u64::MAX);
        assert!(!tracker.is_unlocked("mini_event_1"));
        assert!(!tracker.is_unlocked("console"));
        assert!(tracker.is_unlocked("billion_points"));
    }

    #[test]
    fn mini_event_thresholds_unlock_separately() {
        let mut tracker = AchievementTracker::default();
        assert_eq!(tracker.check_mini_events(10), ["mini_event_1", "mini_event_10"]);
        assert!(tracker.check(0).is_empty());
    }

    #[test]
    fn secrets_unlock_once_and_only_by_id() {
        let mut tracker = AchievementTracker::default();
        assert!(!tracker.unlock_secret("first_click"));
        assert!(tracker.unlock_secret("console"));
        assert!(!tracker.unlock_secret("console"));
        assert!(tracker.is_unlocked("console"));
    }

    #[test]
    fn notification_expires_after_ttl() {
        let mut tracker = AchievementTracker::default();
        tracker.check(1);
        tracker.tick(Duration::from_millis(2_999));
        assert!(tracker.notification().is_some());
        tracker.tick(Duration::from_millis(1));
        assert!(tracker.notification().is_none());
    }

    #[test]
    fn newer_unlock_overwrites_pending_notification() {
        let mut tracker = AchievementTracker::default();
        tracker.check(1);
        tracker.tick(Duration::from_secs(1));
        tracker.check(10);
        let note = tracker.notification().unwrap();
        assert_eq!(note.achievement_id, "ten_clicks");
        assert_eq!(note.remaining(), NOTIFICATION_TTL);
    }

    #[test]
    fn seeded_unknown_ids_are_preserved() {
        let unlocked = BTreeSet::from(["retired_badge".to_string(), "first_click".to_string()]);
        let mut tracker = AchievementTracker::with_unlocked(AchievementRegistry::standard(), unlocked);
        assert!(tracker.notification().is_none());
        assert_eq!(tracker.check(1), Vec::<String>::new());
        assert!(tracker.is_unlocked("retired_badge"));
    }

    #[test]
    fn owned_upgrade_unlocks_manual_phase() {
        let mut tracker = AchievementTracker::default();
        let mut upgrades = UpgradeStore::default();
        assert!(tracker.check_upgrades(&upgrades).is_empty());
        upgrades.grant("hold_click").unwrap();
        assert_eq!(tracker.check_upgrades(&upgrades), ["manual_phase"]);
        assert!(tracker.check_upgrades(&upgrades).is_empty());
    }

    #[test]
    fn three_unlocks_inside_the_window_make_a_burst() {
        let mut tracker = AchievementTracker::default();
        tracker.check(1);
        tracker.tick(Duration::from_secs(2));
        tracker.check(10);
        tracker.tick(Duration::from_secs(3));
        assert_eq!(tracker.check(100), ["hundred_points", "triple_unlock"]);
    }

    #[test]
    fn unlocks_spread_past_the_window_are_no_burst() {
        let mut tracker = AchievementTracker::default();
        tracker.check(1);
        tracker.tick(Duration::from_secs(3));
        tracker.check(10);
        tracker.tick(Duration::from_secs(3));
        assert_eq!(tracker.check(100), ["hundred_points"]);
        assert!(!tracker.is_unlocked("triple_unlock"));
    }

    #[test]
    fn quiet_unlocks_raise_nothing() {
        let mut tracker = AchievementTracker::default();
        tracker.set_quiet(true);
        tracker.check(150);
        tracker.set_quiet(false);
        assert!(tracker.notification().is_none());
        assert!(!tracker.is_unlocked("triple_unlock"));
        assert_eq!(tracker.unlocked().len(), 3);
    }

    #[test]
    fn last_remaining_achievement_completes_the_set() {
        let mut tracker = AchievementTracker::default();
        let mut upgrades = UpgradeStore::default();
        upgrades.grant("hold_click").unwrap();
        tracker.check(u64::MAX);
        tracker.check_mini_events(100);
        tracker.check_upgrades(&upgrades);
        assert!(!tracker.is_unlocked("perfeicao_15"));
        assert!(tracker.unlock_secret("console"));
        assert!(tracker.is_unlocked("perfeicao_15"));
        assert_eq!(tracker.notification().unwrap().achievement_id, "perfeicao_15");
    }

    #[test]
    fn trigger_serializes_as_tagged_record() {
        let json = serde_json::to_string(&AchievementTrigger::Score(10)).unwrap();
        assert_eq!(json, r#"{"kind":"score","threshold":10}"#);
        let secret: AchievementTrigger = serde_json::from_str(r#"{"kind":"secret"}"#).unwrap();
        assert_eq!(secret, AchievementTrigger::Secret);
        let owned: AchievementTrigger =
            serde_json::from_str(r#"{"kind":"upgrade_owned","threshold":"hold_click"}"#).unwrap();
        assert_eq!(owned, AchievementTrigger::UpgradeOwned("hold_click".into()));
    }
}
