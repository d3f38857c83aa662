//! Mini-event rewards: the secondary progression counter.
use rand::Rng;

use crate::constants::{MINI_EVENT_MAX_POINTS, MINI_EVENT_MIN_POINTS, MINI_EVENT_UPGRADE_CHANCE};

/// Reward for catching a mini event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiniEventReward {
    Points(u64),
    /// A free upgrade: the first one not yet owned.
    Upgrade,
}

impl MiniEventReward {
    /// Roll a reward: a small chance of a free upgrade, otherwise a random
    /// amount of points.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(MINI_EVENT_UPGRADE_CHANCE) {
            Self::Upgrade
        } else {
            Self::Points(rng.gen_range(MINI_EVENT_MIN_POINTS..=MINI_EVENT_MAX_POINTS))
        }
    }
}

/// What a mini-event click actually granted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiniEventOutcome {
    pub points: u64,
    pub upgrade: Option<String>,
    pub unlocked: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn rolled_points_stay_in_range() {
        let mut rng = ChaCha20Rng::seed_from_u64(0x5EED);
        for _ in 0..500 {
            if let MiniEventReward::Points(points) = MiniEventReward::roll(&mut rng) {
                assert!((MINI_EVENT_MIN_POINTS..=MINI_EVENT_MAX_POINTS).contains(&points));
            }
        }
    }

    #[test]
    fn rolls_are_deterministic_per_seed() {
        let mut a = ChaCha20Rng::seed_from_u64(42);
        let mut b = ChaCha20Rng::seed_from_u64(42);
        let left: Vec<_> = (0..32).map(|_| MiniEventReward::roll(&mut a)).collect();
        let right: Vec<_> = (0..32).map(|_| MiniEventReward::roll(&mut b)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn upgrades_are_occasionally_rolled() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let upgrades = (0..2_000)
            .filter(|_| MiniEventReward::roll(&mut rng) == MiniEventReward::Upgrade)
            .count();
        assert!(upgrades > 0 && upgrades < 400, "got {upgrades}");
    }
}
