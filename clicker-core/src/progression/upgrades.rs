//! Upgrade catalog and one-shot purchases.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::BASE_POINTS_PER_CLICK;
use crate::error::PurchaseError;

/// Effect an upgrade has on future score gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum UpgradeEffect {
    /// Extra points per manual click.
    ClickAdditive(u64),
    /// Multiplies points per manual click.
    ClickMultiplier(u64),
    /// Points granted every second without clicking.
    AutoClick(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeDefinition {
    pub id: String,
    pub name: String,
    pub cost: u64,
    pub effect: UpgradeEffect,
}

impl UpgradeDefinition {
    #[must_use]
    pub fn new(id: &str, name: &str, cost: u64, effect: UpgradeEffect) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            cost,
            effect,
        }
    }
}

/// Immutable list of purchasable upgrades, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeCatalog {
    definitions: Vec<UpgradeDefinition>,
}

impl UpgradeCatalog {
    #[must_use]
    pub fn new(definitions: Vec<UpgradeDefinition>) -> Self {
        let mut definitions = definitions;
        let mut seen = std::collections::HashSet::new();
        definitions.retain(|def| seen.insert(def.id.clone()));
        Self { definitions }
    }

    #[must_use]
    pub fn standard() -> Self {
        use UpgradeEffect::{AutoClick, ClickAdditive, ClickMultiplier};
        Self::new(vec![
            UpgradeDefinition::new("hold_click", "Hold to Click", 2_500, ClickAdditive(1)),
            UpgradeDefinition::new("auto_click", "Auto Click", 5_000, AutoClick(1)),
            UpgradeDefinition::new("double", "Double Points", 20_000, ClickMultiplier(2)),
            UpgradeDefinition::new("mega", "Mega Click", 75_000, ClickAdditive(4)),
        ])
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&UpgradeDefinition> {
        self.definitions.iter().find(|def| def.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UpgradeDefinition> {
        self.definitions.iter()
    }
}

impl Default for UpgradeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Purchased flags plus the catalog they refer to.
#[derive(Debug, Clone, Default)]
pub struct UpgradeStore {
    catalog: UpgradeCatalog,
    purchased: BTreeMap<String, bool>,
}

impl UpgradeStore {
    #[must_use]
    pub fn new(catalog: UpgradeCatalog) -> Self {
        Self::with_purchased(catalog, BTreeMap::new())
    }

    /// Entries for ids the catalog does not know are preserved untouched.
    #[must_use]
    pub const fn with_purchased(catalog: UpgradeCatalog, purchased: BTreeMap<String, bool>) -> Self {
        Self { catalog, purchased }
    }

    #[must_use]
    pub const fn catalog(&self) -> &UpgradeCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn purchased(&self) -> &BTreeMap<String, bool> {
        &self.purchased
    }

    #[must_use]
    pub fn is_purchased(&self, id: &str) -> bool {
        self.purchased.get(id).copied().unwrap_or(false)
    }

    /// Buy `id` with `score` points, returning the score left over.
    ///
    /// # Errors
    ///
    /// Refuses unknown ids, repeat purchases, and purchases the score cannot cover.
    /// Nothing changes on error.
    pub fn purchase(&mut self, id: &str, score: u64) -> Result<u64, PurchaseError> {
        let def = self.available(id)?;
        let remaining = score
            .checked_sub(def.cost)
            .ok_or_else(|| PurchaseError::InsufficientScore {
                id: id.to_string(),
                cost: def.cost,
                score,
            })?;
        self.purchased.insert(id.to_string(), true);
        Ok(remaining)
    }

    /// Mark `id` purchased without charging for it (mini-event reward).
    ///
    /// # Errors
    ///
    /// Refuses unknown or already purchased ids.
    pub fn grant(&mut self, id: &str) -> Result<(), PurchaseError> {
        self.available(id)?;
        self.purchased.insert(id.to_string(), true);
        Ok(())
    }

    fn available(&self, id: &str) -> Result<&UpgradeDefinition, PurchaseError> {
        let def = self
            .catalog
            .find(id)
            .ok_or_else(|| PurchaseError::UnknownUpgrade(id.to_string()))?;
        if self.is_purchased(id) {
            return Err(PurchaseError::AlreadyPurchased(id.to_string()));
        }
        Ok(def)
    }

    /// First catalog entry not yet owned.
    #[must_use]
    pub fn first_unpurchased(&self) -> Option<&UpgradeDefinition> {
        self.catalog.iter().find(|def| !self.is_purchased(&def.id))
    }

    fn owned_effects(&self) -> impl Iterator<Item = UpgradeEffect> + '_ {
        self.catalog
            .iter()
            .filter(|def| self.is_purchased(&def.id))
            .map(|def| def.effect)
    }

    /// Sum of additive click bonuses over owned upgrades.
    #[must_use]
    pub fn bonus_additive(&self) -> u64 {
        self.owned_effects()
            .filter_map(|effect| match effect {
                UpgradeEffect::ClickAdditive(amount) => Some(amount),
                _ => None,
            })
            .fold(0, u64::saturating_add)
    }

    /// Product of click multipliers over owned upgrades (1 when none are owned).
    #[must_use]
    pub fn bonus_multiplier(&self) -> u64 {
        self.owned_effects()
            .filter_map(|effect| match effect {
                UpgradeEffect::ClickMultiplier(factor) => Some(factor),
                _ => None,
            })
            .fold(1, u64::saturating_mul)
    }

    #[must_use]
    pub fn points_per_click(&self) -> u64 {
        BASE_POINTS_PER_CLICK
            .saturating_add(self.bonus_additive())
            .saturating_mul(self.bonus_multiplier())
    }

    #[must_use]
    pub fn passive_per_second(&self) -> u64 {
        self.owned_effects()
            .filter_map(|effect| match effect {
                UpgradeEffect::AutoClick(amount) => Some(amount),
                _ => None,
            })
            .fold(0, u64::saturating_add)
    }

    /// Forget every purchase (developer console).
    pub fn reset(&mut self) {
        self.purchased.clear();
    }

    pub(crate) fn replace_purchased(&mut self, purchased: BTreeMap<String, bool>) {
        self.purchased = purchased;
    }
}
