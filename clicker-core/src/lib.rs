//! Clicker Progression Store
//!
//! Platform-agnostic save handling for the clicker game: the obfuscated save codec,
//! the on-disk store, live progression (score, achievements, upgrades) and the
//! legacy backup migration. Rendering and input live elsewhere.

pub mod codec;
pub mod constants;
pub mod error;
pub mod progression;
pub mod restore;
pub mod session;
pub mod state;
pub mod storage;

// Re-export commonly used types
pub use codec::StateCodec;
pub use error::{DecodeError, LegacyDecodeError, PurchaseError, RestoreError, StoreError};
pub use progression::{
    AchievementDefinition, AchievementRegistry, AchievementTracker, AchievementTrigger,
    MiniEventOutcome, MiniEventReward, ProgressionModel, UnlockNotification, UpgradeCatalog,
    UpgradeDefinition, UpgradeEffect, UpgradeStore,
};
pub use restore::{LegacyFormat, RestoreFlow, RestorePhase, RestoreReport, decode_legacy};
pub use session::{Session, SessionOrigin};
pub use state::SaveState;
pub use storage::{LoadOutcome, SaveStore, StoreConfig};

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait ProgressStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the current save
    ///
    /// # Errors
    ///
    /// Returns an error if the save exists but cannot be read. A missing or
    /// undecodable save is reported through [`LoadOutcome`] instead.
    fn load(&self) -> Result<LoadOutcome, Self::Error>;

    /// Persist the current save
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    fn save(&self, state: &SaveState) -> Result<(), Self::Error>;

    /// Raw legacy backup bytes, if a backup exists
    ///
    /// # Errors
    ///
    /// Returns an error if the backup exists but cannot be read.
    fn read_backup(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Delete the legacy backup; deleting a missing backup succeeds
    ///
    /// # Errors
    ///
    /// Returns an error if the backup cannot be deleted.
    fn remove_backup(&self) -> Result<(), Self::Error>;

    /// Key the backup was obfuscated with
    fn obfuscation_key(&self) -> u8 {
        constants::OBFUSCATION_KEY
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("simulated storage failure")]
    pub struct MemoryError;

    #[derive(Default)]
    struct Slots {
        saved: Option<SaveState>,
        backup: Option<Vec<u8>>,
        corrupt: bool,
        fail_saves: bool,
        save_count: usize,
    }

    /// In-memory storage; clones share the same slots.
    #[derive(Clone, Default)]
    pub struct MemoryStorage {
        slots: Rc<RefCell<Slots>>,
    }

    impl MemoryStorage {
        pub fn set_saved(&self, state: SaveState) {
            self.slots.borrow_mut().saved = Some(state);
        }

        pub fn saved(&self) -> Option<SaveState> {
            self.slots.borrow().saved.clone()
        }

        pub fn set_backup(&self, bytes: Vec<u8>) {
            self.slots.borrow_mut().backup = Some(bytes);
        }

        pub fn backup(&self) -> Option<Vec<u8>> {
            self.slots.borrow().backup.clone()
        }

        pub fn set_corrupt(&self, corrupt: bool) {
            self.slots.borrow_mut().corrupt = corrupt;
        }

        pub fn fail_saves(&self, fail: bool) {
            self.slots.borrow_mut().fail_saves = fail;
        }

        pub fn save_count(&self) -> usize {
            self.slots.borrow().save_count
        }
    }

    impl ProgressStorage for MemoryStorage {
        type Error = MemoryError;

        fn load(&self) -> Result<LoadOutcome, Self::Error> {
            let slots = self.slots.borrow();
            if slots.corrupt {
                return Ok(LoadOutcome::Corrupt(DecodeError::UnsupportedVersion {
                    found: u32::MAX,
                    supported: constants::SCHEMA_VERSION,
                }));
            }
            Ok(slots
                .saved
                .clone()
                .map_or(LoadOutcome::Fresh, LoadOutcome::Loaded))
        }

        fn save(&self, state: &SaveState) -> Result<(), Self::Error> {
            let mut slots = self.slots.borrow_mut();
            if slots.fail_saves {
                return Err(MemoryError);
            }
            slots.saved = Some(state.clone());
            slots.save_count += 1;
            Ok(())
        }

        fn read_backup(&self) -> Result<Option<Vec<u8>>, Self::Error> {
            Ok(self.backup())
        }

        fn remove_backup(&self) -> Result<(), Self::Error> {
            self.slots.borrow_mut().backup = None;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MemoryStorage;
    use super::*;

    #[test]
    fn memory_storage_round_trips_through_the_trait() {
        let storage = MemoryStorage::default();
        assert!(matches!(storage.load().unwrap(), LoadOutcome::Fresh));
        let state = SaveState::default()
            .with_score(42)
            .with_achievements(["first_click"]);
        storage.save(&state).unwrap();
        match storage.load().unwrap() {
            LoadOutcome::Loaded(loaded) => assert_eq!(loaded, state),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(storage.obfuscation_key(), constants::OBFUSCATION_KEY);
    }

    #[test]
    fn save_store_reports_its_codec_key() {
        let dir = std::env::temp_dir().join(format!(
            "clicker-core-lib-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let config = StoreConfig {
            key: 7,
            ..StoreConfig::default()
        };
        let store = SaveStore::at_with(&dir, &config).unwrap();
        assert_eq!(ProgressStorage::obfuscation_key(&store), 7);
        let _ = std::fs::remove_dir_all(dir);
    }
}
