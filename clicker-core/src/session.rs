//! One running game: the live model, its storage, and the restore flow.
//!
//! A [`Session`] is built once at start-up and handed to whatever needs progression
//! state. It owns the save triggers: the periodic autosave driven by [`Session::tick`]
//! and the explicit [`Session::save`] used on exit.
use log::{debug, info, warn};
use std::time::Duration;

use crate::ProgressStorage;
use crate::constants::{AUTOSAVE_INTERVAL, LOG_TARGET_SESSION};
use crate::error::RestoreError;
use crate::progression::ProgressionModel;
use crate::restore::{RestoreFlow, RestorePhase, RestoreReport};
use crate::state::SaveState;
use crate::storage::LoadOutcome;

/// How the session's initial state was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// No save existed.
    Fresh,
    Loaded,
    /// The save was unreadable and defaults were used.
    Recovered,
}

pub struct Session<S: ProgressStorage> {
    storage: S,
    model: ProgressionModel,
    restore: RestoreFlow,
    origin: SessionOrigin,
    autosave_interval: Duration,
    since_save: Duration,
}

impl<S: ProgressStorage> Session<S> {
    /// Load the save from `storage` and build the model from it.
    ///
    /// A missing or corrupt save still opens a session with default state.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the save exists but cannot be read.
    pub fn open(storage: S) -> Result<Self, S::Error> {
        let (origin, state) = match storage.load()? {
            LoadOutcome::Fresh => (SessionOrigin::Fresh, SaveState::default()),
            LoadOutcome::Loaded(state) => (SessionOrigin::Loaded, state),
            LoadOutcome::Corrupt(err) => {
                warn!(target: LOG_TARGET_SESSION, "starting from defaults, save unreadable: {err}");
                (SessionOrigin::Recovered, SaveState::default())
            }
        };
        let model = ProgressionModel::from_state(state);
        info!(target: LOG_TARGET_SESSION, "session opened ({origin:?}) with score {}", model.score());
        Ok(Self::with_model(storage, model, origin))
    }

    /// Wrap an already built model, e.g. one using custom registries.
    #[must_use]
    pub const fn with_model(storage: S, model: ProgressionModel, origin: SessionOrigin) -> Self {
        Self {
            storage,
            model,
            restore: RestoreFlow::new(),
            origin,
            autosave_interval: AUTOSAVE_INTERVAL,
            since_save: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }

    #[must_use]
    pub const fn origin(&self) -> SessionOrigin {
        self.origin
    }

    #[must_use]
    pub const fn model(&self) -> &ProgressionModel {
        &self.model
    }

    pub const fn model_mut(&mut self) -> &mut ProgressionModel {
        &mut self.model
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub const fn restore_phase(&self) -> RestorePhase {
        self.restore.phase()
    }

    /// Advance game time by `dt`. Returns passive points earned.
    ///
    /// Saves whenever the autosave interval has elapsed. A failed autosave is
    /// logged and tried again at the next interval.
    pub fn tick(&mut self, dt: Duration) -> u64 {
        let gained = self.model.tick(dt);
        self.since_save = self.since_save.saturating_add(dt);
        if self.since_save >= self.autosave_interval {
            self.since_save = Duration::ZERO;
            match self.storage.save(&self.model.snapshot()) {
                Ok(()) => debug!(target: LOG_TARGET_SESSION, "autosaved"),
                Err(err) => warn!(target: LOG_TARGET_SESSION, "autosave failed, will retry: {err}"),
            }
        }
        gained
    }

    /// Persist the current state now.
    ///
    /// # Errors
    ///
    /// Returns the storage error; the model stays valid and can be saved again.
    pub fn save(&mut self) -> Result<(), S::Error> {
        self.storage.save(&self.model.snapshot())?;
        self.since_save = Duration::ZERO;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`RestoreFlow::request_restore`].
    pub fn request_restore(&mut self) -> Result<(), RestoreError> {
        self.restore.request_restore()
    }

    /// # Errors
    ///
    /// See [`RestoreFlow::confirm`].
    pub fn confirm_restore(&mut self) -> Result<RestoreReport, RestoreError> {
        let report = self.restore.confirm(&mut self.model, &self.storage)?;
        if report.persisted {
            self.since_save = Duration::ZERO;
        }
        Ok(report)
    }

    pub fn cancel_restore(&mut self) -> bool {
        self.restore.cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::xor_in_place;
    use crate::constants::OBFUSCATION_KEY;
    use crate::test_support::MemoryStorage;

    #[test]
    fn open_reports_where_state_came_from() {
        let fresh = Session::open(MemoryStorage::default()).unwrap();
        assert_eq!(fresh.origin(), SessionOrigin::Fresh);
        assert_eq!(fresh.model().snapshot(), SaveState::default());

        let storage = MemoryStorage::default();
        storage.set_saved(SaveState::default().with_score(40));
        let loaded = Session::open(storage).unwrap();
        assert_eq!(loaded.origin(), SessionOrigin::Loaded);
        assert_eq!(loaded.model().score(), 40);

        let storage = MemoryStorage::default();
        storage.set_corrupt(true);
        let recovered = Session::open(storage).unwrap();
        assert_eq!(recovered.origin(), SessionOrigin::Recovered);
        assert_eq!(recovered.model().score(), 0);
    }

    #[test]
    fn autosave_fires_once_per_interval() {
        let storage = MemoryStorage::default();
        let mut session = Session::open(storage.clone()).unwrap();
        session.model_mut().click();
        session.tick(Duration::from_secs(29));
        assert_eq!(storage.save_count(), 0);
        session.tick(Duration::from_secs(1));
        assert_eq!(storage.save_count(), 1);
        assert_eq!(storage.saved().map(|state| state.score), Some(1));
        session.tick(Duration::from_secs(10));
        assert_eq!(storage.save_count(), 1);
    }

    #[test]
    fn failed_autosave_is_retried_next_interval() {
        let storage = MemoryStorage::default();
        let mut session = Session::open(storage.clone())
            .unwrap()
            .with_autosave_interval(Duration::from_secs(5));
        storage.fail_saves(true);
        session.model_mut().add_score(12);
        session.tick(Duration::from_secs(5));
        assert!(storage.saved().is_none());
        assert!(session.save().is_err());

        storage.fail_saves(false);
        session.tick(Duration::from_secs(5));
        assert_eq!(storage.saved().map(|state| state.score), Some(12));
    }

    #[test]
    fn restore_is_delegated_to_the_flow() {
        let storage = MemoryStorage::default();
        let mut payload = b"250|1|first_click".to_vec();
        xor_in_place(&mut payload, OBFUSCATION_KEY);
        storage.set_backup(payload);
        let mut session = Session::open(storage.clone()).unwrap();

        assert!(matches!(session.confirm_restore(), Err(RestoreError::NotConfirming)));
        session.request_restore().unwrap();
        assert!(session.cancel_restore());
        session.request_restore().unwrap();
        assert_eq!(session.restore_phase(), RestorePhase::Confirming);
        let report = session.confirm_restore().unwrap();
        assert!(report.persisted);
        assert_eq!(session.model().score(), 250);
        assert!(session.model().achievements().is_unlocked("hundred_points"));
        assert_eq!(storage.saved(), Some(session.model().snapshot()));
        assert!(storage.backup().is_none());
    }
}
