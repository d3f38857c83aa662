//! Filesystem-backed save storage.
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::codec::StateCodec;
use crate::constants::{
    APP_DATA_ENV_VAR, LEGACY_BACKUP_FILENAME, LOG_TARGET_STORE, OBFUSCATION_KEY, SAVE_FILENAME,
    SAVE_FOLDER, TEMP_SUFFIX,
};
use crate::error::{DecodeError, StoreError};
use crate::state::SaveState;
use crate::ProgressStorage;

/// Where and how saves are written. All fields default to the shipped layout, so a
/// partial JSON override only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "StoreConfig::default_env_var")]
    pub env_var: String,
    #[serde(default = "StoreConfig::default_folder")]
    pub folder: String,
    #[serde(default = "StoreConfig::default_save_file")]
    pub save_file: String,
    #[serde(default = "StoreConfig::default_backup_file")]
    pub backup_file: String,
    #[serde(default = "StoreConfig::default_key")]
    pub key: u8,
}

impl StoreConfig {
    fn default_env_var() -> String {
        APP_DATA_ENV_VAR.to_string()
    }

    fn default_folder() -> String {
        SAVE_FOLDER.to_string()
    }

    fn default_save_file() -> String {
        SAVE_FILENAME.to_string()
    }

    fn default_backup_file() -> String {
        LEGACY_BACKUP_FILENAME.to_string()
    }

    const fn default_key() -> u8 {
        OBFUSCATION_KEY
    }

    /// Parse a JSON override document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a field has the wrong type.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            env_var: Self::default_env_var(),
            folder: Self::default_folder(),
            save_file: Self::default_save_file(),
            backup_file: Self::default_backup_file(),
            key: Self::default_key(),
        }
    }
}

/// Result of reading the save file at startup.
#[derive(Debug)]
pub enum LoadOutcome {
    /// No save file yet: first run.
    Fresh,
    Loaded(SaveState),
    /// The file exists but could not be decoded; play continues from defaults.
    Corrupt(DecodeError),
}

impl LoadOutcome {
    #[must_use]
    pub fn into_state(self) -> SaveState {
        match self {
            Self::Loaded(state) => state,
            Self::Fresh | Self::Corrupt(_) => SaveState::default(),
        }
    }

    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}

/// Owns the save directory and reads/writes the current save and legacy backup.
#[derive(Debug, Clone)]
pub struct SaveStore {
    dir: PathBuf,
    save_path: PathBuf,
    backup_path: PathBuf,
    codec: StateCodec,
}

impl SaveStore {
    /// Resolve the save directory from the platform application-data variable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EnvironmentMissing`] when the variable is unset or
    /// empty, or [`StoreError::CreateDir`] if the directory cannot be created.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_env_with(&StoreConfig::default())
    }

    /// Same as [`SaveStore::from_env`] with a custom layout.
    ///
    /// # Errors
    ///
    /// See [`SaveStore::from_env`].
    pub fn from_env_with(config: &StoreConfig) -> Result<Self, StoreError> {
        let base = std::env::var_os(&config.env_var)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| StoreError::EnvironmentMissing {
                var: config.env_var.clone(),
            })?;
        Self::from_base(Path::new(&base), config)
    }

    /// Build a store under `base`, appending the configured subfolder.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CreateDir`] if the directory cannot be created.
    pub fn from_base(base: &Path, config: &StoreConfig) -> Result<Self, StoreError> {
        Self::at_with(base.join(&config.folder), config)
    }

    /// Build a store whose files live directly in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CreateDir`] if the directory cannot be created.
    pub fn at(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::at_with(dir, &StoreConfig::default())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::CreateDir`] if the directory cannot be created.
    pub fn at_with(dir: impl Into<PathBuf>, config: &StoreConfig) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            save_path: dir.join(&config.save_file),
            backup_path: dir.join(&config.backup_file),
            codec: StateCodec::new(config.key),
            dir,
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    #[must_use]
    pub const fn codec(&self) -> StateCodec {
        self.codec
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.save_path.as_os_str());
        name.push(".");
        name.push(TEMP_SUFFIX);
        PathBuf::from(name)
    }

    /// Read and decode the save file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] for I/O failures other than a missing file.
    pub fn load(&self) -> Result<LoadOutcome, StoreError> {
        let bytes = match fs::read(&self.save_path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(target: LOG_TARGET_STORE, "no save at {}, starting fresh", self.save_path.display());
                return Ok(LoadOutcome::Fresh);
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.save_path.clone(),
                    source,
                });
            }
        };
        match self.codec.decode(&bytes) {
            Ok(state) => {
                debug!(target: LOG_TARGET_STORE, "loaded save with score {}", state.score);
                Ok(LoadOutcome::Loaded(state))
            }
            Err(err) => {
                warn!(
                    target: LOG_TARGET_STORE,
                    "save at {} is corrupt ({err}); using defaults",
                    self.save_path.display()
                );
                Ok(LoadOutcome::Corrupt(err))
            }
        }
    }

    /// Encode `state` and replace the save file.
    ///
    /// The payload goes to a sibling temporary file first and is then renamed over
    /// the save, so a failed write never truncates the previous save.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] if the temporary file cannot be written or
    /// renamed into place.
    pub fn save(&self, state: &SaveState) -> Result<(), StoreError> {
        let temp = self.temp_path();
        let bytes = self.codec.encode(state);
        let result = fs::write(&temp, &bytes).and_then(|()| fs::rename(&temp, &self.save_path));
        if let Err(source) = result {
            let _ = fs::remove_file(&temp);
            return Err(StoreError::Write {
                path: self.save_path.clone(),
                source,
            });
        }
        debug!(target: LOG_TARGET_STORE, "saved {} bytes to {}", bytes.len(), self.save_path.display());
        Ok(())
    }

    /// Raw bytes of the legacy backup, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] for I/O failures other than a missing file.
    pub fn read_backup(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.backup_path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: self.backup_path.clone(),
                source,
            }),
        }
    }

    /// Write raw bytes as the legacy backup. Used by tooling to stage migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] if the file cannot be written.
    pub fn write_backup(&self, bytes: &[u8]) -> Result<(), StoreError> {
        fs::write(&self.backup_path, bytes).map_err(|source| StoreError::Write {
            path: self.backup_path.clone(),
            source,
        })
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Remove`] if the backup exists but cannot be deleted.
    pub fn remove_backup(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.backup_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove {
                path: self.backup_path.clone(),
                source,
            }),
        }
    }
}

impl ProgressStorage for SaveStore {
    type Error = StoreError;

    fn load(&self) -> Result<LoadOutcome, Self::Error> {
        Self::load(self)
    }

    fn save(&self, state: &SaveState) -> Result<(), Self::Error> {
        Self::save(self, state)
    }

    fn read_backup(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        Self::read_backup(self)
    }

    fn remove_backup(&self) -> Result<(), Self::Error> {
        Self::remove_backup(self)
    }

    fn obfuscation_key(&self) -> u8 {
        self.codec.key()
    }
}
