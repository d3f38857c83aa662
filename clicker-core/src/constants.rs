//! Centralized layout and tuning constants for the progression store.
//!
//! Anything that ends up on disk (key, folder, filenames, schema tag) lives here so
//! a format change is always a reviewed code change.

use std::time::Duration;

// Storage layout -----------------------------------------------------------
pub const APP_DATA_ENV_VAR: &str = "LOCALAPPDATA";
pub const SAVE_FOLDER: &str = ".assets";
pub const SAVE_FILENAME: &str = "score.dat";
pub const LEGACY_BACKUP_FILENAME: &str = "old.json";
pub(crate) const TEMP_SUFFIX: &str = "tmp";

// Codec --------------------------------------------------------------------
/// Single-byte XOR key applied to every payload byte. Obfuscation only.
pub const OBFUSCATION_KEY: u8 = 123;
/// Version tag written into every current-schema document.
pub const SCHEMA_VERSION: u32 = 5;

// Progression --------------------------------------------------------------
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(3);
pub const BASE_POINTS_PER_CLICK: u64 = 1;
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

// Mini events --------------------------------------------------------------
pub const MINI_EVENT_UPGRADE_CHANCE: f64 = 0.05;
pub const MINI_EVENT_MIN_POINTS: u64 = 1;
pub const MINI_EVENT_MAX_POINTS: u64 = 1_000;

// Log targets --------------------------------------------------------------
pub(crate) const LOG_TARGET_CODEC: &str = "clicker::codec";
pub(crate) const LOG_TARGET_STORE: &str = "clicker::store";
pub(crate) const LOG_TARGET_RESTORE: &str = "clicker::restore";
pub(crate) const LOG_TARGET_SESSION: &str = "clicker::session";
