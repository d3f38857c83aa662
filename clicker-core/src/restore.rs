//! Legacy backup migration.
//!
//! Earlier releases wrote several incompatible payloads. [`decode_legacy`] tries each
//! known shape newest first and only accepts a payload whose field count and field
//! types line up exactly; [`RestoreFlow`] wraps that in an explicit, user-confirmed,
//! all-or-nothing replacement of the live [`ProgressionModel`].
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ProgressStorage;
use crate::codec::{PurchaseFlag, parse_object, xor_in_place};
use crate::constants::LOG_TARGET_RESTORE;
use crate::error::{LegacyDecodeError, RestoreError};
use crate::progression::ProgressionModel;
use crate::state::SaveState;

/// Payload shapes shipped before the current schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyFormat {
    /// `{score, controls_visible, achievements[, upgrades, mini_event_click_count]}`
    Document,
    /// `score|controls|achievements|upgrade:0or1,...`
    PipeV3,
    /// `score|controls|achievements`
    PipeV2,
    /// `score|controls`
    PipeV1,
}

impl LegacyFormat {
    /// Decoder order used by restore: newest first.
    pub const ALL: [Self; 4] = [Self::Document, Self::PipeV3, Self::PipeV2, Self::PipeV1];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::PipeV3 => "pipe-v3",
            Self::PipeV2 => "pipe-v2",
            Self::PipeV1 => "pipe-v1",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.as_str() == name)
    }

    /// Decode an already de-obfuscated payload in this format.
    ///
    /// # Errors
    ///
    /// Returns a [`LegacyDecodeError`] describing the first field that does not fit.
    pub fn decode(self, plain: &[u8]) -> Result<SaveState, LegacyDecodeError> {
        match self {
            Self::Document => decode_document(plain),
            Self::PipeV3 => decode_pipe(pipe_text(plain)?, 4),
            Self::PipeV2 => decode_pipe(pipe_text(plain)?, 3),
            Self::PipeV1 => decode_pipe(pipe_text(plain)?, 2),
        }
    }

    /// Write `state` the way the release using this format did, obfuscated with
    /// `key`. Fields the format cannot carry are dropped.
    #[must_use]
    pub fn encode(self, state: &SaveState, key: u8) -> Vec<u8> {
        let text = match self {
            Self::Document => json!({
                "score": state.score,
                "controls_visible": state.controls_visible,
                "achievements": state.unlocked_achievements,
                "upgrades": state.purchased_upgrades,
                "mini_event_click_count": state.mini_event_click_count,
            })
            .to_string(),
            Self::PipeV3 => format!(
                "{}|{}",
                pipe_prefix(state, true),
                state
                    .purchased_upgrades
                    .iter()
                    .map(|(id, purchased)| format!("{id}:{}", u8::from(*purchased)))
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            Self::PipeV2 => pipe_prefix(state, true),
            Self::PipeV1 => pipe_prefix(state, false),
        };
        let mut bytes = text.into_bytes();
        xor_in_place(&mut bytes, key);
        bytes
    }
}

impl fmt::Display for LegacyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn pipe_prefix(state: &SaveState, with_achievements: bool) -> String {
    let head = format!("{}|{}", state.score, u8::from(state.controls_visible));
    if !with_achievements {
        return head;
    }
    let ids: Vec<&str> = state
        .unlocked_achievements
        .iter()
        .map(String::as_str)
        .collect();
    format!("{head}|{}", ids.join(","))
}

/// Try every legacy decoder against `bytes`, newest format first.
///
/// The payload is de-obfuscated with `key` before decoding. Some releases left the
/// document backup as plain JSON, so the document decoder also gets the raw bytes
/// when the de-obfuscated ones fail.
///
/// # Errors
///
/// Returns one `(format, error)` pair per decoder tried when none accepts the payload.
pub fn decode_legacy(
    bytes: &[u8],
    key: u8,
) -> Result<(LegacyFormat, SaveState), Vec<(LegacyFormat, LegacyDecodeError)>> {
    let mut plain = bytes.to_vec();
    xor_in_place(&mut plain, key);
    let mut attempts = Vec::with_capacity(LegacyFormat::ALL.len());
    for format in LegacyFormat::ALL {
        let decoded = match format {
            LegacyFormat::Document => {
                format.decode(&plain).or_else(|err| decode_document(bytes).map_err(|_| err))
            }
            _ => format.decode(&plain),
        };
        match decoded {
            Ok(state) => return Ok((format, state)),
            Err(err) => {
                debug!(target: LOG_TARGET_RESTORE, "{format} decoder rejected backup: {err}");
                attempts.push((format, err));
            }
        }
    }
    Err(attempts)
}

/// `score` is required: without it the payload is not treated as a backup.
#[derive(Debug, Deserialize)]
struct LegacyDocument {
    score: u64,
    #[serde(default)]
    controls_visible: bool,
    #[serde(default)]
    achievements: Vec<String>,
    #[serde(default)]
    upgrades: BTreeMap<String, PurchaseFlag>,
    #[serde(default)]
    mini_event_click_count: u64,
}

fn decode_document(plain: &[u8]) -> Result<SaveState, LegacyDecodeError> {
    let text = std::str::from_utf8(plain).map_err(|_| LegacyDecodeError::InvalidEncoding)?;
    let doc: LegacyDocument = parse_object(text)
        .and_then(serde_json::from_value)
        .map_err(|err| LegacyDecodeError::Document(err.to_string()))?;
    Ok(SaveState {
        score: doc.score,
        controls_visible: doc.controls_visible,
        unlocked_achievements: doc.achievements.into_iter().collect(),
        purchased_upgrades: doc
            .upgrades
            .into_iter()
            .map(|(id, flag)| (id, flag.is_purchased()))
            .collect(),
        mini_event_click_count: doc.mini_event_click_count,
    })
}

fn pipe_text(plain: &[u8]) -> Result<&str, LegacyDecodeError> {
    let text = std::str::from_utf8(plain).map_err(|_| LegacyDecodeError::InvalidEncoding)?;
    Ok(text.trim_end_matches(['\r', '\n']))
}

fn decode_pipe(text: &str, expected: usize) -> Result<SaveState, LegacyDecodeError> {
    let fields: Vec<&str> = text.split('|').collect();
    if fields.len() != expected {
        return Err(LegacyDecodeError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    let mut state = SaveState {
        score: parse_score(fields[0])?,
        controls_visible: parse_flag("controls_visible", fields[1])?,
        ..SaveState::default()
    };
    if let Some(raw) = fields.get(2) {
        state.unlocked_achievements = parse_ids(raw)?;
    }
    if let Some(raw) = fields.get(3) {
        state.purchased_upgrades = parse_upgrades(raw)?;
    }
    Ok(state)
}

fn invalid(field: &'static str, value: &str) -> LegacyDecodeError {
    LegacyDecodeError::InvalidField {
        field,
        value: value.to_string(),
    }
}

fn parse_score(raw: &str) -> Result<u64, LegacyDecodeError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("score", raw));
    }
    raw.parse().map_err(|_| invalid("score", raw))
}

fn parse_flag(field: &'static str, raw: &str) -> Result<bool, LegacyDecodeError> {
    match raw {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(invalid(field, raw)),
    }
}

fn parse_ids(raw: &str) -> Result<BTreeSet<String>, LegacyDecodeError> {
    if raw.is_empty() {
        return Ok(BTreeSet::new());
    }
    raw.split(',')
        .map(|id| {
            if id.is_empty() {
                Err(invalid("achievements", raw))
            } else {
                Ok(id.to_string())
            }
        })
        .collect()
}

fn parse_upgrades(raw: &str) -> Result<BTreeMap<String, bool>, LegacyDecodeError> {
    if raw.is_empty() {
        return Ok(BTreeMap::new());
    }
    raw.split(',')
        .map(|entry| {
            let (id, flag) = entry
                .split_once(':')
                .ok_or_else(|| invalid("upgrades", entry))?;
            if id.is_empty() {
                return Err(invalid("upgrades", entry));
            }
            Ok((id.to_string(), parse_flag("upgrades", flag)?))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestorePhase {
    #[default]
    Idle,
    Confirming,
    Applying,
}

/// Result of a completed restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub format: LegacyFormat,
    /// State as decoded from the backup. `controls_visible` is for the UI owner.
    pub restored: SaveState,
    /// False when the post-restore save failed; the backup is then kept.
    pub persisted: bool,
    pub backup_removed: bool,
}

/// `Idle -> Confirming -> Applying -> Idle`, with `Confirming -> Idle` on cancel.
#[derive(Debug, Clone, Default)]
pub struct RestoreFlow {
    phase: RestorePhase,
}

impl RestoreFlow {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: RestorePhase::Idle,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> RestorePhase {
        self.phase
    }

    /// Ask for confirmation. Repeating the request while confirming is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RestoreError::Busy`] while a restore is being applied.
    pub fn request_restore(&mut self) -> Result<(), RestoreError> {
        match self.phase {
            RestorePhase::Applying => Err(RestoreError::Busy),
            RestorePhase::Confirming => Ok(()),
            RestorePhase::Idle => {
                info!(target: LOG_TARGET_RESTORE, "restore requested, awaiting confirmation");
                self.phase = RestorePhase::Confirming;
                Ok(())
            }
        }
    }

    /// Back out of a pending confirmation. Returns whether anything was cancelled.
    pub fn cancel(&mut self) -> bool {
        if self.phase == RestorePhase::Confirming {
            info!(target: LOG_TARGET_RESTORE, "restore cancelled");
            self.phase = RestorePhase::Idle;
            true
        } else {
            false
        }
    }

    /// Decode the backup held by `storage` and, if any legacy decoder accepts it,
    /// swap it into `model`, save, and delete the backup. Always ends in `Idle`.
    ///
    /// # Errors
    ///
    /// - [`RestoreError::NotConfirming`] unless [`Self::request_restore`] came first.
    /// - [`RestoreError::NotFound`] when there is no backup.
    /// - [`RestoreError::Storage`] when the backup cannot be read.
    /// - [`RestoreError::Decode`] when no decoder accepts the payload.
    ///
    /// `model` and the backup are untouched in every error case.
    pub fn confirm<S: ProgressStorage>(
        &mut self,
        model: &mut ProgressionModel,
        storage: &S,
    ) -> Result<RestoreReport, RestoreError> {
        if self.phase != RestorePhase::Confirming {
            return Err(RestoreError::NotConfirming);
        }
        self.phase = RestorePhase::Applying;
        let result = Self::apply(model, storage);
        self.phase = RestorePhase::Idle;
        result
    }

    fn apply<S: ProgressStorage>(
        model: &mut ProgressionModel,
        storage: &S,
    ) -> Result<RestoreReport, RestoreError> {
        let (format, restored) = preview(storage)?;
        model.replace(restored.clone());
        info!(
            target: LOG_TARGET_RESTORE,
            "restored {format} backup: score {}, {} achievements",
            restored.score,
            restored.unlocked_achievements.len()
        );

        if let Err(err) = storage.save(&model.snapshot()) {
            warn!(target: LOG_TARGET_RESTORE, "restored state could not be saved ({err}); keeping backup");
            return Ok(RestoreReport {
                format,
                restored,
                persisted: false,
                backup_removed: false,
            });
        }
        let backup_removed = match storage.remove_backup() {
            Ok(()) => true,
            Err(err) => {
                warn!(target: LOG_TARGET_RESTORE, "could not delete legacy backup: {err}");
                false
            }
        };
        Ok(RestoreReport {
            format,
            restored,
            persisted: true,
            backup_removed,
        })
    }
}

/// Read and decode the backup without touching any state.
///
/// # Errors
///
/// Same as [`RestoreFlow::confirm`], minus the phase check.
pub fn preview<S: ProgressStorage>(storage: &S) -> Result<(LegacyFormat, SaveState), RestoreError> {
    let bytes = storage
        .read_backup()
        .map_err(|err| RestoreError::Storage(Box::new(err)))?
        .ok_or(RestoreError::NotFound)?;
    decode_legacy(&bytes, storage.obfuscation_key()).map_err(|attempts| {
        warn!(target: LOG_TARGET_RESTORE, "legacy backup matched no known format");
        RestoreError::Decode { attempts }
    })
}
