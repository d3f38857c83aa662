//! Current-schema save codec: JSON document wrapped in single-byte XOR.
//!
//! Pure functions only; file handling lives in [`crate::storage`].
use log::warn;
use serde::Deserialize;
use serde::de::{Error as _, Unexpected};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::constants::{LOG_TARGET_CODEC, OBFUSCATION_KEY, SCHEMA_VERSION};
use crate::error::DecodeError;
use crate::state::SaveState;

/// Apply the repeating single-byte XOR in place. The transform is its own inverse.
pub fn xor_in_place(bytes: &mut [u8], key: u8) {
    for byte in bytes.iter_mut() {
        *byte ^= key;
    }
}

/// Upgrade flags as they appear on disk. Older releases stored purchase counts.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub(crate) enum PurchaseFlag {
    Flag(bool),
    Count(u64),
}

impl PurchaseFlag {
    pub(crate) const fn is_purchased(self) -> bool {
        match self {
            Self::Flag(flag) => flag,
            Self::Count(count) => count > 0,
        }
    }
}

/// Incoming document. Every field defaults so that a partial document still
/// decodes; unknown fields written by other releases are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SaveDocument {
    schema_version: Option<u32>,
    score: u64,
    controls_visible: bool,
    achievements: Vec<String>,
    upgrades: BTreeMap<String, PurchaseFlag>,
    mini_event_click_count: u64,
}

/// Parse `text` as a JSON object. Derived structs would also take a positional
/// array, which is not a save document.
pub(crate) fn parse_object(text: &str) -> Result<Value, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    if value.is_object() {
        return Ok(value);
    }
    let unexpected = match &value {
        Value::Object(_) => Unexpected::Map,
        Value::Null => Unexpected::Unit,
        Value::Bool(flag) => Unexpected::Bool(*flag),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(raw) => Unexpected::Str(raw),
        Value::Array(_) => Unexpected::Seq,
    };
    Err(serde_json::Error::invalid_type(unexpected, &"a JSON object"))
}

impl From<SaveDocument> for SaveState {
    fn from(doc: SaveDocument) -> Self {
        Self {
            score: doc.score,
            controls_visible: doc.controls_visible,
            unlocked_achievements: doc.achievements.into_iter().collect(),
            purchased_upgrades: doc
                .upgrades
                .into_iter()
                .map(|(id, flag)| (id, flag.is_purchased()))
                .collect(),
            mini_event_click_count: doc.mini_event_click_count,
        }
    }
}

/// Encoder/decoder for the current on-disk schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateCodec {
    key: u8,
}

impl Default for StateCodec {
    fn default() -> Self {
        Self::new(OBFUSCATION_KEY)
    }
}

impl StateCodec {
    #[must_use]
    pub const fn new(key: u8) -> Self {
        Self { key }
    }

    #[must_use]
    pub const fn key(&self) -> u8 {
        self.key
    }

    /// Serialize `state` as a versioned document and obfuscate it.
    ///
    /// Output is deterministic: equal states always produce equal bytes.
    #[must_use]
    pub fn encode(&self, state: &SaveState) -> Vec<u8> {
        let mut bytes = Self::document(state).to_string().into_bytes();
        xor_in_place(&mut bytes, self.key);
        bytes
    }

    /// Plain (un-obfuscated) document, used by tools that display a save.
    #[must_use]
    pub fn document(state: &SaveState) -> Value {
        let mut doc = Map::new();
        doc.insert("schema_version".into(), Value::from(SCHEMA_VERSION));
        doc.insert("score".into(), Value::from(state.score));
        doc.insert(
            "controls_visible".into(),
            Value::Bool(state.controls_visible),
        );
        doc.insert(
            "achievements".into(),
            state
                .unlocked_achievements
                .iter()
                .cloned()
                .map(Value::String)
                .collect(),
        );
        doc.insert(
            "upgrades".into(),
            Value::Object(
                state
                    .purchased_upgrades
                    .iter()
                    .map(|(id, purchased)| (id.clone(), Value::Bool(*purchased)))
                    .collect(),
            ),
        );
        doc.insert(
            "mini_event_click_count".into(),
            Value::from(state.mini_event_click_count),
        );
        Value::Object(doc)
    }

    /// Reverse the obfuscation and parse the document.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the payload is not UTF-8, is not a document of
    /// the expected shape (including negative or non-numeric counters), or carries a
    /// schema version newer than this build understands.
    pub fn decode(&self, bytes: &[u8]) -> Result<SaveState, DecodeError> {
        let mut plain = bytes.to_vec();
        xor_in_place(&mut plain, self.key);
        let text = std::str::from_utf8(&plain).map_err(DecodeError::InvalidEncoding)?;
        let doc: SaveDocument = parse_object(text)
            .and_then(serde_json::from_value)
            .map_err(DecodeError::Malformed)?;
        if let Some(found) = doc.schema_version
            && found > SCHEMA_VERSION
        {
            return Err(DecodeError::UnsupportedVersion {
                found,
                supported: SCHEMA_VERSION,
            });
        }
        Ok(doc.into())
    }

    /// Decode, substituting the default state on failure. The error is handed back
    /// so callers can distinguish corruption from a clean decode.
    #[must_use]
    pub fn decode_or_default(&self, bytes: &[u8]) -> (SaveState, Option<DecodeError>) {
        match self.decode(bytes) {
            Ok(state) => (state, None),
            Err(err) => {
                warn!(target: LOG_TARGET_CODEC, "discarding undecodable save: {err}");
                (SaveState::default(), Some(err))
            }
        }
    }
}
