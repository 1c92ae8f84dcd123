//! Decoding of inbound control messages.
//!
//! Two topics drive the sign: one carries `{"mode": <int>}`, the other a JSON
//! object with one colour name per section. Palette fields are handled one by
//! one so a single bad field never discards the rest of the message.

use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::palette::{LEFT_EAR, MAIN_SECTIONS, RIGHT_EAR};

pub const DEFAULT_MODE_TOPIC: &str = "studio-logo/mode";
pub const DEFAULT_PALETTE_TOPIC: &str = "studio-logo/palette";

/// Fields read from a palette payload, in processing order.
pub const PALETTE_FIELDS: [&str; 7] = [
    MAIN_SECTIONS[0],
    MAIN_SECTIONS[1],
    MAIN_SECTIONS[2],
    MAIN_SECTIONS[3],
    MAIN_SECTIONS[4],
    LEFT_EAR,
    RIGHT_EAR,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// New raw mode value.
    Mode(u8),
    Palette(PaletteUpdate),
}

/// Section assignments decoded from a palette payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaletteUpdate {
    /// `(section, colour)` pairs for every usable field.
    pub assignments: Vec<(String, String)>,
    /// One entry per absent or unusable field.
    pub malformed: Vec<Error>,
}

#[derive(Deserialize)]
struct ModePayload {
    mode: i64,
}

/// Decode a mode payload. Values outside `0..=255` are rejected.
pub fn decode_mode(payload: &[u8]) -> Result<u8> {
    let parsed: ModePayload = serde_json::from_slice(payload)
        .map_err(|e| Error::malformed(format!("mode payload: {e}")))?;
    u8::try_from(parsed.mode)
        .map_err(|_| Error::malformed(format!("mode {} out of range", parsed.mode)))
}

/// Decode a palette payload.
///
/// Fails only if the payload is not a JSON object; per-field problems are
/// collected in [`PaletteUpdate::malformed`].
pub fn decode_palette(payload: &[u8]) -> Result<PaletteUpdate> {
    let object: Map<String, Value> = serde_json::from_slice(payload)
        .map_err(|e| Error::malformed(format!("palette payload: {e}")))?;

    let mut update = PaletteUpdate::default();
    for field in PALETTE_FIELDS {
        match object.get(field) {
            Some(Value::String(color)) if !color.is_empty() => {
                update.assignments.push((field.to_string(), color.clone()));
            }
            Some(Value::String(_)) => {
                update
                    .malformed
                    .push(Error::malformed(format!("field '{field}' is empty")));
            }
            Some(other) => {
                update.malformed.push(Error::malformed(format!(
                    "field '{field}' is not a string: {other}"
                )));
            }
            None => {
                update
                    .malformed
                    .push(Error::malformed(format!("field '{field}' is missing")));
            }
        }
    }
    debug!(
        "Palette payload: {} fields usable, {} malformed",
        update.assignments.len(),
        update.malformed.len()
    );
    Ok(update)
}

/// Topic names the controller listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub mode: String,
    pub palette: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            mode: DEFAULT_MODE_TOPIC.to_string(),
            palette: DEFAULT_PALETTE_TOPIC.to_string(),
        }
    }
}

impl Topics {
    /// Route a message to its decoder. `Ok(None)` for topics we do not handle.
    pub fn decode(&self, topic: &str, payload: &[u8]) -> Result<Option<ControlMessage>> {
        if topic == self.mode {
            decode_mode(payload).map(|mode| Some(ControlMessage::Mode(mode)))
        } else if topic == self.palette {
            decode_palette(payload).map(|update| Some(ControlMessage::Palette(update)))
        } else {
            Ok(None)
        }
    }

    pub fn all(&self) -> [&str; 2] {
        [&self.mode, &self.palette]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_payload() {
        assert_eq!(decode_mode(br#"{"mode": 2}"#), Ok(2));
        assert_eq!(decode_mode(br#"{"mode": 0, "extra": true}"#), Ok(0));
        assert_eq!(decode_mode(br#"{"mode": 255}"#), Ok(255));
    }

    #[test]
    fn bad_mode_payloads() {
        let payloads: [&[u8]; 7] = [
            br#"{"mode": 256}"#,
            br#"{"mode": -1}"#,
            br#"{"mode": "2"}"#,
            br#"{"mode": 1.5}"#,
            br#"{}"#,
            b"not json",
            b"",
        ];
        for payload in payloads {
            assert!(
                matches!(decode_mode(payload), Err(Error::MalformedPayload { .. })),
                "{:?}",
                String::from_utf8_lossy(payload)
            );
        }
    }

    #[test]
    fn full_palette() {
        let update = decode_palette(
            br#"{"section01":"red","section02":"green","section03":"blue",
                 "section04":"yellow","section05":"purple",
                 "leftEar":"white","rightEar":"orange"}"#,
        )
        .unwrap();
        assert!(update.malformed.is_empty());
        assert_eq!(update.assignments.len(), 7);
        assert_eq!(
            update.assignments[5],
            ("leftEar".to_string(), "white".to_string())
        );
    }

    #[test]
    fn partial_palette_reports_each_missing_field() {
        let update = decode_palette(br#"{"section01":"red"}"#).unwrap();
        assert_eq!(
            update.assignments,
            vec![("section01".to_string(), "red".to_string())]
        );
        assert_eq!(update.malformed.len(), 6);
    }

    #[test]
    fn non_string_fields_are_malformed() {
        let update =
            decode_palette(br#"{"section01":null,"section02":3,"section03":""}"#).unwrap();
        assert!(update.assignments.is_empty());
        assert_eq!(update.malformed.len(), 7);
    }

    #[test]
    fn palette_must_be_object() {
        assert!(decode_palette(b"[1,2]").is_err());
        assert!(decode_palette(b"{").is_err());
    }

    #[test]
    fn routing() {
        let topics = Topics::default();
        assert_eq!(
            topics.decode("studio-logo/mode", br#"{"mode":3}"#),
            Ok(Some(ControlMessage::Mode(3)))
        );
        assert!(matches!(
            topics.decode("studio-logo/palette", br#"{}"#),
            Ok(Some(ControlMessage::Palette(_)))
        ));
        assert_eq!(topics.decode("studio-logo/other", b"{}"), Ok(None));
        assert_eq!(topics.all(), ["studio-logo/mode", "studio-logo/palette"]);
    }
}
