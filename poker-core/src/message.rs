//! Wire and in-process message model.
//!
//! `Inbound` and `Outbound` are the closed set of kinds a session can
//! decode from, or encode onto, a transport frame. Decoding is liberal:
//! an unknown `type` or a payload of the wrong shape is reported as a
//! [`DecodeError`] that the session logs and swallows rather than a
//! panic or a connection-ending error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::room::RevealEntry;

/// Role carried by a participant, surfaced on the wire under these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    ProductOwner,
    Developer,
}

/// Commands accepted from a client, post role-authorization.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Guess(u32),
    Skip,
    NewRound,
    Estimate(String),
    Reveal,
    LockRoom { password: String, key: String },
    OpenRoom { key: String },
}

/// Wire envelope, as read directly off the transport.
#[derive(Debug, Deserialize)]
struct RawInbound {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown message kind `{0}`")]
    UnknownKind(String),
    #[error("malformed payload for `{kind}`: {reason}")]
    BadPayload { kind: String, reason: String },
}

impl Inbound {
    /// Decode one transport frame. Never panics; malformed frames come
    /// back as a logged-and-dropped [`DecodeError`].
    pub fn decode(frame: &str) -> Result<Inbound, DecodeError> {
        let raw: RawInbound = serde_json::from_str(frame).map_err(|e| DecodeError::BadPayload {
            kind: "<envelope>".to_string(),
            reason: e.to_string(),
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawInbound) -> Result<Inbound, DecodeError> {
        let bad = |reason: &str| DecodeError::BadPayload {
            kind: raw.kind.clone(),
            reason: reason.to_string(),
        };
        match raw.kind.as_str() {
            "guess" => {
                let n = raw
                    .data
                    .as_u64()
                    .ok_or_else(|| bad("expected non-negative integer"))?;
                let n = u32::try_from(n).map_err(|_| bad("guess out of range"))?;
                Ok(Inbound::Guess(n))
            }
            "skip" => Ok(Inbound::Skip),
            "new-round" => Ok(Inbound::NewRound),
            "estimate" => {
                let ticket = raw
                    .data
                    .as_str()
                    .ok_or_else(|| bad("expected a string ticket id"))?;
                Ok(Inbound::Estimate(ticket.to_string()))
            }
            "reveal" => Ok(Inbound::Reveal),
            "lock-room" => {
                let password = raw
                    .data
                    .get("password")
                    .and_then(Value::as_str)
                    .ok_or_else(|| bad("missing `password`"))?;
                let key = raw
                    .data
                    .get("key")
                    .and_then(Value::as_str)
                    .ok_or_else(|| bad("missing `key`"))?;
                Ok(Inbound::LockRoom {
                    password: password.to_string(),
                    key: key.to_string(),
                })
            }
            "open-room" => {
                let key = raw
                    .data
                    .get("key")
                    .and_then(Value::as_str)
                    .ok_or_else(|| bad("missing `key`"))?;
                Ok(Inbound::OpenRoom {
                    key: key.to_string(),
                })
            }
            other => Err(DecodeError::UnknownKind(other.to_string())),
        }
    }
}

/// Events the server pushes to a connection's outbound channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Join,
    Leave(String),
    DeveloperGuessed,
    DeveloperSkipped,
    EveryoneDone,
    NewRound,
    Estimate(String),
    Reveal(Vec<RevealEntry>),
    RoomLocked,
    RoomOpened,
    YouGuessed(u32),
    YouSkipped,
}

#[derive(Serialize)]
struct WireEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl Outbound {
    /// Render to the `{"type": ..., "data": ...}` wire shape.
    pub fn to_frame(&self) -> String {
        let (kind, data) = match self {
            Outbound::Join => ("join", None),
            Outbound::Leave(name) => ("leave", Some(Value::String(name.clone()))),
            Outbound::DeveloperGuessed => ("developer-guessed", None),
            Outbound::DeveloperSkipped => ("developer-skipped", None),
            Outbound::EveryoneDone => ("everyone-done", None),
            Outbound::NewRound => ("new-round", None),
            Outbound::Estimate(ticket) => ("estimate", Some(Value::String(ticket.clone()))),
            Outbound::Reveal(entries) => (
                "reveal",
                Some(serde_json::to_value(entries).expect("reveal entries always serialize")),
            ),
            Outbound::RoomLocked => ("room-locked", None),
            Outbound::RoomOpened => ("room-opened", None),
            Outbound::YouGuessed(n) => ("you-guessed", Some(Value::from(*n))),
            Outbound::YouSkipped => ("you-skipped", None),
        };
        serde_json::to_string(&WireEnvelope { kind, data })
            .expect("outbound envelope always serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_guess() {
        assert_eq!(
            Inbound::decode(r#"{"type":"guess","data":3}"#),
            Ok(Inbound::Guess(3))
        );
    }

    #[test]
    fn decodes_skip_with_no_data() {
        assert_eq!(Inbound::decode(r#"{"type":"skip"}"#), Ok(Inbound::Skip));
    }

    #[test]
    fn decodes_lock_room() {
        let got = Inbound::decode(r#"{"type":"lock-room","data":{"password":"pw","key":"k"}}"#);
        assert_eq!(
            got,
            Ok(Inbound::LockRoom {
                password: "pw".to_string(),
                key: "k".to_string(),
            })
        );
    }

    #[test]
    fn unknown_kind_is_a_decode_error_not_a_panic() {
        let err = Inbound::decode(r#"{"type":"carrier-pigeon"}"#).unwrap_err();
        assert_eq!(err, DecodeError::UnknownKind("carrier-pigeon".to_string()));
    }

    #[test]
    fn wrong_payload_shape_is_a_decode_error() {
        let err = Inbound::decode(r#"{"type":"guess","data":"three"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::BadPayload { .. }));
    }

    #[test]
    fn outbound_you_guessed_renders_data() {
        assert_eq!(
            Outbound::YouGuessed(3).to_frame(),
            r#"{"type":"you-guessed","data":3}"#
        );
    }

    #[test]
    fn outbound_skip_omits_data() {
        assert_eq!(Outbound::YouSkipped.to_frame(), r#"{"type":"you-skipped"}"#);
    }
}
