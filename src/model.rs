use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One observed packet as reported by the capture server.
///
/// Every field is an opaque display value: nothing here is validated or
/// reinterpreted beyond what JSON decoding requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketRecord {
    pub timestamp: Timestamp,
    pub src_ip: String,
    pub dst_ip: String,
    pub protocol: String,
    pub length: u64,
}

/// Capture time exactly as the server sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Text(String),
    Numeric(serde_json::Number),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Text(text) => f.write_str(text),
            Timestamp::Numeric(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for Timestamp {
    fn from(value: &str) -> Self {
        Timestamp::Text(value.to_string())
    }
}

/// A single message received on the live channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LiveFrame {
    Packet(PacketRecord),
    /// Sent by the server when it cannot start capturing, e.g. a missing device.
    ServerError { error: String },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("live message is not valid UTF-8")]
    NotUtf8,
    #[error("live message is not a packet record: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn decode_live_frame(text: &str) -> Result<LiveFrame, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

pub fn decode_live_bytes(bytes: &[u8]) -> Result<LiveFrame, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::NotUtf8)?;
    decode_live_frame(text)
}

/// Decodes an upload response body.
///
/// A `null` body is what the server emits for a capture without IP traffic,
/// so it is read as an empty dataset.
pub fn decode_upload_body(bytes: &[u8]) -> Result<Vec<PacketRecord>, serde_json::Error> {
    let records: Option<Vec<PacketRecord>> = serde_json::from_slice(bytes)?;
    Ok(records.unwrap_or_default())
}
