//! Pagination cursors
//!
//! A cursor is `base64url_nopad(JSON(payload) || crc32_be(JSON(payload)))`.
//! The payload names the scan it belongs to and the position of the last
//! returned item. Resuming is strictly after that position.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use super::errors::{ExecutorError, ExecutorResult};
use crate::index::EntryKey;

/// Where a scan stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScanPosition {
    /// Identity (or name) of the last item of an ordered listing
    Identity { id: String },
    /// Last index entry of an index scan
    Entry { entry: EntryKey },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub scan: String,
    pub position: ScanPosition,
}

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

impl Cursor {
    pub fn new(scan: impl Into<String>, position: ScanPosition) -> Self {
        Self {
            scan: scan.into(),
            position,
        }
    }

    pub fn encode(&self) -> ExecutorResult<String> {
        let mut bytes = serde_json::to_vec(self)
            .map_err(|e| ExecutorError::execution_failed(format!("cursor encoding failed: {}", e)))?;
        let crc = checksum(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Decodes a token and checks it belongs to `scan`.
    pub fn decode(token: &str, scan: &str) -> ExecutorResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| ExecutorError::invalid_cursor("not valid base64"))?;
        if bytes.len() < 4 {
            return Err(ExecutorError::invalid_cursor("too short"));
        }
        let (payload, crc) = bytes.split_at(bytes.len() - 4);
        let expected = u32::from_be_bytes([crc[0], crc[1], crc[2], crc[3]]);
        if checksum(payload) != expected {
            return Err(ExecutorError::invalid_cursor("checksum mismatch"));
        }
        let cursor: Cursor = serde_json::from_slice(payload)
            .map_err(|_| ExecutorError::invalid_cursor("malformed payload"))?;
        if cursor.scan != scan {
            return Err(ExecutorError::invalid_cursor(format!(
                "issued for scan '{}', not '{}'",
                cursor.scan, scan
            )));
        }
        Ok(cursor)
    }

    /// Identity position, or an error for index positions
    pub fn identity(&self) -> ExecutorResult<&str> {
        match &self.position {
            ScanPosition::Identity { id } => Ok(id),
            ScanPosition::Entry { .. } => Err(ExecutorError::invalid_cursor("expected an identity position")),
        }
    }

    /// Index entry position, or an error for identity positions
    pub fn entry(&self) -> ExecutorResult<&EntryKey> {
        match &self.position {
            ScanPosition::Entry { entry } => Ok(entry),
            ScanPosition::Identity { .. } => Err(ExecutorError::invalid_cursor("expected an index position")),
        }
    }
}
