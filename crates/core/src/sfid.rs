//! Salesforce record identifiers.
//!
//! A Salesforce id comes in two forms:
//! - 15 characters, case-sensitive (as shown in the UI)
//! - 18 characters, case-insensitive: the 15-char form plus a 3-character checksum
//!
//! The checksum encodes the case pattern of each 5-character chunk: every
//! uppercase letter sets the bit at its position within the chunk, and the
//! resulting 5-bit value indexes into `A-Z0-5`.
//!
//! Example: "001A0000006Vm9r" -> "001A0000006Vm9rIAC"

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

const CHECKSUM_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ012345";

/// Canonical 18-character Salesforce id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sfid(String);

impl Sfid {
    /// Parse a 15- or 18-character id into its canonical 18-character form.
    pub fn new(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if !raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(Error::InvalidIdentifier(raw.to_string()));
        }

        match raw.len() {
            18 => Ok(Self(raw.to_string())),
            15 => Ok(Self(format!("{}{}", raw, compute_checksum(raw)))),
            _ => Err(Error::InvalidIdentifier(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The case-sensitive 15-character form.
    pub fn short(&self) -> &str {
        &self.0[..15]
    }

    /// Three-character key prefix identifying the object type.
    pub fn key_prefix(&self) -> &str {
        &self.0[..3]
    }
}

/// Compute the 3-character checksum suffix for a 15-character id.
fn compute_checksum(id15: &str) -> String {
    id15.as_bytes()
        .chunks(5)
        .map(|chunk| {
            let index = chunk
                .iter()
                .enumerate()
                .filter(|(_, b)| b.is_ascii_uppercase())
                .fold(0usize, |acc, (i, _)| acc | (1 << i));
            CHECKSUM_ALPHABET[index] as char
        })
        .collect()
}

/// Quick heuristic: 15 or 18 ASCII alphanumerics. Does not verify the checksum.
pub fn looks_like_sfid(s: &str) -> bool {
    let s = s.trim();
    matches!(s.len(), 15 | 18) && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

impl fmt::Display for Sfid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Sfid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Sfid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Sfid> for String {
    fn from(value: Sfid) -> Self {
        value.0
    }
}

impl AsRef<str> for Sfid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
