//! Content fingerprints selecting which cache file to use

use crate::{Error, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Content hash of one input tree.
///
/// A different input gets a different fingerprint and therefore a fresh,
/// empty cache file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(blake3::Hash);

impl Fingerprint {
    /// Fingerprint of an in-memory buffer
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes))
    }

    /// Fingerprint of a file's content
    pub fn of_file(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)?;
        Ok(Self::of_bytes(&content))
    }

    /// Parse a 64-character hex fingerprint (either case)
    pub fn from_hex(hex: &str) -> Result<Self> {
        blake3::Hash::from_hex(hex.trim())
            .map(Self)
            .map_err(|e| Error::InvalidFingerprint(format!("{}: {}", hex, e)))
    }

    /// Lowercase hex encoding, as used in cache file names
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl From<[u8; 32]> for Fingerprint {
    fn from(bytes: [u8; 32]) -> Self {
        Self(blake3::Hash::from(bytes))
    }
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
