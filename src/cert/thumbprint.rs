use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use thiserror::Error;

/// Content-derived certificate identifier: SHA-256 of the DER encoding,
/// stored as lowercase hex without separators.
#[derive(Debug, Clone, Eq)]
pub struct Thumbprint {
    hex: String,
}

#[derive(Error, Debug)]
pub enum ThumbprintParseError {
    #[error("Invalid hex character: {0}")]
    InvalidHexCharacter(char),

    #[error("Empty string provided")]
    EmptyString,

    #[error("Invalid length: expected 64 hex characters, got {0}")]
    InvalidLength(usize),
}

pub type Result<T> = std::result::Result<T, ThumbprintParseError>;

impl Thumbprint {
    /// Digest the given bytes
    pub fn of(bytes: &[u8]) -> Self {
        Self {
            hex: hex::encode(Sha256::digest(bytes)),
        }
    }

    /// Parse a thumbprint written as hex (with or without colons)
    pub fn parse(identifier: &str) -> Result<Self> {
        if identifier.is_empty() {
            return Err(ThumbprintParseError::EmptyString);
        }

        let cleaned = identifier.replace(':', "").to_lowercase();

        for ch in cleaned.chars() {
            if !ch.is_ascii_hexdigit() {
                return Err(ThumbprintParseError::InvalidHexCharacter(ch));
            }
        }

        if cleaned.len() != 64 {
            return Err(ThumbprintParseError::InvalidLength(cleaned.len()));
        }

        Ok(Self { hex: cleaned })
    }

    /// Get the raw hex format (no colons)
    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// Abbreviated form for table output
    pub fn short(&self) -> &str {
        &self.hex[..16]
    }

    /// Staged and installed file name for this certificate
    pub fn file_name(&self) -> String {
        format!("{}.crt", self.hex)
    }
}

impl fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex)
    }
}

impl FromStr for Thumbprint {
    type Err = ThumbprintParseError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Hash for Thumbprint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hex.hash(state);
    }
}

impl PartialEq for Thumbprint {
    fn eq(&self, other: &Self) -> bool {
        self.hex == other.hex
    }
}
