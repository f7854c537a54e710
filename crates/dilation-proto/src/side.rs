//! Side identifiers.
//!
//! Each engine instance generates one 8-byte random side, rendered on the
//! wire as 16 lowercase hex characters. Sides serve double duty: they tag
//! frames in flight, and the lexicographically greater side becomes the
//! Leader when roles are elected.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{ProtocolError, Result};

/// An 8-byte side identifier.
///
/// `Ord` compares the raw bytes, which agrees with lexicographic comparison
/// of the lowercase hex rendering: each byte maps to two hex digits in a
/// value-preserving order, so `a.0 < b.0` exactly when
/// `a.to_hex() < b.to_hex()`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Side([u8; 8]);

impl Side {
    /// Number of raw bytes in a side.
    pub const LEN: usize = 8;

    /// Number of hex characters in the wire rendering.
    pub const HEX_LEN: usize = 16;

    /// Construct a side from raw bytes.
    ///
    /// The bytes are expected to come from a cryptographically secure source;
    /// the engine obtains them through its environment abstraction.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Parse a side from its wire rendering.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidSide`] unless the input is exactly 16
    /// characters drawn from `0-9a-f`. Uppercase hex is rejected: the wire
    /// rendering is canonical, and role election compares renderings.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != Self::HEX_LEN
            || !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(ProtocolError::InvalidSide(s.to_string()));
        }

        let decoded = hex::decode(s).map_err(|_| ProtocolError::InvalidSide(s.to_string()))?;

        let mut bytes = [0u8; Self::LEN];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }

    /// The canonical wire rendering: 16 lowercase hex characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Side({})", self.to_hex())
    }
}

impl Serialize for Side {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Side {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Side::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
