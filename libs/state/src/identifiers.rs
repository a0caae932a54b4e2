//! Opaque pool identifier
//!
//! The settlement core receives pool identifiers from its addressing layer
//! and never derives them. Any 32-byte key works (a program-derived address,
//! a hash of seeds, a database key).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable 32-byte pool identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(pub [u8; 32]);

impl PoolId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex prefix for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for PoolId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for PoolId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}
