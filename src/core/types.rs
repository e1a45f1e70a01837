// Basic value types for the ledger

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 256-bit digest (32 bytes)
/// Used for block hashes and transaction IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Create a new Hash256 from a byte array
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a Hash256 from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, String> {
        if slice.len() != 32 {
            return Err(format!("Invalid hash length: expected 32, got {}", slice.len()));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Get the hash as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Zero hash, the genesis block's previous hash
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Lowercase hex in digest byte order
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-char hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, String> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| format!("Invalid hex string: {}", e))?;
        Self::from_slice(&bytes)
    }

    /// Whether the hex rendering starts with `difficulty` '0' characters
    pub fn has_leading_zeros(&self, difficulty: usize) -> bool {
        // Two hex chars per byte: check whole zero bytes, then one high nibble.
        let full_bytes = difficulty / 2;
        if full_bytes > self.0.len() || (full_bytes == self.0.len() && difficulty % 2 == 1) {
            return false;
        }
        if self.0[..full_bytes].iter().any(|b| *b != 0) {
            return false;
        }
        difficulty % 2 == 0 || self.0[full_bytes] >> 4 == 0
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash256::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Account name that can receive and spend outputs
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(pub String);

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Account {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Account {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Error parsing a decimal amount
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("empty amount")]
    Empty,
    #[error("invalid amount '{0}'")]
    Invalid(String),
    #[error("amount '{0}' has more than {max} decimal places", max = Amount::DECIMALS)]
    TooPrecise(String),
    #[error("amount '{0}' is too large")]
    Overflow(String),
}

/// Non-negative decimal value with 8 fixed decimal places.
///
/// Stored as integer base units so sums and comparisons are exact. Rendered
/// and parsed as a plain decimal string (`"300"`, `"12.5"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    pub const DECIMALS: u32 = 8;
    /// Base units per whole coin
    pub const UNIT: u64 = 100_000_000;
    pub const ZERO: Amount = Amount(0);

    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    /// Whole coins; saturates at the maximum representable amount
    pub const fn from_whole(coins: u64) -> Self {
        Self(coins.saturating_mul(Self::UNIT))
    }

    pub const fn units(&self) -> u64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// Sum a sequence of amounts, `None` on overflow
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Option<Amount> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |acc, a| acc.checked_add(a))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let whole = self.0 / Self::UNIT;
        let frac = self.0 % Self::UNIT;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:08}", frac);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountParseError::Empty);
        }

        let (whole_str, frac_str) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole_str.is_empty() && frac_str.is_empty())
            || !all_digits(whole_str)
            || !all_digits(frac_str)
        {
            return Err(AmountParseError::Invalid(s.to_string()));
        }
        if frac_str.len() > Self::DECIMALS as usize {
            return Err(AmountParseError::TooPrecise(s.to_string()));
        }

        let overflow = || AmountParseError::Overflow(s.to_string());
        let whole: u64 = if whole_str.is_empty() {
            0
        } else {
            whole_str.parse().map_err(|_| overflow())?
        };
        let frac: u64 = if frac_str.is_empty() {
            0
        } else {
            let padded = format!("{:0<8}", frac_str);
            padded.parse().map_err(|_| AmountParseError::Invalid(s.to_string()))?
        };

        whole
            .checked_mul(Self::UNIT)
            .and_then(|units| units.checked_add(frac))
            .map(Amount)
            .ok_or_else(overflow)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
