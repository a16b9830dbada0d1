//! Type-safe opaque identifiers.
//!
//! [`Address`] is a 20-byte identity used for principals, pool endpoints,
//! collections and value destinations. [`CollectionId`] and
//! [`PoolEndpointId`] wrap it so the two directory key spaces cannot be
//! confused with each other or with a plain principal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length in bytes of an [`Address`].
pub const ADDRESS_LEN: usize = 20;

/// Error returned when parsing an address string fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    /// The string is not valid hexadecimal.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    /// The decoded byte length is not [`ADDRESS_LEN`].
    #[error("expected {ADDRESS_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Opaque 20-byte identity.
///
/// The all-zero value is the reserved "no value" sentinel: a renounced
/// principal, an unmapped directory slot, or an invalid argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The zero sentinel.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    /// Creates an `Address` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Builds an address whose last byte is `n`. Handy for fixtures and
    /// well-known development identities.
    #[must_use]
    pub fn from_low_byte(n: u8) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        if let Some(last) = bytes.last_mut() {
            *last = n;
        }
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Returns `true` for the zero sentinel.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        let array: [u8; ADDRESS_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressParseError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of a logical asset collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(Address);

impl CollectionId {
    /// The zero sentinel.
    pub const ZERO: Self = Self(Address::ZERO);

    /// Wraps an [`Address`].
    #[must_use]
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    /// Returns the inner [`Address`].
    #[must_use]
    pub const fn address(&self) -> Address {
        self.0
    }

    /// Returns `true` for the zero sentinel.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CollectionId {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<Address> for CollectionId {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

/// Identifier of a deployed pool endpoint component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolEndpointId(Address);

impl PoolEndpointId {
    /// The zero sentinel.
    pub const ZERO: Self = Self(Address::ZERO);

    /// Wraps an [`Address`].
    #[must_use]
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    /// Returns the inner [`Address`].
    #[must_use]
    pub const fn address(&self) -> Address {
        self.0
    }

    /// Returns `true` for the zero sentinel.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for PoolEndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PoolEndpointId {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<Address> for PoolEndpointId {
    fn from(address: Address) -> Self {
        Self(address)
    }
}
