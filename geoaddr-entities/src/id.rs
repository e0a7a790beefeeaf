use std::{fmt, str::FromStr};

use uuid::Uuid;

/// Surrogate identifier of an address record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressId(Uuid);

impl AddressId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AddressId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AddressId {
    fn from(from: Uuid) -> Self {
        Self(from)
    }
}

impl From<AddressId> for Uuid {
    fn from(from: AddressId) -> Self {
        from.0
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid address id")]
pub struct AddressIdParseError;

impl FromStr for AddressId {
    type Err = AddressIdParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| AddressIdParseError)
    }
}

impl fmt::Display for AddressId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.as_simple())
    }
}
