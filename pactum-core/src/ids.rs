//! Identifiers for escrow parties and accounts

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Longest identity accepted at the boundary
pub const MAX_PARTY_ID_LEN: usize = 128;

/// An already-authenticated party identity (typically a wallet address).
///
/// Identities are compared case-insensitively: parsing trims surrounding
/// whitespace and folds ASCII to lowercase, so `0xAbC` and `0xabc` name the
/// same party.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartyId(String);

impl PartyId {
    /// Parse and normalize an identity
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(CoreError::invalid_identity("identity cannot be empty"));
        }

        if trimmed.len() > MAX_PARTY_ID_LEN {
            return Err(CoreError::invalid_identity(format!(
                "identity exceeds {} characters",
                MAX_PARTY_ID_LEN
            )));
        }

        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(CoreError::invalid_identity(
                "identity cannot contain whitespace or control characters",
            ));
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PartyId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PartyId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PartyId> for String {
    fn from(id: PartyId) -> Self {
        id.0
    }
}

/// Identifier minted for each escrow account at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Mint a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AccountId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AccountId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}
