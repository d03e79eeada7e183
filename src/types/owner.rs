use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    types::Address,
};

/// Ownership as known to the client.
///
/// `Unknown` marks a locally synthesized placeholder and serialises as `""`;
/// `Unclaimed` is the ledger's confirmed zero-address answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Owner {
    #[default]
    Unknown,
    Unclaimed,
    Account(Address),
}

impl Owner {
    pub fn from_ledger(address: Address) -> Self {
        if address.is_zero() {
            Self::Unclaimed
        } else {
            Self::Account(address)
        }
    }

    pub fn account(&self) -> Option<&Address> {
        match self {
            Self::Account(address) => Some(address),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Account(_))
    }

    pub fn is(&self, account: &Address) -> bool {
        self.account() == Some(account)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => Ok(()),
            Self::Unclaimed => write!(f, "{}", Address::zero()),
            Self::Account(address) => write!(f, "{address}"),
        }
    }
}

impl TryFrom<String> for Owner {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        if value.is_empty() {
            return Ok(Self::Unknown);
        }
        Ok(Self::from_ledger(Address::parse(&value)?))
    }
}

impl From<Owner> for String {
    fn from(value: Owner) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_address_means_unclaimed() {
        assert_eq!(Owner::from_ledger(Address::zero()), Owner::Unclaimed);
        assert!(!Owner::Unclaimed.is_unknown());
    }

    #[test]
    fn placeholder_serialises_as_empty_string() {
        assert_eq!(serde_json::to_string(&Owner::Unknown).unwrap(), "\"\"");
        let parsed: Owner = serde_json::from_str("\"\"").unwrap();
        assert!(parsed.is_unknown());
    }
}
