//! Credit ledger entry types.

use serde::{Deserialize, Serialize};

/// Direction of a credit ledger entry.
///
/// Entries are append-only. Amounts are stored signed (`Subtract` entries
/// carry a negative amount), so a customer's balance is always the plain sum
/// of their entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryType {
    Add,
    Subtract,
}

impl LedgerEntryType {
    /// Parse an entry type from its stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(Self::Add),
            "subtract" => Some(Self::Subtract),
            _ => None,
        }
    }

    /// The string form stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_as_str_roundtrip() {
        for entry_type in [LedgerEntryType::Add, LedgerEntryType::Subtract] {
            assert_eq!(LedgerEntryType::parse(entry_type.as_str()), Some(entry_type));
        }
    }

    #[test]
    fn parse_unknown_returns_none() {
        assert_eq!(LedgerEntryType::parse("transfer"), None);
    }
}
