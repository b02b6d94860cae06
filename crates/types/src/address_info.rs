use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether an address is an externally-owned account or a contract, and if
/// a contract, the block it was created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    /// True if the address has code.
    pub is_contract: bool,
    /// Set if and only if `is_contract` is true.
    pub creation_block: Option<u64>,
    /// When this row was last written.
    pub updated_at: DateTime<Utc>,
}

impl AddressInfo {
    /// An externally-owned account record.
    pub const fn eoa(updated_at: DateTime<Utc>) -> Self {
        Self { is_contract: false, creation_block: None, updated_at }
    }

    /// A contract record with a known creation block.
    pub const fn contract(creation_block: u64, updated_at: DateTime<Utc>) -> Self {
        Self { is_contract: true, creation_block: Some(creation_block), updated_at }
    }

    /// The block a scan should start from for this address: the creation
    /// block if this is a contract with one known, otherwise genesis.
    pub const fn starting_block(&self) -> u64 {
        match self.creation_block {
            Some(b) if self.is_contract => b,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eoa_starts_from_genesis() {
        let info = AddressInfo::eoa(Utc::now());
        assert_eq!(info.starting_block(), 0);
    }

    #[test]
    fn contract_starts_from_creation_block() {
        let info = AddressInfo::contract(12_345, Utc::now());
        assert_eq!(info.starting_block(), 12_345);
    }
}
