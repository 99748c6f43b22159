//! Ledger operations, fee schedule and the single-step executor

mod executor;
pub mod fee;

pub use executor::{Acknowledgement, ExecutorConfig, StepExecutor, StepRequest};
pub use fee::FeeSchedule;

use crate::address::Address;
use crate::chain::{ChainClass, Hop};

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// Operation envelope before signing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedOperation {
    pub network_id: u32,
    pub chain: ChainClass,
    pub hop: Hop,
    /// Ids of the UTXOs consumed
    pub inputs: Vec<String>,
    /// Exported value; zero for imports, which sweep every importable input
    pub amount: u64,
    pub owner: Address,
    pub fee: u64,
}

impl UnsignedOperation {
    /// Keccak-256 over the canonical JSON encoding
    pub fn digest(&self) -> [u8; 32] {
        // Serialising a struct of plain fields cannot fail
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        Keccak256::digest(&encoded).into()
    }

    /// Local identifier used in logs before the ledger assigns one
    pub fn local_id(&self) -> String {
        format!("0x{}", hex::encode(self.digest()))
    }
}

/// One signature over an operation digest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub address: Address,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedOperation {
    pub unsigned: UnsignedOperation,
    pub credentials: Vec<Credential>,
}

impl SignedOperation {
    /// Hex wire form handed to `issueTx`
    pub fn encode(&self) -> String {
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        format!("0x{}", hex::encode(encoded))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn export_op(chain: ChainClass, amount: u64) -> UnsignedOperation {
        UnsignedOperation {
            network_id: 12345,
            chain,
            hop: Hop::Export {
                from: chain,
                to: match chain {
                    ChainClass::Primary => ChainClass::Secondary,
                    ChainClass::Secondary => ChainClass::Primary,
                },
            },
            inputs: vec!["utxo-1".to_string()],
            amount,
            owner: Address::from_bytes([7u8; 20]),
            fee: 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::export_op;
    use super::*;

    #[test]
    fn test_digest_tracks_content() {
        let a = export_op(ChainClass::Primary, 10);
        let b = export_op(ChainClass::Primary, 11);
        assert_eq!(a.digest(), a.clone().digest());
        assert_ne!(a.digest(), b.digest());
        assert!(a.local_id().starts_with("0x"));
        assert_eq!(a.local_id().len(), 66);
    }
}
