//! Short (20-byte) ledger addresses with chain-prefixed text form

use crate::chain::ChainClass;
use crate::error::{TransferError, TransferResult};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 20-byte account address shared by both chain classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(#[serde(with = "hex_bytes")] [u8; 20]);

impl Address {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Render with the chain alias prefix, e.g. `P-0x...`
    pub fn on_chain(&self, chain: ChainClass) -> String {
        format!("{}-{}", chain.alias(), self)
    }
}

impl From<ethers::types::Address> for Address {
    fn from(addr: ethers::types::Address) -> Self {
        Self(addr.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = TransferError;

    /// Accepts `0x<40 hex>` optionally prefixed by a chain alias (`P-` or `X-`)
    fn from_str(s: &str) -> TransferResult<Self> {
        let invalid = |reason: &str| TransferError::InvalidAddress {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let body = match s.split_once('-') {
            Some((alias, rest)) => {
                if ChainClass::from_alias(alias).is_none() {
                    return Err(invalid("unknown chain alias"));
                }
                rest
            }
            None => s,
        };

        let hex_part = body.strip_prefix("0x").unwrap_or(body);
        let bytes = hex::decode(hex_part).map_err(|e| invalid(&e.to_string()))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| invalid("expected 20 bytes"))?;

        Ok(Self(bytes))
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 20], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 20], D::Error> {
        let s = String::deserialize(d)?;
        let raw = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        raw.try_into()
            .map_err(|_| serde::de::Error::custom("expected 20 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefixed_and_bare() {
        let bare: Address = "0x00112233445566778899aabbccddeeff00112233".parse().unwrap();
        let prefixed: Address = "P-0x00112233445566778899aabbccddeeff00112233"
            .parse()
            .unwrap();
        assert_eq!(bare, prefixed);
        assert_eq!(
            bare.on_chain(ChainClass::Secondary),
            "X-0x00112233445566778899aabbccddeeff00112233"
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("C-0x00112233445566778899aabbccddeeff00112233"
            .parse::<Address>()
            .is_err());
        assert!("0x0011".parse::<Address>().is_err());
        assert!("P-not-hex".parse::<Address>().is_err());
    }
}
