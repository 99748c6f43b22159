//! Software keys loaded from the key store directory

use super::SigningAuthority;
use crate::address::Address;
use crate::error::{TransferError, TransferResult};
use crate::tx::{Credential, SignedOperation, UnsignedOperation};

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::H256;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of stored private key files
const KEY_EXTENSION: &str = "pk";

/// Directory of hex-encoded secp256k1 private keys, one per file
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn key_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, KEY_EXTENSION))
    }

    pub fn load(&self, name: &str) -> TransferResult<SoftSigner> {
        let path = self.key_path(name);
        debug!("Loading key {} from {:?}", name, path);
        SoftSigner::from_file(&path)
    }
}

/// Signer backed by key material held in memory
pub struct SoftSigner {
    wallet: LocalWallet,
}

impl SoftSigner {
    pub fn from_hex(key: &str) -> TransferResult<Self> {
        let wallet = key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| TransferError::SignerUnavailable(format!("Invalid private key: {}", e)))?;
        Ok(Self { wallet })
    }

    pub fn from_file(path: &Path) -> TransferResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TransferError::SignerUnavailable(format!("Failed to read key file {:?}: {}", path, e))
        })?;
        Self::from_hex(&contents)
    }

    pub fn address(&self) -> Address {
        self.wallet.address().into()
    }
}

#[async_trait]
impl SigningAuthority for SoftSigner {
    fn addresses(&self) -> Vec<Address> {
        vec![self.address()]
    }

    async fn sign(&self, tx: &UnsignedOperation) -> TransferResult<SignedOperation> {
        let signature = self
            .wallet
            .sign_hash(H256::from(tx.digest()))
            .map_err(|e| TransferError::SignerUnavailable(format!("Signing failed: {}", e)))?;

        Ok(SignedOperation {
            unsigned: tx.clone(),
            credentials: vec![Credential {
                address: self.address(),
                signature: format!("0x{}", hex::encode(signature.to_vec())),
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainClass;
    use crate::signer::fixtures::TEST_KEY;
    use crate::tx::fixtures::export_op;

    #[test]
    fn test_key_store_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("alice.pk"), format!("0x{}\n", TEST_KEY)).unwrap();

        let store = KeyStore::new(dir.path());
        let signer = store.load("alice").unwrap();
        assert_eq!(
            signer.address(),
            SoftSigner::from_hex(TEST_KEY).unwrap().address()
        );
    }

    #[test]
    fn test_missing_or_malformed_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.pk"), "not a key").unwrap();

        let store = KeyStore::new(dir.path());
        assert!(matches!(
            store.load("nobody"),
            Err(TransferError::SignerUnavailable(_))
        ));
        assert!(matches!(
            store.load("bad"),
            Err(TransferError::SignerUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_signature_is_deterministic() {
        let signer = SoftSigner::from_hex(TEST_KEY).unwrap();
        let op = export_op(ChainClass::Primary, 42);

        let first = signer.sign(&op).await.unwrap();
        let second = signer.sign(&op).await.unwrap();
        assert_eq!(first, second);
        // r || s || v
        assert_eq!(first.credentials[0].signature.len(), 2 + 65 * 2);
    }
}
