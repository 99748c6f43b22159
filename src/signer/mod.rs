//! Signing authorities: software keys and hardware devices behind one trait

pub mod ledger;
pub mod soft;

pub use ledger::{DeviceSession, DeviceTransport, HardwareSigner, UnavailableTransport};
pub use soft::{KeyStore, SoftSigner};

use crate::address::Address;
use crate::chain::ChainClass;
use crate::error::{TransferError, TransferResult};
use crate::tx::{SignedOperation, UnsignedOperation};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Where signatures come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerSource {
    Named(String),
    Hardware(u32),
}

/// Operator's raw signer choice, before validation
#[derive(Debug, Clone, Default)]
pub struct SignerSelection {
    pub key_name: Option<String>,
    pub ledger_index: Option<u32>,
}

impl SignerSelection {
    pub fn resolve(&self) -> TransferResult<SignerSource> {
        match (&self.key_name, self.ledger_index) {
            (Some(_), Some(_)) => Err(TransferError::CredentialConflict),
            (Some(name), None) => Ok(SignerSource::Named(name.clone())),
            (None, Some(index)) => Ok(SignerSource::Hardware(index)),
            (None, None) => Err(TransferError::SignerUnavailable(
                "no signer selected: pass a key name or a ledger index".to_string(),
            )),
        }
    }
}

/// Capability to sign operations for a fixed set of addresses
#[async_trait]
pub trait SigningAuthority: Send + Sync {
    fn addresses(&self) -> Vec<Address>;

    /// Signing blocks on a physical confirmation
    fn requires_device_confirmation(&self) -> bool {
        false
    }

    async fn sign(&self, tx: &UnsignedOperation) -> TransferResult<SignedOperation>;
}

/// Open the authority named by `source`
pub async fn open_authority(
    source: &SignerSource,
    key_store: &KeyStore,
    transport: Arc<dyn DeviceTransport>,
    device_timeout: Duration,
) -> TransferResult<Box<dyn SigningAuthority>> {
    match source {
        SignerSource::Named(name) => {
            let signer = key_store.load(name)?;
            info!("Loaded key {} ({})", name, signer.address());
            Ok(Box::new(signer))
        }
        SignerSource::Hardware(index) => {
            info!("Opening hardware signer at index {}", index);
            let signer = HardwareSigner::open(transport, *index, device_timeout).await?;
            Ok(Box::new(signer))
        }
    }
}

/// Signing authority bound to the chains one invocation will touch
pub struct SigningContext {
    authority: Box<dyn SigningAuthority>,
    chains: Vec<ChainClass>,
}

impl SigningContext {
    pub fn new(authority: Box<dyn SigningAuthority>, chains: Vec<ChainClass>) -> Self {
        Self { authority, chains }
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.authority.addresses()
    }

    /// First controlled address; the receiver for ReceiveIn and the sender for SendOut
    pub fn primary_address(&self) -> TransferResult<Address> {
        self.authority
            .addresses()
            .first()
            .copied()
            .ok_or_else(|| TransferError::SignerUnavailable("signer exposes no address".to_string()))
    }

    pub fn requires_device_confirmation(&self) -> bool {
        self.authority.requires_device_confirmation()
    }

    pub async fn sign(&self, tx: &UnsignedOperation) -> TransferResult<SignedOperation> {
        if !self.chains.contains(&tx.chain) {
            return Err(TransferError::SignerUnavailable(format!(
                "signer is not bound to {}",
                tx.chain
            )));
        }
        self.authority.sign(tx).await
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::soft_context;
    use super::*;
    use crate::tx::fixtures::export_op;

    #[test]
    fn test_selection_resolution() {
        let both = SignerSelection {
            key_name: Some("alice".to_string()),
            ledger_index: Some(0),
        };
        assert!(matches!(both.resolve(), Err(TransferError::CredentialConflict)));

        let named = SignerSelection {
            key_name: Some("alice".to_string()),
            ledger_index: None,
        };
        assert_eq!(
            named.resolve().unwrap(),
            SignerSource::Named("alice".to_string())
        );

        let hardware = SignerSelection {
            key_name: None,
            ledger_index: Some(3),
        };
        assert_eq!(hardware.resolve().unwrap(), SignerSource::Hardware(3));

        assert!(matches!(
            SignerSelection::default().resolve(),
            Err(TransferError::SignerUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_context_refuses_unbound_chain() {
        let ctx = soft_context(vec![ChainClass::Secondary]);
        let err = ctx
            .sign(&export_op(ChainClass::Primary, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::SignerUnavailable(_)));

        let signed = ctx.sign(&export_op(ChainClass::Secondary, 1)).await.unwrap();
        assert_eq!(signed.credentials.len(), 1);
        assert_eq!(signed.credentials[0].address, ctx.primary_address().unwrap());
    }
}
