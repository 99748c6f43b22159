//! Hardware signing devices
//!
//! Device I/O is blocking and may wait indefinitely for the operator to press a
//! button, so every call runs on the blocking pool under an explicit deadline.
//! The transport itself (USB/HID framing) lives behind `DeviceTransport`.

use super::SigningAuthority;
use crate::address::Address;
use crate::error::{TransferError, TransferResult};
use crate::tx::{Credential, SignedOperation, UnsignedOperation};

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// An open connection to one device account
pub trait DeviceSession: Send {
    fn address(&self) -> Address;

    /// Blocks until the operator approves or rejects on the device
    fn sign_digest(&mut self, digest: [u8; 32]) -> Result<Vec<u8>, String>;
}

/// Opens device sessions by account index
#[cfg_attr(test, mockall::automock)]
pub trait DeviceTransport: Send + Sync + 'static {
    fn open(&self, index: u32) -> Result<Box<dyn DeviceSession>, String>;
}

/// Transport used when the build carries no device driver
pub struct UnavailableTransport;

impl DeviceTransport for UnavailableTransport {
    fn open(&self, index: u32) -> Result<Box<dyn DeviceSession>, String> {
        Err(format!(
            "no hardware device transport available to open index {}",
            index
        ))
    }
}

/// Signer that forwards digests to a hardware device
pub struct HardwareSigner {
    index: u32,
    address: Address,
    session: Arc<Mutex<Box<dyn DeviceSession>>>,
    timeout: Duration,
}

impl HardwareSigner {
    /// Open the device account at `index`, giving up after `deadline`
    pub async fn open(
        transport: Arc<dyn DeviceTransport>,
        index: u32,
        deadline: Duration,
    ) -> TransferResult<Self> {
        let opened = timeout(
            deadline,
            tokio::task::spawn_blocking(move || transport.open(index)),
        )
        .await;

        let session = match opened {
            Ok(Ok(Ok(session))) => session,
            Ok(Ok(Err(e))) => return Err(TransferError::SignerUnavailable(e)),
            Ok(Err(join)) => {
                return Err(TransferError::SignerUnavailable(format!(
                    "device task failed: {}",
                    join
                )))
            }
            Err(_) => {
                warn!("Timed out opening hardware signer at index {}", index);
                return Err(TransferError::SignerUnavailable(format!(
                    "timed out after {:?} opening device index {}",
                    deadline, index
                )));
            }
        };

        let address = session.address();
        info!("Hardware signer index {} controls {}", index, address);

        Ok(Self {
            index,
            address,
            session: Arc::new(Mutex::new(session)),
            timeout: deadline,
        })
    }
}

#[async_trait]
impl SigningAuthority for HardwareSigner {
    fn addresses(&self) -> Vec<Address> {
        vec![self.address]
    }

    fn requires_device_confirmation(&self) -> bool {
        true
    }

    async fn sign(&self, tx: &UnsignedOperation) -> TransferResult<SignedOperation> {
        let digest = tx.digest();
        let session = self.session.clone();

        let signed = timeout(
            self.timeout,
            tokio::task::spawn_blocking(move || {
                let mut guard = session
                    .lock()
                    .map_err(|_| "device session poisoned".to_string())?;
                guard.sign_digest(digest)
            }),
        )
        .await;

        let signature = match signed {
            Ok(Ok(Ok(signature))) => signature,
            Ok(Ok(Err(e))) => return Err(TransferError::SignerUnavailable(e)),
            Ok(Err(join)) => {
                return Err(TransferError::SignerUnavailable(format!(
                    "device task failed: {}",
                    join
                )))
            }
            Err(_) => {
                return Err(TransferError::SignerUnavailable(format!(
                    "no confirmation on device index {} within {:?}",
                    self.index, self.timeout
                )))
            }
        };

        Ok(SignedOperation {
            unsigned: tx.clone(),
            credentials: vec![Credential {
                address: self.address,
                signature: format!("0x{}", hex::encode(signature)),
            }],
        })
    }
}
