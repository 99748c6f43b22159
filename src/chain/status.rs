//! Acceptance tracking for submitted operations
//!
//! The two chain classes report status with different vocabularies:
//! - Primary (`platform.getTxStatus`): Committed, Processing, Dropped, Unknown
//! - Secondary (`avm.getTxStatus`): Accepted, Processing, Rejected, Unknown
//!
//! Both are folded into `TxStatus`. Only `Accepted` and `Rejected` are terminal.

use super::{ChainClass, ChainClient};
use crate::error::{TransferError, TransferResult};

use std::time::Duration;
use tracing::{debug, info, warn};

/// Normalised ledger status of a submitted operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Accepted,
    Processing,
    Rejected(String),
    Unknown,
}

impl TxStatus {
    /// Map a raw status string returned by either chain
    pub fn from_raw(status: &str, reason: Option<String>) -> Self {
        match status {
            "Committed" | "Accepted" => TxStatus::Accepted,
            "Processing" => TxStatus::Processing,
            "Dropped" | "Rejected" => {
                TxStatus::Rejected(reason.unwrap_or_else(|| status.to_lowercase()))
            }
            _ => TxStatus::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Accepted | TxStatus::Rejected(_))
    }
}

/// Poll a chain until the operation is accepted or rejected.
///
/// Has no deadline of its own; callers bound it with `tokio::time::timeout`.
/// Only a status verdict is definitive: a failed status query leaves the
/// submitted operation's fate unknown.
pub async fn wait_for_acceptance(
    client: &dyn ChainClient,
    tx_id: &str,
    poll_interval: Duration,
) -> TransferResult<()> {
    let chain: ChainClass = client.class();
    let mut polls = 0u64;

    loop {
        polls += 1;
        let status = client
            .status(tx_id)
            .await
            .map_err(|e| unknown_outcome(chain, tx_id, e))?;
        match status {
            TxStatus::Accepted => {
                info!("Operation {} accepted on {} after {} polls", tx_id, chain, polls);
                return Ok(());
            }
            TxStatus::Rejected(reason) => {
                warn!("Operation {} rejected on {}: {}", tx_id, chain, reason);
                return Err(TransferError::Rejected { chain, reason });
            }
            status => {
                debug!("Operation {} on {} is {:?}", tx_id, chain, status);
            }
        }

        tokio::time::sleep(poll_interval).await;
    }
}

fn unknown_outcome(chain: ChainClass, tx_id: &str, err: TransferError) -> TransferError {
    warn!("Status query for {} on {} failed: {}", tx_id, chain, err);
    TransferError::TimeoutPendingUnknown {
        chain,
        operation: format!("status of submitted operation ({})", err),
        tx_id: Some(tx_id.to_string()),
    }
}
