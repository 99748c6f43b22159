//! Error types for the transfer orchestrator

use crate::chain::ChainClass;
use thiserror::Error;

/// Main error type for a transfer invocation
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Sender address {address} is the same as the receiver address")]
    SelfTransfer { address: String },

    #[error("Only one of a key name or a ledger index may be given")]
    CredentialConflict,

    #[error("Signer unavailable: {0}")]
    SignerUnavailable(String),

    #[error("Operation rejected by {chain}: {reason}")]
    Rejected { chain: ChainClass, reason: String },

    #[error("Timeout waiting for {operation} on {chain}{}", tx_suffix(.tx_id))]
    TimeoutPendingUnknown {
        chain: ChainClass,
        operation: String,
        tx_id: Option<String>,
    },

    #[error("{chain} unreachable: {message}")]
    NetworkUnreachable { chain: ChainClass, message: String },

    #[error("Step cursor {cursor} is out of range (max {max})")]
    InvalidCursor { cursor: u64, max: u64 },

    #[error("Invalid address {input}: {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

fn tx_suffix(tx_id: &Option<String>) -> String {
    match tx_id {
        Some(id) => format!(" (tx {})", id),
        None => String::new(),
    }
}

impl TransferError {
    /// Errors raised before any network call is made
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TransferError::InvalidAmount(_)
                | TransferError::SelfTransfer { .. }
                | TransferError::CredentialConflict
                | TransferError::InvalidCursor { .. }
                | TransferError::InvalidAddress { .. }
        )
    }

    /// The operation may or may not have been accepted by the ledger
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            TransferError::TimeoutPendingUnknown { .. } | TransferError::NetworkUnreachable { .. }
        )
    }

    /// Resuming from the same cursor cannot double-apply the step
    pub fn is_retry_safe(&self) -> bool {
        matches!(self, TransferError::Rejected { .. })
    }
}

/// Result type for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let rejected = TransferError::Rejected {
            chain: ChainClass::Primary,
            reason: "insufficient funds".to_string(),
        };
        assert!(rejected.is_retry_safe());
        assert!(!rejected.is_ambiguous());

        let timeout = TransferError::TimeoutPendingUnknown {
            chain: ChainClass::Secondary,
            operation: "acceptance".to_string(),
            tx_id: Some("0xabc".to_string()),
        };
        assert!(timeout.is_ambiguous());
        assert!(!timeout.is_retry_safe());
        assert_eq!(
            timeout.to_string(),
            "Timeout waiting for acceptance on X-Chain (tx 0xabc)"
        );

        assert!(TransferError::CredentialConflict.is_validation());
    }
}
