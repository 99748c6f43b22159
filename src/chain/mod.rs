//! Chain module - chain classes, endpoints and the client seam
//!
//! This module provides:
//! - The closed set of chain classes a transfer can touch
//! - Endpoint resolution for a selected network
//! - The `ChainClient` trait the step executor drives
//! - A per-invocation pair of clients, one per chain class

pub mod rpc;
pub mod status;

pub use rpc::RpcChainClient;
pub use status::{wait_for_acceptance, TxStatus};

use crate::address::Address;
use crate::error::{TransferError, TransferResult};
use crate::tx::{SignedOperation, UnsignedOperation};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Logical ledger partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainClass {
    /// Validator-set chain (P)
    Primary,
    /// Asset-transfer chain (X), also the intermediate for primary-bound value
    Secondary,
}

impl ChainClass {
    pub fn alias(&self) -> &'static str {
        match self {
            ChainClass::Primary => "P",
            ChainClass::Secondary => "X",
        }
    }

    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias {
            "P" => Some(ChainClass::Primary),
            "X" => Some(ChainClass::Secondary),
            _ => None,
        }
    }

    /// JSON-RPC namespace served by this chain
    pub fn rpc_namespace(&self) -> &'static str {
        match self {
            ChainClass::Primary => "platform",
            ChainClass::Secondary => "avm",
        }
    }
}

impl fmt::Display for ChainClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Chain", self.alias())
    }
}

/// One export or import against a single chain class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Hop {
    Export { from: ChainClass, to: ChainClass },
    Import { into: ChainClass, from: ChainClass },
}

impl Hop {
    /// Chain whose endpoint receives the submission
    pub fn issuing_chain(&self) -> ChainClass {
        match *self {
            Hop::Export { from, .. } => from,
            Hop::Import { into, .. } => into,
        }
    }

    pub fn is_export(&self) -> bool {
        matches!(self, Hop::Export { .. })
    }
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hop::Export { from, to } => write!(f, "ExportTx {} -> {}", from.alias(), to.alias()),
            Hop::Import { into, from } => {
                write!(f, "ImportTx {} -> {}", from.alias(), into.alias())
            }
        }
    }
}

/// Address of a single chain's API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEndpoint {
    pub class: ChainClass,
    pub url: String,
}

impl ChainEndpoint {
    pub fn new(base: &str, class: ChainClass) -> Self {
        Self {
            class,
            url: format!("{}/ext/bc/{}", base.trim_end_matches('/'), class.alias()),
        }
    }
}

/// Network selected by the operator, resolved once per invocation
#[derive(Debug, Clone)]
pub struct Network {
    pub name: String,
    pub network_id: u32,
    pub endpoint: String,
    /// Genesis fee charged per export or import
    pub tx_fee: u64,
}

impl Network {
    pub fn endpoint_for(&self, class: ChainClass) -> ChainEndpoint {
        ChainEndpoint::new(&self.endpoint, class)
    }
}

/// Parameters for building an export on the client's chain
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub destination: ChainClass,
    pub amount: u64,
    pub from: Vec<Address>,
    pub to: Address,
}

/// Parameters for building an import on the client's chain
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRequest {
    pub source: ChainClass,
    pub from: Vec<Address>,
    pub to: Address,
}

/// Client for exactly one chain class
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn class(&self) -> ChainClass;

    async fn build_export(&self, request: &ExportRequest) -> TransferResult<UnsignedOperation>;

    async fn build_import(&self, request: &ImportRequest) -> TransferResult<UnsignedOperation>;

    /// Issue a signed operation, returning the ledger's transaction id
    async fn submit(&self, tx: &SignedOperation) -> TransferResult<String>;

    async fn status(&self, tx_id: &str) -> TransferResult<TxStatus>;
}

/// Clients for both chain classes of one network
#[derive(Clone)]
pub struct ChainClients {
    primary: Arc<dyn ChainClient>,
    secondary: Arc<dyn ChainClient>,
}

impl ChainClients {
    pub fn new(primary: Arc<dyn ChainClient>, secondary: Arc<dyn ChainClient>) -> Self {
        Self { primary, secondary }
    }

    /// Build JSON-RPC clients for both chains of a network
    pub fn connect(network: &Network) -> TransferResult<Self> {
        let primary = RpcChainClient::new(network, ChainClass::Primary)?;
        let secondary = RpcChainClient::new(network, ChainClass::Secondary)?;
        debug!(
            "Chain clients ready for {} ({})",
            network.name, network.endpoint
        );
        Ok(Self::new(Arc::new(primary), Arc::new(secondary)))
    }

    pub fn get(&self, class: ChainClass) -> &Arc<dyn ChainClient> {
        match class {
            ChainClass::Primary => &self.primary,
            ChainClass::Secondary => &self.secondary,
        }
    }
}

/// Reject a network entry that cannot produce usable endpoints
pub fn validate_endpoint(endpoint: &str) -> TransferResult<()> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(())
    } else {
        Err(TransferError::Config(format!(
            "endpoint {} must start with http:// or https://",
            endpoint
        )))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn idle_client(class: ChainClass) -> MockChainClient {
        let mut client = MockChainClient::new();
        client.expect_class().return_const(class);
        client
    }

    fn expect_builds(client: &mut MockChainClient, class: ChainClass, exports: usize, imports: usize) {
        client
            .expect_build_export()
            .times(exports)
            .returning(move |req| {
                Ok(UnsignedOperation {
                    network_id: 1,
                    chain: class,
                    hop: Hop::Export {
                        from: class,
                        to: req.destination,
                    },
                    inputs: vec!["utxo".to_string()],
                    amount: req.amount,
                    owner: req.to,
                    fee: 1,
                })
            });
        client
            .expect_build_import()
            .times(imports)
            .returning(move |req| {
                Ok(UnsignedOperation {
                    network_id: 1,
                    chain: class,
                    hop: Hop::Import {
                        into: class,
                        from: req.source,
                    },
                    inputs: vec!["atomic".to_string()],
                    amount: 0,
                    owner: req.to,
                    fee: 1,
                })
            });
    }

    /// Client expecting exactly `exports` export builds and `imports` import
    /// builds, answering every status query with `status`
    pub fn scripted_client(
        class: ChainClass,
        exports: usize,
        imports: usize,
        status: TxStatus,
    ) -> MockChainClient {
        let mut client = idle_client(class);
        expect_builds(&mut client, class, exports, imports);
        client
            .expect_submit()
            .returning(|tx| Ok(tx.unsigned.local_id()));
        client
            .expect_status()
            .returning(move |_| Ok(status.clone()));
        client
    }

    /// Client whose single submission fails with `failure`; status is never queried
    pub fn failing_submit_client(
        class: ChainClass,
        exports: usize,
        imports: usize,
        failure: fn(ChainClass) -> TransferError,
    ) -> MockChainClient {
        let mut client = idle_client(class);
        expect_builds(&mut client, class, exports, imports);
        client
            .expect_submit()
            .times(1)
            .returning(move |_| Err(failure(class)));
        client.expect_status().never();
        client
    }

    pub fn unreachable(chain: ChainClass) -> TransferError {
        TransferError::NetworkUnreachable {
            chain,
            message: "connection reset by peer".to_string(),
        }
    }

    pub fn issue_refused(chain: ChainClass) -> TransferError {
        TransferError::Rejected {
            chain,
            reason: "issueTx: insufficient funds".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let network = Network {
            name: "local".to_string(),
            network_id: 12345,
            endpoint: "http://127.0.0.1:9650/".to_string(),
            tx_fee: 1_000_000,
        };
        assert_eq!(
            network.endpoint_for(ChainClass::Primary).url,
            "http://127.0.0.1:9650/ext/bc/P"
        );
        assert_eq!(
            network.endpoint_for(ChainClass::Secondary).url,
            "http://127.0.0.1:9650/ext/bc/X"
        );
    }

    #[test]
    fn test_hop_issuing_chain() {
        let export = Hop::Export {
            from: ChainClass::Secondary,
            to: ChainClass::Primary,
        };
        let import = Hop::Import {
            into: ChainClass::Primary,
            from: ChainClass::Secondary,
        };
        assert_eq!(export.issuing_chain(), ChainClass::Secondary);
        assert_eq!(import.issuing_chain(), ChainClass::Primary);
        assert_eq!(import.to_string(), "ImportTx X -> P");
    }

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint("https://api.example.org").is_ok());
        assert!(validate_endpoint("api.example.org").is_err());
    }
}
