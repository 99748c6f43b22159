//! JSON-RPC chain client for the primary (`platform.*`) and secondary (`avm.*`) chains

use super::{ChainClass, ChainClient, ChainEndpoint, ExportRequest, Hop, ImportRequest, Network, TxStatus};
use crate::address::Address;
use crate::error::{TransferError, TransferResult};
use crate::tx::{SignedOperation, UnsignedOperation};

use async_trait::async_trait;
use ethers::providers::{Http, Provider, ProviderError, RpcError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on UTXOs fetched per build
const UTXO_LIMIT: u32 = 1024;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetUtxosParams {
    addresses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_chain: Option<String>,
    limit: u32,
    encoding: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetUtxosReply {
    #[serde(default)]
    utxos: Vec<String>,
}

#[derive(Debug, Serialize)]
struct IssueTxParams {
    tx: String,
    encoding: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct IssueTxReply {
    #[serde(rename = "txID")]
    tx_id: String,
}

#[derive(Debug, Serialize)]
struct TxStatusParams {
    #[serde(rename = "txID")]
    tx_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct TxStatusReply {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Client for one chain of a network
pub struct RpcChainClient {
    endpoint: ChainEndpoint,
    network_id: u32,
    tx_fee: u64,
    provider: Provider<Http>,
}

impl RpcChainClient {
    pub fn new(network: &Network, class: ChainClass) -> TransferResult<Self> {
        let endpoint = network.endpoint_for(class);
        let provider = Provider::<Http>::try_from(endpoint.url.as_str())
            .map_err(|e| TransferError::Config(format!("Invalid endpoint {}: {}", endpoint.url, e)))?
            .interval(Duration::from_millis(100));

        debug!("Added RPC client for {}: {}", class, endpoint.url);

        Ok(Self {
            endpoint,
            network_id: network.network_id,
            tx_fee: network.tx_fee,
            provider,
        })
    }

    fn method(&self, name: &str) -> String {
        format!("{}.{}", self.endpoint.class.rpc_namespace(), name)
    }

    async fn call<P, R>(&self, name: &str, params: P) -> TransferResult<R>
    where
        P: std::fmt::Debug + Serialize + Send + Sync,
        R: std::fmt::Debug + Serialize + serde::de::DeserializeOwned + Send,
    {
        let method = self.method(name);
        self.provider
            .request(&method, params)
            .await
            .map_err(|e| map_provider_error(self.endpoint.class, &method, e))
    }

    async fn fetch_utxos(
        &self,
        addresses: &[Address],
        source: Option<ChainClass>,
    ) -> TransferResult<Vec<String>> {
        let chain = self.endpoint.class;
        let reply: GetUtxosReply = self
            .call(
                "getUTXOs",
                GetUtxosParams {
                    addresses: addresses.iter().map(|a| a.on_chain(chain)).collect(),
                    source_chain: source.map(|s| s.alias().to_string()),
                    limit: UTXO_LIMIT,
                    encoding: "hex",
                },
            )
            .await?;
        Ok(reply.utxos)
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn class(&self) -> ChainClass {
        self.endpoint.class
    }

    async fn build_export(&self, request: &ExportRequest) -> TransferResult<UnsignedOperation> {
        let chain = self.endpoint.class;
        let inputs = self.fetch_utxos(&request.from, None).await?;
        if inputs.is_empty() {
            return Err(TransferError::Rejected {
                chain,
                reason: "no spendable funds for export".to_string(),
            });
        }

        Ok(UnsignedOperation {
            network_id: self.network_id,
            chain,
            hop: Hop::Export {
                from: chain,
                to: request.destination,
            },
            inputs,
            amount: request.amount,
            owner: request.to,
            fee: self.tx_fee,
        })
    }

    async fn build_import(&self, request: &ImportRequest) -> TransferResult<UnsignedOperation> {
        let chain = self.endpoint.class;
        let inputs = self.fetch_utxos(&[request.to], Some(request.source)).await?;
        if inputs.is_empty() {
            return Err(TransferError::Rejected {
                chain,
                reason: format!("no funds to import from {}", request.source),
            });
        }

        Ok(UnsignedOperation {
            network_id: self.network_id,
            chain,
            hop: Hop::Import {
                into: chain,
                from: request.source,
            },
            inputs,
            amount: 0,
            owner: request.to,
            fee: self.tx_fee,
        })
    }

    async fn submit(&self, tx: &SignedOperation) -> TransferResult<String> {
        let reply: IssueTxReply = self
            .call(
                "issueTx",
                IssueTxParams {
                    tx: tx.encode(),
                    encoding: "hex",
                },
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn status(&self, tx_id: &str) -> TransferResult<TxStatus> {
        let reply: TxStatusReply = self
            .call(
                "getTxStatus",
                TxStatusParams {
                    tx_id: tx_id.to_string(),
                },
            )
            .await
            .map_err(query_failure)?;
        Ok(TxStatus::from_raw(&reply.status, reply.reason))
    }
}

/// An error response from the node is a definitive verdict; anything else
/// means the request may not have reached it.
fn map_provider_error(chain: ChainClass, method: &str, err: ProviderError) -> TransferError {
    match err.as_error_response() {
        Some(response) => TransferError::Rejected {
            chain,
            reason: format!("{}: {}", method, response.message),
        },
        None => {
            warn!("{} call {} failed: {}", chain, method, err);
            TransferError::NetworkUnreachable {
                chain,
                message: err.to_string(),
            }
        }
    }
}

/// A status query the node refuses says nothing about the operation itself
fn query_failure(err: TransferError) -> TransferError {
    match err {
        TransferError::Rejected { chain, reason } => TransferError::NetworkUnreachable {
            chain,
            message: reason,
        },
        other => other,
    }
}
