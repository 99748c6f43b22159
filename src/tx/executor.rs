//! Single-step executor: build, sign, submit and await one ledger operation

use crate::address::Address;
use crate::chain::{wait_for_acceptance, ChainClass, ChainClients, ExportRequest, Hop, ImportRequest};
use crate::error::{TransferError, TransferResult};
use crate::signer::SigningContext;
use crate::tx::{SignedOperation, UnsignedOperation};

use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Deadlines applied to every network call made for a step
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Bound on building, and separately on submit plus acceptance
    pub api_timeout: Duration,
    pub status_poll: Duration,
}

/// One hop to execute
#[derive(Debug, Clone, PartialEq)]
pub struct StepRequest {
    pub hop: Hop,
    /// Value moved by an export; ignored for imports
    pub amount: u64,
    pub receiver: Address,
}

/// Proof that the ledger durably accepted a step
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Acknowledgement {
    pub chain: ChainClass,
    pub hop: Hop,
    pub tx_id: String,
    #[serde(skip)]
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy)]
enum StepPhase {
    Built,
    Signed,
    Submitted,
    Acknowledged,
}

/// Executes exactly one export or import per call
pub struct StepExecutor {
    clients: ChainClients,
    config: ExecutorConfig,
}

impl StepExecutor {
    pub fn new(clients: ChainClients, config: ExecutorConfig) -> Self {
        Self { clients, config }
    }

    pub async fn execute(
        &self,
        request: &StepRequest,
        signing: &SigningContext,
    ) -> TransferResult<Acknowledgement> {
        let started = Instant::now();
        let chain = request.hop.issuing_chain();

        let unsigned = self.build(request, signing).await?;
        trace_phase(StepPhase::Built, &request.hop, &unsigned.local_id());

        if signing.requires_device_confirmation() {
            info!("*** Please sign '{}' on the ledger device ***", request.hop);
        }
        let signed = signing.sign(&unsigned).await?;
        trace_phase(StepPhase::Signed, &request.hop, &unsigned.local_id());

        let tx_id = self.submit_and_wait(chain, &signed).await?;
        trace_phase(StepPhase::Acknowledged, &request.hop, &tx_id);

        Ok(Acknowledgement {
            chain,
            hop: request.hop,
            tx_id,
            elapsed: started.elapsed(),
        })
    }

    /// Nothing has been submitted yet, so a deadline here is not ambiguous
    async fn build(
        &self,
        request: &StepRequest,
        signing: &SigningContext,
    ) -> TransferResult<UnsignedOperation> {
        let chain = request.hop.issuing_chain();
        let client = self.clients.get(chain);
        let from = signing.addresses();

        let build = async {
            match request.hop {
                Hop::Export { to, .. } => {
                    client
                        .build_export(&ExportRequest {
                            destination: to,
                            amount: request.amount,
                            from,
                            to: request.receiver,
                        })
                        .await
                }
                Hop::Import { from: source, .. } => {
                    client
                        .build_import(&ImportRequest {
                            source,
                            from,
                            to: request.receiver,
                        })
                        .await
                }
            }
        };

        timeout(self.config.api_timeout, build)
            .await
            .map_err(|_| TransferError::NetworkUnreachable {
                chain,
                message: format!("building {} timed out", request.hop),
            })?
    }

    /// Issue the operation and block until the ledger reports a terminal status
    async fn submit_and_wait(
        &self,
        chain: ChainClass,
        signed: &SignedOperation,
    ) -> TransferResult<String> {
        let client = self.clients.get(chain).clone();
        let poll = self.config.status_poll;
        let mut issued: Option<String> = None;

        let result = timeout(self.config.api_timeout, async {
            let tx_id = client.submit(signed).await?;
            trace_phase(StepPhase::Submitted, &signed.unsigned.hop, &tx_id);
            issued = Some(tx_id.clone());
            wait_for_acceptance(client.as_ref(), &tx_id, poll).await?;
            Ok::<_, TransferError>(tx_id)
        })
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "Deadline of {:?} expired waiting on {} (tx {:?})",
                    self.config.api_timeout, chain, issued
                );
                Err(TransferError::TimeoutPendingUnknown {
                    chain,
                    operation: format!("acceptance of {}", signed.unsigned.hop),
                    tx_id: issued.or_else(|| Some(signed.unsigned.local_id())),
                })
            }
        }
    }
}

fn trace_phase(phase: StepPhase, hop: &Hop, id: &str) {
    debug!(phase = ?phase, "{} {}", hop, id);
}
