//! Transfer state machine: sequences hops from an operator-supplied cursor

use super::report::{Outcome, TransferReport, TransferSummary};
use super::{StepCursor, TransferIntent};
use crate::error::{TransferError, TransferResult};
use crate::prompt::Confirmation;
use crate::signer::SigningContext;
use crate::tx::{fee, Acknowledgement, FeeSchedule, StepExecutor, StepRequest};

use chrono::Utc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Per-invocation switches, passed in rather than read from globals
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Skip the confirmation gate
    pub force: bool,
    /// Wait between consecutive hops so atomic outputs become visible
    pub step_pause: Duration,
}

#[derive(Debug)]
pub enum MachineState {
    Idle(StepCursor),
    StepInFlight(StepCursor),
    StepComplete(StepCursor),
    Settled,
    Aborted,
    Failed(StepCursor, TransferError),
}

/// Drives one transfer intent to a terminal state
pub struct TransferMachine {
    executor: StepExecutor,
    confirmation: Box<dyn Confirmation>,
    config: MachineConfig,
}

impl TransferMachine {
    pub fn new(
        executor: StepExecutor,
        confirmation: Box<dyn Confirmation>,
        config: MachineConfig,
    ) -> Self {
        Self {
            executor,
            confirmation,
            config,
        }
    }

    /// Run from `cursor` until settled, aborted or failed.
    ///
    /// Returns `Err` only for problems detected before any submission
    /// (cursor out of range, fee overflow, prompt failure). Execution failures
    /// are reported as `Outcome::Failed` with the cursor to resume from.
    pub async fn run(
        &self,
        intent: &TransferIntent,
        signing: &SigningContext,
        cursor: u64,
    ) -> TransferResult<TransferReport> {
        let invocation_id = Uuid::new_v4();
        let span = info_span!(
            "transfer",
            id = %invocation_id,
            direction = %intent.direction(),
            destination = %intent.destination()
        );
        self.drive(invocation_id, intent, signing, cursor)
            .instrument(span)
            .await
    }

    async fn drive(
        &self,
        invocation_id: Uuid,
        intent: &TransferIntent,
        signing: &SigningContext,
        cursor: u64,
    ) -> TransferResult<TransferReport> {
        let plan = intent.plan();
        let start = StepCursor::new(cursor, plan.len())?;
        let summary = TransferSummary::new(intent, start)?;
        // every remaining hop is priced up front so overflow surfaces before submission
        let requests = self.step_requests(intent, start)?;
        let mut acknowledgements: Vec<Acknowledgement> = Vec::new();

        info!(
            amount = summary.amount,
            total_fee = summary.total_fee,
            total_debit = summary.total_debit,
            "Transfer from {} to {} at step {}/{}",
            summary.sender,
            summary.receiver,
            start,
            plan.len()
        );

        if start.index() >= plan.len() {
            info!("Nothing left to execute from step {}", start);
            return Ok(self.report(invocation_id, summary, Outcome::Settled, acknowledgements));
        }

        let mut state = if self.config.force {
            info!("Confirmation bypassed");
            MachineState::Idle(start)
        } else if self.confirmation.confirm(&summary).await? {
            MachineState::Idle(start)
        } else {
            info!("Transfer declined by operator");
            MachineState::Aborted
        };

        let outcome = loop {
            let next = match state {
                MachineState::Idle(k) | MachineState::StepComplete(k) => {
                    MachineState::StepInFlight(k)
                }
                MachineState::StepInFlight(k) => {
                    let request = &requests[k.index() - start.index()];
                    info!("Issuing {} (step {}/{})", request.hop, k.value() + 1, plan.len());

                    match self.executor.execute(request, signing).await {
                        Ok(ack) => {
                            info!(
                                "Step {} acknowledged: {} after {:?}",
                                k, ack.tx_id, ack.elapsed
                            );
                            acknowledgements.push(ack);
                            let done = k.advance();
                            if done.index() >= plan.len() {
                                MachineState::Settled
                            } else {
                                tokio::time::sleep(self.config.step_pause).await;
                                MachineState::StepComplete(done)
                            }
                        }
                        Err(e) => {
                            if e.is_ambiguous() {
                                warn!("Step {} outcome unknown: {}", k, e);
                            } else {
                                error!("Step {} failed: {}", k, e);
                            }
                            MachineState::Failed(k, e)
                        }
                    }
                }
                MachineState::Settled => break Outcome::Settled,
                MachineState::Aborted => break Outcome::Aborted,
                MachineState::Failed(k, e) => break Outcome::failed(k, &e),
            };
            debug!("State -> {:?}", next);
            state = next;
        };

        Ok(self.report(invocation_id, summary, outcome, acknowledgements))
    }

    fn report(
        &self,
        invocation_id: Uuid,
        summary: TransferSummary,
        outcome: Outcome,
        acknowledgements: Vec<Acknowledgement>,
    ) -> TransferReport {
        TransferReport {
            invocation_id,
            finished_at: Utc::now(),
            summary,
            acknowledgements,
            outcome,
        }
    }

    /// Requests for every hop from `start` to the end of the plan
    fn step_requests(
        &self,
        intent: &TransferIntent,
        start: StepCursor,
    ) -> TransferResult<Vec<StepRequest>> {
        let plan_len = intent.plan().len();
        (start.value()..plan_len as u64)
            .map(|k| self.step_request(intent, StepCursor::new(k, plan_len)?))
            .collect()
    }

    /// Request for the hop at `cursor`; exports carry the downstream fees
    fn step_request(&self, intent: &TransferIntent, cursor: StepCursor) -> TransferResult<StepRequest> {
        let hop = intent.plan()[cursor.index()];
        let route_index = fee::route_offset(intent.direction()) + cursor.index();
        let fees = FeeSchedule::new(intent.fee_per_op());

        let amount = if hop.is_export() {
            fees.export_amount(intent.destination(), route_index, intent.amount())?
        } else {
            intent.amount()
        };

        Ok(StepRequest {
            hop,
            amount,
            receiver: intent.receiver(),
        })
    }
}
