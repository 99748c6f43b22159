//! Operator-facing summaries: the pre-confirmation summary and the terminal report

use super::guard::format_display;
use super::{Direction, StepCursor, TransferIntent};
use crate::address::Address;
use crate::chain::ChainClass;
use crate::error::{TransferError, TransferResult};
use crate::tx::{fee, Acknowledgement, FeeSchedule};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Name of the CLI flag that carries the resume cursor
pub const RESUME_FLAG: &str = "receive-recovery-step";

/// Everything the operator confirms before the first submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferSummary {
    pub direction: Direction,
    pub destination: ChainClass,
    pub amount: u64,
    pub fee_per_op: u64,
    pub total_fee: u64,
    pub total_debit: u64,
    pub sender: Address,
    pub receiver: Address,
    pub start_cursor: StepCursor,
    pub hops: usize,
}

impl TransferSummary {
    pub fn new(intent: &TransferIntent, start_cursor: StepCursor) -> TransferResult<Self> {
        let fees = FeeSchedule::new(intent.fee_per_op());
        let direction = intent.direction();
        let destination = intent.destination();

        Ok(Self {
            direction,
            destination,
            amount: intent.amount(),
            fee_per_op: intent.fee_per_op(),
            total_fee: fees.total_fee(direction, destination)?,
            total_debit: fees.total_debit(direction, destination, intent.amount())?,
            sender: intent.sender(),
            receiver: intent.receiver(),
            start_cursor,
            hops: fee::plan(direction, destination).len(),
        })
    }
}

impl fmt::Display for TransferSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "this operation is going to:")?;
        match self.direction {
            Direction::SendOut => {
                let source = self.sender.on_chain(ChainClass::Primary);
                writeln!(
                    f,
                    "- send {} from {} to target address {}",
                    format_display(self.amount),
                    source,
                    self.receiver.on_chain(self.destination)
                )?;
                writeln!(
                    f,
                    "- take a fee of {} from source address {}",
                    format_display(self.total_fee),
                    source
                )?;
                writeln!(f, "- debit a total of {}", format_display(self.total_debit))?;
            }
            Direction::ReceiveIn => {
                writeln!(
                    f,
                    "- receive {} at target address {}",
                    format_display(self.amount),
                    self.receiver.on_chain(self.destination)
                )?;
                writeln!(
                    f,
                    "- pay fees of {} out of the imported funds",
                    format_display(self.total_fee)
                )?;
            }
        }
        if self.start_cursor != StepCursor::START {
            writeln!(
                f,
                "- resume at step {} of {}",
                self.start_cursor.value() + 1,
                self.hops
            )?;
        }
        Ok(())
    }
}

/// Terminal state of one invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    Settled,
    Aborted,
    Failed {
        /// Value to pass back on the next invocation
        resume_cursor: u64,
        error: String,
        /// The failed operation may have been accepted anyway
        ambiguous: bool,
        retry_safe: bool,
    },
}

impl Outcome {
    pub fn failed(cursor: StepCursor, error: &TransferError) -> Self {
        Outcome::Failed {
            resume_cursor: cursor.value(),
            error: error.to_string(),
            ambiguous: error.is_ambiguous(),
            retry_safe: error.is_retry_safe(),
        }
    }

    pub fn resume_cursor(&self) -> Option<u64> {
        match self {
            Outcome::Failed { resume_cursor, .. } => Some(*resume_cursor),
            _ => None,
        }
    }
}

/// What the orchestrator reports on every terminal state
#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    pub invocation_id: Uuid,
    pub finished_at: DateTime<Utc>,
    pub summary: TransferSummary,
    pub acknowledgements: Vec<Acknowledgement>,
    pub outcome: Outcome,
}

impl TransferReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }

    /// Resume instruction printed for a failed invocation
    pub fn resume_hint(&self) -> Option<String> {
        let Outcome::Failed {
            resume_cursor,
            ambiguous,
            ..
        } = &self.outcome
        else {
            return None;
        };

        let mut hint = if *resume_cursor == 0 {
            "restart from this step by using the same command".to_string()
        } else {
            format!(
                "restart from this step by using the same command with extra arguments: --{} {}",
                RESUME_FLAG, resume_cursor
            )
        };

        if *ambiguous {
            hint.push_str(&format!(
                "\nthe last operation may have been accepted: check the ledger first and, if it was, resume with --{} {} instead",
                RESUME_FLAG,
                resume_cursor + 1
            ));
        }
        Some(hint)
    }
}

impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)?;
        for ack in &self.acknowledgements {
            writeln!(f, "- {} accepted on {} as {}", ack.hop, ack.chain, ack.tx_id)?;
        }
        match &self.outcome {
            Outcome::Settled => writeln!(f, "Transfer {} complete", self.summary.direction),
            Outcome::Aborted => writeln!(f, "Cancelled"),
            Outcome::Failed { error, .. } => {
                writeln!(f, "ERROR: {}", error)?;
                if let Some(hint) = self.resume_hint() {
                    writeln!(f, "{}", hint)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receive_summary() -> TransferSummary {
        let me = Address::from_bytes([4u8; 20]);
        let intent = TransferIntent::new(
            Direction::ReceiveIn,
            ChainClass::Primary,
            2_000_000_000,
            1_000_000,
            me,
            me,
        )
        .unwrap();
        TransferSummary::new(&intent, StepCursor::new(1, 3).unwrap()).unwrap()
    }

    #[test]
    fn test_send_summary_shows_total() {
        let intent = TransferIntent::new(
            Direction::SendOut,
            ChainClass::Primary,
            1_500_000_000,
            10,
            Address::from_bytes([1u8; 20]),
            Address::from_bytes([2u8; 20]),
        )
        .unwrap();
        let summary = TransferSummary::new(&intent, StepCursor::START).unwrap();
        assert_eq!(summary.total_fee, 40);
        assert_eq!(summary.total_debit, 1_500_000_040);

        let text = summary.to_string();
        assert!(text.contains("send 1.500000000"));
        assert!(text.contains("take a fee of 0.000000040"));
        assert!(text.contains("debit a total of 1.500000040"));
    }

    #[test]
    fn test_failed_report_hint() {
        let error = TransferError::TimeoutPendingUnknown {
            chain: ChainClass::Secondary,
            operation: "acceptance".to_string(),
            tx_id: None,
        };
        let report = TransferReport {
            invocation_id: Uuid::new_v4(),
            finished_at: Utc::now(),
            summary: receive_summary(),
            acknowledgements: Vec::new(),
            outcome: Outcome::failed(StepCursor::new(1, 3).unwrap(), &error),
        };

        assert!(report.is_failure());
        assert_eq!(report.outcome.resume_cursor(), Some(1));
        let text = report.to_string();
        assert!(text.contains("--receive-recovery-step 1"));
        assert!(text.contains("--receive-recovery-step 2 instead"));
        assert!(text.contains("resume at step 2 of 3"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["state"], "failed");
        assert_eq!(json["outcome"]["resume_cursor"], 1);
    }

    #[test]
    fn test_rejected_at_start_hint() {
        let error = TransferError::Rejected {
            chain: ChainClass::Primary,
            reason: "insufficient funds".to_string(),
        };
        let report = TransferReport {
            invocation_id: Uuid::new_v4(),
            finished_at: Utc::now(),
            summary: receive_summary(),
            acknowledgements: Vec::new(),
            outcome: Outcome::failed(StepCursor::START, &error),
        };
        assert_eq!(
            report.resume_hint().unwrap(),
            "restart from this step by using the same command"
        );
    }
}
