//! Transfer workflow: intent, cursor, guard, state machine and report

pub mod guard;
mod machine;
mod report;

pub use machine::{MachineConfig, TransferMachine};
pub use report::{Outcome, TransferReport, TransferSummary};

use crate::address::Address;
use crate::chain::{ChainClass, Hop};
use crate::error::{TransferError, TransferResult};
use crate::tx::fee;

use serde::Serialize;
use std::fmt;

/// Which side of the transfer this invocation performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Export from the sender's primary-chain balance
    SendOut,
    /// Import (and, toward primary, re-export and import) into the receiver
    ReceiveIn,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::SendOut => write!(f, "send"),
            Direction::ReceiveIn => write!(f, "receive"),
        }
    }
}

/// What the operator asked for; fixed for the whole invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    direction: Direction,
    destination: ChainClass,
    amount: u64,
    fee_per_op: u64,
    sender: Address,
    receiver: Address,
}

impl TransferIntent {
    pub fn new(
        direction: Direction,
        destination: ChainClass,
        amount: u64,
        fee_per_op: u64,
        sender: Address,
        receiver: Address,
    ) -> TransferResult<Self> {
        if amount == 0 {
            return Err(TransferError::InvalidAmount(
                "value must be greater than zero".to_string(),
            ));
        }
        guard::ensure_distinct(direction, destination, &sender, &receiver)?;

        Ok(Self {
            direction,
            destination,
            amount,
            fee_per_op,
            sender,
            receiver,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn destination(&self) -> ChainClass {
        self.destination
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn fee_per_op(&self) -> u64 {
        self.fee_per_op
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    pub fn receiver(&self) -> Address {
        self.receiver
    }

    /// Hops this side executes, in order
    pub fn plan(&self) -> &'static [Hop] {
        fee::plan(self.direction, self.destination)
    }

    /// Chains the signer must be able to sign for
    pub fn signing_chains(&self) -> Vec<ChainClass> {
        let mut chains: Vec<ChainClass> = Vec::new();
        for hop in self.plan() {
            let chain = hop.issuing_chain();
            if !chains.contains(&chain) {
                chains.push(chain);
            }
        }
        chains
    }
}

/// Index of the next hop to execute; the only state that survives a restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct StepCursor(u64);

impl StepCursor {
    pub const START: StepCursor = StepCursor(0);

    /// Accepts `0..=plan_len`; `plan_len` means nothing is left to do
    pub fn new(value: u64, plan_len: usize) -> TransferResult<Self> {
        if value > plan_len as u64 {
            return Err(TransferError::InvalidCursor {
                cursor: value,
                max: plan_len.saturating_sub(1) as u64,
            });
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub(crate) fn advance(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_rejects_self_send() {
        let me = Address::from_bytes([5u8; 20]);
        let result = TransferIntent::new(
            Direction::SendOut,
            ChainClass::Primary,
            1_000,
            10,
            me,
            me,
        );
        assert!(matches!(result, Err(TransferError::SelfTransfer { .. })));
    }

    #[test]
    fn test_signing_chains() {
        let me = Address::from_bytes([5u8; 20]);
        let receive = TransferIntent::new(
            Direction::ReceiveIn,
            ChainClass::Primary,
            1_000,
            10,
            me,
            me,
        )
        .unwrap();
        assert_eq!(
            receive.signing_chains(),
            vec![ChainClass::Secondary, ChainClass::Primary]
        );

        let send = TransferIntent::new(
            Direction::SendOut,
            ChainClass::Secondary,
            1_000,
            10,
            me,
            me,
        )
        .unwrap();
        assert_eq!(send.signing_chains(), vec![ChainClass::Primary]);
    }

    #[test]
    fn test_cursor_bounds() {
        assert_eq!(StepCursor::new(2, 3).unwrap().index(), 2);
        assert!(StepCursor::new(3, 3).is_ok());
        assert!(matches!(
            StepCursor::new(4, 3),
            Err(TransferError::InvalidCursor { cursor: 4, max: 2 })
        ));
        assert!(StepCursor::new(2, 1).is_err());
    }
}
