//! Fee schedule for export/import routes
//!
//! Every hop costs one `fee_per_op`. A transfer toward the primary chain has to
//! pass through the secondary chain, so its route is four hops long:
//!
//! ```text
//! Primary:   Export P->X | Import X<-P, Export X->P, Import P<-X
//! Secondary: Export P->X | Import X<-P
//! ```
//!
//! The sender executes the part left of `|`, the receiver the rest. An export
//! carries the fees of every hop after it, so the receiver never needs a
//! separate balance on the intermediate chain.

use crate::chain::{ChainClass, Hop};
use crate::error::{TransferError, TransferResult};
use crate::transfer::Direction;

const PRIMARY_ROUTE: [Hop; 4] = [
    Hop::Export {
        from: ChainClass::Primary,
        to: ChainClass::Secondary,
    },
    Hop::Import {
        into: ChainClass::Secondary,
        from: ChainClass::Primary,
    },
    Hop::Export {
        from: ChainClass::Secondary,
        to: ChainClass::Primary,
    },
    Hop::Import {
        into: ChainClass::Primary,
        from: ChainClass::Secondary,
    },
];

const SECONDARY_ROUTE: [Hop; 2] = [
    Hop::Export {
        from: ChainClass::Primary,
        to: ChainClass::Secondary,
    },
    Hop::Import {
        into: ChainClass::Secondary,
        from: ChainClass::Primary,
    },
];

/// End-to-end hops for value landing on `destination`
pub fn route(destination: ChainClass) -> &'static [Hop] {
    match destination {
        ChainClass::Primary => &PRIMARY_ROUTE,
        ChainClass::Secondary => &SECONDARY_ROUTE,
    }
}

/// Offset of the first hop `direction` executes within the route
pub fn route_offset(direction: Direction) -> usize {
    match direction {
        Direction::SendOut => 0,
        Direction::ReceiveIn => 1,
    }
}

/// Hops executed by one side of the transfer
pub fn plan(direction: Direction, destination: ChainClass) -> &'static [Hop] {
    let full = route(destination);
    match direction {
        Direction::SendOut => &full[..1],
        Direction::ReceiveIn => &full[route_offset(direction)..],
    }
}

/// Fee units charged to one side of the transfer.
///
/// SendOut pays for the whole route (4 toward primary, 2 toward secondary);
/// ReceiveIn accounts one unit per sub-step it executes.
pub fn multiplier(direction: Direction, destination: ChainClass) -> u64 {
    match direction {
        Direction::SendOut => route(destination).len() as u64,
        Direction::ReceiveIn => plan(direction, destination).len() as u64,
    }
}

/// Fee units an export at `route_index` carries for the hops after it
pub fn export_surcharge(destination: ChainClass, route_index: usize) -> u64 {
    let len = route(destination).len();
    len.saturating_sub(route_index + 1) as u64
}

/// Fee schedule bound to a network's per-operation fee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    fee_per_op: u64,
}

impl FeeSchedule {
    pub fn new(fee_per_op: u64) -> Self {
        Self { fee_per_op }
    }

    pub fn total_fee(&self, direction: Direction, destination: ChainClass) -> TransferResult<u64> {
        self.fee_per_op
            .checked_mul(multiplier(direction, destination))
            .ok_or_else(overflow)
    }

    /// Value leaving the operator's balance: amount plus fees for SendOut,
    /// the bare amount for ReceiveIn (fees come out of the imported value)
    pub fn total_debit(
        &self,
        direction: Direction,
        destination: ChainClass,
        amount: u64,
    ) -> TransferResult<u64> {
        match direction {
            Direction::SendOut => amount
                .checked_add(self.total_fee(direction, destination)?)
                .ok_or_else(overflow),
            Direction::ReceiveIn => Ok(amount),
        }
    }

    /// Value an export at `route_index` must move
    pub fn export_amount(
        &self,
        destination: ChainClass,
        route_index: usize,
        amount: u64,
    ) -> TransferResult<u64> {
        self.fee_per_op
            .checked_mul(export_surcharge(destination, route_index))
            .and_then(|surcharge| amount.checked_add(surcharge))
            .ok_or_else(overflow)
    }
}

fn overflow() -> TransferError {
    TransferError::InvalidAmount("amount plus fees overflows".to_string())
}
