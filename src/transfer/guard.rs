//! Amount and address preconditions, checked before any operation is built
//!
//! Display amounts carry at most `DISPLAY_DECIMALS` fractional digits; one
//! display unit is `10^DISPLAY_DECIMALS` base units. Conversion goes through
//! `Decimal` so it never rounds.

use super::Direction;
use crate::address::Address;
use crate::chain::ChainClass;
use crate::error::{TransferError, TransferResult};

use rust_decimal::prelude::*;

pub const DISPLAY_DECIMALS: u32 = 9;

/// Base units per display unit
pub const DENOMINATION: u64 = 1_000_000_000;

/// Convert a display amount into base units, rejecting anything that would round
pub fn to_base_units(amount: Decimal) -> TransferResult<u64> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(TransferError::InvalidAmount(format!(
            "value {} must be greater than zero",
            amount
        )));
    }

    let normalized = amount.normalize();
    if normalized.scale() > DISPLAY_DECIMALS {
        return Err(TransferError::InvalidAmount(format!(
            "value {} has more than {} decimal places",
            amount, DISPLAY_DECIMALS
        )));
    }

    let scaled = normalized
        .checked_mul(Decimal::from(DENOMINATION))
        .ok_or_else(|| TransferError::InvalidAmount(format!("value {} is too large", amount)))?;

    scaled
        .to_u64()
        .ok_or_else(|| TransferError::InvalidAmount(format!("value {} is too large", amount)))
}

/// Exact inverse of `to_base_units`
pub fn to_display(base_units: u64) -> Decimal {
    Decimal::from_i128_with_scale(base_units as i128, DISPLAY_DECIMALS)
}

/// Fixed-precision rendering used in operator summaries
pub fn format_display(base_units: u64) -> String {
    format!("{:.9}", to_display(base_units))
}

/// A same-chain hop to oneself would only burn fees
pub fn ensure_distinct(
    direction: Direction,
    destination: ChainClass,
    sender: &Address,
    receiver: &Address,
) -> TransferResult<()> {
    match (direction, destination) {
        (Direction::SendOut, ChainClass::Primary) if sender == receiver => {
            Err(TransferError::SelfTransfer {
                address: sender.on_chain(ChainClass::Primary),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_exact_conversion() {
        assert_eq!(to_base_units(dec("1.5")).unwrap(), 1_500_000_000);
        assert_eq!(to_base_units(dec("0.000000001")).unwrap(), 1);
        assert_eq!(to_base_units(dec("42")).unwrap(), 42 * DENOMINATION);
        // trailing zeros beyond the precision are not extra precision
        assert_eq!(to_base_units(dec("2.50000000000")).unwrap(), 2_500_000_000);
    }

    #[test]
    fn test_reversible() {
        for raw in ["1.5", "0.000000001", "123456.789", "7"] {
            let amount = dec(raw);
            let base = to_base_units(amount).unwrap();
            assert_eq!(to_display(base), amount);
        }
        assert_eq!(format_display(1_500_000_000), "1.500000000");
    }

    #[test]
    fn test_rejects_non_positive_and_imprecise() {
        for raw in ["0", "-1", "-0.5", "0.0000000001"] {
            assert!(matches!(
                to_base_units(dec(raw)),
                Err(TransferError::InvalidAmount(_))
            ));
        }
        assert!(to_base_units(Decimal::MAX).is_err());
    }

    #[test]
    fn test_self_transfer() {
        let a = Address::from_bytes([1u8; 20]);
        let b = Address::from_bytes([2u8; 20]);

        assert!(matches!(
            ensure_distinct(Direction::SendOut, ChainClass::Primary, &a, &a),
            Err(TransferError::SelfTransfer { .. })
        ));
        assert!(ensure_distinct(Direction::SendOut, ChainClass::Primary, &a, &b).is_ok());
        assert!(ensure_distinct(Direction::SendOut, ChainClass::Secondary, &a, &a).is_ok());
        assert!(ensure_distinct(Direction::ReceiveIn, ChainClass::Primary, &a, &a).is_ok());
    }
}
