//! Gateway fee schedule.
//!
//! The gateway charges 0.5% of every payment, rounded to cents and capped at
//! 2.99 units of the payment currency.

use crate::domain::money::FiatAmount;
use crate::error::Result;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

pub const FEE_RATE: Decimal = dec!(0.005);
pub const MAX_FEE: Decimal = dec!(2.99);

/// Fee charged by the gateway on top of `amount`.
pub fn gateway_fee(amount: &FiatAmount) -> FiatAmount {
    let fee = (amount.value * FEE_RATE)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .min(MAX_FEE);
    FiatAmount::new(fee, amount.currency.clone())
}

/// Total debited for a payment of `amount`: the amount plus the gateway fee.
pub fn amount_plus_fee(amount: &FiatAmount) -> Result<FiatAmount> {
    amount.checked_add(&gateway_fee(amount))
}
