use crate::domain::money::{Currency, FiatAmount};
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Identifier of a reservation, unique for the lifetime of a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReservationId(pub u64);

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReservationId {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim().parse().map(Self).map_err(|_| {
            PaymentError::ValidationError(format!("Invalid reservation id '{s}'"))
        })
    }
}

/// Outcome of a successful reservation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedFunds {
    pub id: ReservationId,
    pub amount: FiatAmount,
    /// Headroom left in the currency once this reservation is accounted for.
    pub available_after: FiatAmount,
}

/// In-memory ledger of funds blocked against the cached balances.
///
/// A reservation is only accepted when it fits in the headroom of its
/// currency, i.e. the cached balance minus every live reservation in that
/// currency. Failed operations leave the ledger untouched.
#[derive(Debug, Default)]
pub struct ReservationLedger {
    reservations: HashMap<ReservationId, FiatAmount>,
    /// Reservations fully used up by payments. Kept so that paying again from
    /// them reports a shortfall instead of an unknown id.
    ///
    /// Grows by one id per exhausted reservation until that id is released.
    exhausted: HashSet<ReservationId>,
    last_id: u64,
}

impl ReservationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of the live reservations in `currency`.
    pub fn reserved(&self, currency: &Currency) -> FiatAmount {
        let value = self
            .reservations
            .values()
            .filter(|amount| &amount.currency == currency)
            .map(|amount| amount.value)
            .sum();
        FiatAmount::new(value, currency.clone())
    }

    /// Balance minus live reservations in the balance currency, never negative.
    pub fn headroom(&self, balance: &FiatAmount) -> FiatAmount {
        let reserved = self.reserved(&balance.currency);
        FiatAmount::new(balance.value - reserved.value, balance.currency.clone()).non_negative()
    }

    /// Blocks `amount` if it fits in the headroom left by `balance`.
    pub fn reserve(&mut self, amount: FiatAmount, balance: &FiatAmount) -> Result<BlockedFunds> {
        amount.ensure_positive()?;
        balance.ensure_same_currency(&amount)?;

        let available = self.headroom(balance);
        if amount.try_cmp(&available)? == Ordering::Greater {
            return Err(PaymentError::InsufficientFunds {
                requested: amount,
                available,
            });
        }

        self.last_id += 1;
        let id = ReservationId(self.last_id);
        let available_after = available.checked_sub(&amount)?;
        self.reservations.insert(id, amount.clone());

        Ok(BlockedFunds {
            id,
            amount,
            available_after,
        })
    }

    /// Takes `amount` out of reservation `id`, returning what remains.
    ///
    /// A reservation consumed down to zero is removed.
    pub fn consume(&mut self, id: ReservationId, amount: &FiatAmount) -> Result<FiatAmount> {
        let Some(remaining) = self.reservations.get(&id) else {
            if self.exhausted.contains(&id) {
                return Err(PaymentError::InsufficientReservation {
                    id,
                    requested: amount.clone(),
                    remaining: FiatAmount::zero(amount.currency.clone()),
                });
            }
            return Err(PaymentError::ReservationNotFound(id));
        };

        if remaining.try_cmp(amount)? == Ordering::Less {
            return Err(PaymentError::InsufficientReservation {
                id,
                requested: amount.clone(),
                remaining: remaining.clone(),
            });
        }

        let left = remaining.checked_sub(amount)?;
        if left.is_zero() {
            self.reservations.remove(&id);
            self.exhausted.insert(id);
        } else {
            self.reservations.insert(id, left.clone());
        }
        Ok(left)
    }

    /// Drops reservation `id`, returning its remaining amount to general availability.
    ///
    /// Releasing an exhausted reservation returns `None` and forgets its id.
    pub fn release(&mut self, id: ReservationId) -> Option<FiatAmount> {
        self.exhausted.remove(&id);
        self.reservations.remove(&id)
    }

    /// Number of exhausted reservation ids still remembered.
    pub fn exhausted_len(&self) -> usize {
        self.exhausted.len()
    }

    pub fn get(&self, id: ReservationId) -> Option<&FiatAmount> {
        self.reservations.get(&id)
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }
}
