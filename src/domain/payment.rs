use crate::domain::account::AccountId;
use crate::domain::ledger::ReservationId;
use crate::domain::money::FiatAmount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gateway-assigned payment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A payment as recorded by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub amount: FiatAmount,
    pub description: String,
    pub date: DateTime<Utc>,
    pub completed: bool,
}

/// A request to pay `amount` to `receiver_id` out of a reservation.
///
/// The reservation must cover the amount plus the gateway fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub reservation_id: ReservationId,
    pub receiver_id: AccountId,
    pub amount: FiatAmount,
    pub description: String,
}

impl fmt::Display for PaymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {} from reservation {}",
            self.amount, self.receiver_id, self.reservation_id
        )
    }
}
