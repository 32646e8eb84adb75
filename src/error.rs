use crate::domain::account::AccountId;
use crate::domain::ledger::ReservationId;
use crate::domain::money::{Currency, FiatAmount};
use crate::domain::payment::{PaymentId, PaymentRequest};
use thiserror::Error;

/// Opaque failure reported by the payment gateway (network, protocol or remote rejection).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct GatewayError(String);

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: FiatAmount,
        available: FiatAmount,
    },
    #[error("Reservation {0} not found")]
    ReservationNotFound(ReservationId),
    #[error(
        "Insufficient reserved funds in reservation {id}: requested {requested}, remaining {remaining}"
    )]
    InsufficientReservation {
        id: ReservationId,
        requested: FiatAmount,
        remaining: FiatAmount,
    },
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Cannot retrieve {currency} balance: {cause}")]
    BalanceRetrievalFailed {
        currency: Currency,
        #[source]
        cause: GatewayError,
    },
    #[error("Payment failed ({request}): {cause}")]
    PaymentFailed {
        request: Box<PaymentRequest>,
        #[source]
        cause: Box<PaymentError>,
    },
    #[error("Payment {0} not found")]
    PaymentNotFound(PaymentId),
    #[error("Cannot look up payment {payment_id}: {cause}")]
    FindPaymentFailed {
        payment_id: PaymentId,
        #[source]
        cause: GatewayError,
    },
    #[error("Processor for account {account_id} failed to start: {cause}")]
    StartFailed {
        account_id: AccountId,
        #[source]
        cause: GatewayError,
    },
    #[error("Payment processor is not running")]
    ProcessorStopped,
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PaymentError>;
