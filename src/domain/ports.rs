use super::account::AccountId;
use super::money::FiatAmount;
use super::payment::{Payment, PaymentId};
use crate::error::GatewayError;
use async_trait::async_trait;
use std::sync::Arc;

/// Capabilities consumed from the external payment gateway.
///
/// Every call may fail with an opaque [`GatewayError`]. Implementations must be
/// reentrant: the processor issues independent calls from concurrent tasks.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Balances of the account in every currency the gateway reports.
    async fn fetch_balances(&self) -> Result<Vec<FiatAmount>, GatewayError>;

    async fn send_payment(
        &self,
        receiver: &AccountId,
        amount: &FiatAmount,
        description: &str,
    ) -> Result<Payment, GatewayError>;

    async fn find_payment(&self, id: &PaymentId) -> Result<Option<Payment>, GatewayError>;
}

pub type SharedGateway = Arc<dyn PaymentGateway>;
