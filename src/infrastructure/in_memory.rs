use crate::domain::account::AccountId;
use crate::domain::fee;
use crate::domain::money::{Currency, FiatAmount};
use crate::domain::payment::{Payment, PaymentId};
use crate::domain::ports::PaymentGateway;
use crate::error::GatewayError;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Number of calls received per gateway operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GatewayCalls {
    pub fetch_balances: usize,
    pub send_payment: usize,
    pub find_payment: usize,
}

#[derive(Default)]
struct GatewayState {
    balances: BTreeMap<Currency, Decimal>,
    payments: Vec<Payment>,
    last_payment: u64,
    calls: GatewayCalls,
    fetch_failure: Option<GatewayError>,
    payment_failure: Option<GatewayError>,
    lookup_failure: Option<GatewayError>,
    fetch_latency: Duration,
    payment_latency: Duration,
}

/// A gateway that keeps one account entirely in memory.
///
/// Payments debit the amount plus the gateway fee and fail when the account
/// cannot cover them. Failures and latency can be injected per operation,
/// which makes it the deterministic stand-in for a real gateway in tests and
/// in the command-line driver.
///
/// Clones share the same account.
#[derive(Clone)]
pub struct InMemoryGateway {
    account_id: AccountId,
    state: Arc<RwLock<GatewayState>>,
}

impl InMemoryGateway {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            state: Arc::new(RwLock::new(GatewayState::default())),
        }
    }

    pub async fn set_balance(&self, amount: FiatAmount) {
        let mut state = self.state.write().await;
        state.balances.insert(amount.currency, amount.value);
    }

    pub async fn balance(&self, currency: &Currency) -> Option<FiatAmount> {
        let state = self.state.read().await;
        state
            .balances
            .get(currency)
            .map(|value| FiatAmount::new(*value, currency.clone()))
    }

    /// Makes every `fetch_balances` call fail until cleared with `None`.
    pub async fn fail_fetches(&self, failure: Option<&str>) {
        self.state.write().await.fetch_failure = failure.map(GatewayError::new);
    }

    pub async fn fail_payments(&self, failure: Option<&str>) {
        self.state.write().await.payment_failure = failure.map(GatewayError::new);
    }

    pub async fn fail_lookups(&self, failure: Option<&str>) {
        self.state.write().await.lookup_failure = failure.map(GatewayError::new);
    }

    pub async fn set_fetch_latency(&self, latency: Duration) {
        self.state.write().await.fetch_latency = latency;
    }

    pub async fn set_payment_latency(&self, latency: Duration) {
        self.state.write().await.payment_latency = latency;
    }

    pub async fn calls(&self) -> GatewayCalls {
        self.state.read().await.calls
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.state.read().await.payments.clone()
    }
}

async fn delay(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn fetch_balances(&self) -> Result<Vec<FiatAmount>, GatewayError> {
        let latency = {
            let mut state = self.state.write().await;
            state.calls.fetch_balances += 1;
            state.fetch_latency
        };
        delay(latency).await;

        let state = self.state.read().await;
        if let Some(failure) = &state.fetch_failure {
            return Err(failure.clone());
        }
        Ok(state
            .balances
            .iter()
            .map(|(currency, value)| FiatAmount::new(*value, currency.clone()))
            .collect())
    }

    async fn send_payment(
        &self,
        receiver: &AccountId,
        amount: &FiatAmount,
        description: &str,
    ) -> Result<Payment, GatewayError> {
        let latency = {
            let mut state = self.state.write().await;
            state.calls.send_payment += 1;
            state.payment_latency
        };
        delay(latency).await;

        let mut state = self.state.write().await;
        if let Some(failure) = &state.payment_failure {
            return Err(failure.clone());
        }

        let total = fee::amount_plus_fee(amount).map_err(|e| GatewayError::new(e.to_string()))?;
        let available = state
            .balances
            .get(&amount.currency)
            .copied()
            .unwrap_or(Decimal::ZERO);
        if available < total.value {
            return Err(GatewayError::new(format!(
                "insufficient {} balance: {} available, {} required",
                amount.currency, available, total.value
            )));
        }
        state
            .balances
            .insert(amount.currency.clone(), available - total.value);

        state.last_payment += 1;
        let payment = Payment {
            id: PaymentId::new(format!("PAY-{}", state.last_payment)),
            sender_id: self.account_id.clone(),
            receiver_id: receiver.clone(),
            amount: amount.clone(),
            description: description.to_string(),
            date: Utc::now(),
            completed: true,
        };
        state.payments.push(payment.clone());
        Ok(payment)
    }

    async fn find_payment(&self, id: &PaymentId) -> Result<Option<Payment>, GatewayError> {
        let mut state = self.state.write().await;
        state.calls.find_payment += 1;
        if let Some(failure) = &state.lookup_failure {
            return Err(failure.clone());
        }
        Ok(state
            .payments
            .iter()
            .find(|payment| &payment.id == id)
            .cloned())
    }
}
