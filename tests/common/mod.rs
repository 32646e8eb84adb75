#![allow(dead_code)]

use async_trait::async_trait;
use fiatpay::application::processor::{PaymentProcessor, ProcessorHandle};
use fiatpay::config::ProcessorConfig;
use fiatpay::domain::account::AccountId;
use fiatpay::domain::money::{Currency, FiatAmount};
use fiatpay::domain::payment::{Payment, PaymentId};
use fiatpay::domain::ports::{PaymentGateway, SharedGateway};
use fiatpay::error::GatewayError;
use fiatpay::infrastructure::in_memory::InMemoryGateway;
use rust_decimal::Decimal;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

pub const SENDER: &str = "OK-SENDER";
pub const RECEIVER: &str = "OK-RECEIVER";
pub const POLLING_INTERVAL: Duration = Duration::from_secs(10);

pub fn currency(code: &str) -> Currency {
    Currency::new(code).unwrap()
}

pub fn usd(value: Decimal) -> FiatAmount {
    FiatAmount::new(value, currency("USD"))
}

pub fn eur(value: Decimal) -> FiatAmount {
    FiatAmount::new(value, currency("EUR"))
}

pub fn account(id: &str) -> AccountId {
    AccountId::new(id).unwrap()
}

pub async fn gateway_with(balances: &[FiatAmount]) -> InMemoryGateway {
    let gateway = InMemoryGateway::new(account(SENDER));
    for balance in balances {
        gateway.set_balance(balance.clone()).await;
    }
    gateway
}

/// Starts a processor polling every [`POLLING_INTERVAL`] over `gateway`.
pub async fn start(gateway: &InMemoryGateway) -> ProcessorHandle {
    start_over(Arc::new(gateway.clone())).await
}

pub async fn start_over(gateway: SharedGateway) -> ProcessorHandle {
    let config = ProcessorConfig::new(account(SENDER)).with_polling_interval(POLLING_INTERVAL);
    PaymentProcessor::start(config, gateway)
        .await
        .expect("processor should start")
}

/// Delegates to an [`InMemoryGateway`] but panics on selected calls.
pub struct PanickingGateway {
    pub inner: InMemoryGateway,
    /// 1-based `fetch_balances` call that panics.
    pub panic_on_fetch: Option<usize>,
    pub panic_on_payment: bool,
}

impl PanickingGateway {
    pub fn new(inner: &InMemoryGateway) -> Self {
        Self {
            inner: inner.clone(),
            panic_on_fetch: None,
            panic_on_payment: false,
        }
    }
}

#[async_trait]
impl PaymentGateway for PanickingGateway {
    async fn fetch_balances(&self) -> Result<Vec<FiatAmount>, GatewayError> {
        let balances = self.inner.fetch_balances().await;
        if Some(self.inner.calls().await.fetch_balances) == self.panic_on_fetch {
            panic!("balance decoder bug");
        }
        balances
    }

    async fn send_payment(
        &self,
        receiver: &AccountId,
        amount: &FiatAmount,
        description: &str,
    ) -> Result<Payment, GatewayError> {
        if self.panic_on_payment {
            panic!("payment client bug");
        }
        self.inner.send_payment(receiver, amount, description).await
    }

    async fn find_payment(&self, id: &PaymentId) -> Result<Option<Payment>, GatewayError> {
        self.inner.find_payment(id).await
    }
}

/// Waits, without advancing time, until the gateway has received `count` payments.
pub async fn wait_for_payment_calls(gateway: &InMemoryGateway, count: usize) {
    while gateway.calls().await.send_payment < count {
        tokio::task::yield_now().await;
    }
}

/// Writes a command script with the standard header followed by `rows`.
pub fn write_script(rows: &[[&str; 6]]) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(file.path()).unwrap();
    wtr.write_record([
        "command",
        "currency",
        "amount",
        "reference",
        "receiver",
        "description",
    ])
    .unwrap();
    for row in rows {
        wtr.write_record(row).unwrap();
    }
    wtr.flush().unwrap();
    file
}

/// Writes `content` verbatim, for scripts that are deliberately malformed.
pub fn write_raw_script(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
