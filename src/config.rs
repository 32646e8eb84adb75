use crate::domain::account::AccountId;
use crate::error::{PaymentError, Result};
use std::time::Duration;

pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_INBOX_CAPACITY: usize = 64;
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 64;

/// Settings for a [`PaymentProcessor`](crate::application::processor::PaymentProcessor).
///
/// Gateway credentials are not part of this: they belong to the gateway client.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub account_id: AccountId,
    /// Time between two balance polls.
    pub polling_interval: Duration,
    /// Requests buffered before callers wait for the processor.
    pub inbox_capacity: usize,
    /// Balance notifications buffered per subscriber before it lags.
    pub notification_capacity: usize,
}

impl ProcessorConfig {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            polling_interval: DEFAULT_POLLING_INTERVAL,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }

    pub fn with_polling_interval(mut self, polling_interval: Duration) -> Self {
        self.polling_interval = polling_interval;
        self
    }

    pub fn with_inbox_capacity(mut self, inbox_capacity: usize) -> Self {
        self.inbox_capacity = inbox_capacity;
        self
    }

    pub fn with_notification_capacity(mut self, notification_capacity: usize) -> Self {
        self.notification_capacity = notification_capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.polling_interval.is_zero() {
            return Err(PaymentError::InvalidConfig(
                "polling interval must be greater than zero".to_string(),
            ));
        }
        if self.inbox_capacity == 0 {
            return Err(PaymentError::InvalidConfig(
                "inbox capacity must be greater than zero".to_string(),
            ));
        }
        if self.notification_capacity == 0 {
            return Err(PaymentError::InvalidConfig(
                "notification capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
