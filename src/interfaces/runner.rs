use crate::application::processor::ProcessorHandle;
use crate::domain::account::AccountId;
use crate::domain::ledger::ReservationId;
use crate::domain::money::{Currency, FiatAmount};
use crate::domain::payment::PaymentId;
use crate::error::{PaymentError, Result};
use crate::interfaces::csv::command_reader::{Command, CommandType};
use crate::interfaces::csv::result_writer::CommandResult;

/// Executes script commands one after the other against a running processor.
pub struct ScriptRunner {
    handle: ProcessorHandle,
}

impl ScriptRunner {
    pub fn new(handle: ProcessorHandle) -> Self {
        Self { handle }
    }

    /// Runs one command. Failures become `error` results, never `Err`.
    pub async fn execute(&self, command: Command) -> CommandResult {
        let kind = command.command;
        match self.dispatch(command).await {
            Ok(detail) => CommandResult::ok(kind, detail),
            Err(err) => CommandResult::error(kind, err.to_string()),
        }
    }

    async fn dispatch(&self, command: Command) -> Result<String> {
        match command.command {
            CommandType::Account => Ok(self.handle.retrieve_account_id().await?.to_string()),
            CommandType::Balance => {
                let entry = self.handle.retrieve_balance(currency(&command)?).await?;
                Ok(format!("{} stale={}", entry.amount, entry.stale))
            }
            CommandType::Block => {
                let blocked = self.handle.block_funds(amount(&command)?).await?;
                Ok(format!("{} available={}", blocked.id, blocked.available_after))
            }
            CommandType::Release => {
                let id = reservation(&command)?;
                match self.handle.release_funds(id).await? {
                    Some(released) => Ok(format!("{id} released={released}")),
                    None => Err(PaymentError::ReservationNotFound(id)),
                }
            }
            CommandType::Pay => {
                let receiver = AccountId::new(required(&command.receiver, "receiver")?)?;
                let payment = self
                    .handle
                    .pay(
                        reservation(&command)?,
                        receiver,
                        amount(&command)?,
                        command.description.clone().unwrap_or_default(),
                    )
                    .await?;
                Ok(format!(
                    "{} {} to {}",
                    payment.id, payment.amount, payment.receiver_id
                ))
            }
            CommandType::Find => {
                let payment_id = PaymentId::new(required(&command.reference, "reference")?);
                let payment = self.handle.find_payment(payment_id).await?;
                Ok(format!(
                    "{} {} to {} completed={}",
                    payment.id, payment.amount, payment.receiver_id, payment.completed
                ))
            }
        }
    }
}

fn required<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str> {
    field
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| PaymentError::ValidationError(format!("Missing {name}")))
}

fn currency(command: &Command) -> Result<Currency> {
    Currency::new(required(&command.currency, "currency")?)
}

fn amount(command: &Command) -> Result<FiatAmount> {
    let value = command
        .amount
        .ok_or_else(|| PaymentError::ValidationError("Missing amount".to_string()))?;
    FiatAmount::positive(value, currency(command)?)
}

fn reservation(command: &Command) -> Result<ReservationId> {
    required(&command.reference, "reference")?.parse()
}
