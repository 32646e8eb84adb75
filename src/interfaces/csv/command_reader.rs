use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Account,
    Balance,
    Block,
    Release,
    Pay,
    Find,
}

/// One row of a command script.
///
/// Which columns are required depends on the command; `reference` holds a
/// reservation id for `release`/`pay` and a payment id for `find`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Command {
    pub command: CommandType,
    pub currency: Option<String>,
    pub amount: Option<Decimal>,
    pub reference: Option<String>,
    pub receiver: Option<String>,
    pub description: Option<String>,
}

/// Reads commands from a CSV source.
///
/// Whitespace is trimmed and trailing empty columns may be omitted.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes commands, one `Result` per row.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
