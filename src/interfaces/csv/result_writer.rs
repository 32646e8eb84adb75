use crate::error::Result;
use crate::interfaces::csv::command_reader::CommandType;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok,
    Error,
}

/// Result of one executed command, written as one CSV row.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct CommandResult {
    pub command: CommandType,
    pub outcome: Outcome,
    pub detail: String,
}

impl CommandResult {
    pub fn ok(command: CommandType, detail: impl Into<String>) -> Self {
        Self {
            command,
            outcome: Outcome::Ok,
            detail: detail.into(),
        }
    }

    pub fn error(command: CommandType, detail: impl Into<String>) -> Self {
        Self {
            command,
            outcome: Outcome::Error,
            detail: detail.into(),
        }
    }
}

/// Writes command results as CSV, header first.
pub struct ResultWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write(&mut self, result: &CommandResult) -> Result<()> {
        self.writer.serialize(result)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
