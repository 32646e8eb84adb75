//! Application layer containing the payment processor.
//!
//! The `PaymentProcessor` is the entry point for every operation. It uses an
//! actor pattern with `tokio` channels: all state lives in one task and is
//! only reached through a `ProcessorHandle`.

mod poller;
pub mod processor;
