//! Domain layer: money, the reservation ledger, the balance cache and the
//! gateway port. Nothing in here performs I/O.

pub mod account;
pub mod balance;
pub mod fee;
pub mod ledger;
pub mod money;
pub mod payment;
pub mod ports;
