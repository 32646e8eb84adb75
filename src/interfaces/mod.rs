//! Driving adapters: CSV command scripts and their execution against a processor.

pub mod csv;
pub mod runner;
