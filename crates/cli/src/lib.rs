//! `tripkit-cli` library crate.
//!
//! Re-exports the command parser and the logging observer for testing. The
//! binary entrypoint lives in `main.rs`.

pub mod command;
pub mod observer;
