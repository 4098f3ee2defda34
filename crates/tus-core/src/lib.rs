//! Core domain + application logic for the Telegram User Search bridge.
//!
//! This crate is intentionally framework-agnostic. Telegram (MTProto) and the
//! HTTP server live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod parser;
pub mod transport;

pub use errors::{Error, Result};
