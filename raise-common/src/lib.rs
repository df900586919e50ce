//! # RAISE Common Library
//!
//! Shared code for the RAISE queue workers:
//! - Error type and `Result` alias
//! - TOML configuration model and file resolution
//! - Tracing subscriber initialization
//! - Queue Adapter trait with in-memory and stdio adapters

pub mod config;
pub mod error;
pub mod logging;
pub mod queue;

pub use error::{Error, Result};
pub use queue::{MemoryQueue, QueueAdapter, StdioQueue};
