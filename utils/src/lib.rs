//! Shared utilities for ledgerdesk.

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingError};
