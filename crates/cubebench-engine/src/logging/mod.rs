//! Logger initialization for binaries built on the engine.
//!
//! Everything logs through the `log` facade; `env_logger` is the only backend.

mod init;

pub use init::{LoggingConfig, init_logging};
