//! Logger initialization. Everything else in the crate logs through the `log` facade.

mod init;

pub use init::{LoggingConfig, init_logging};
