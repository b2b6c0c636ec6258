//! Structured logging setup.
//!
//! # Telemetry invariants
//!
//! - **No plaintext, password, or key material** may appear in any span
//!   attribute or log field.
//! - Logs go to stderr; stdout carries only command output.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`), and
//!   `RUST_LOG` takes precedence when set.

pub mod init;

pub use init::init_telemetry;
