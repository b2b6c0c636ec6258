//! Common types, protocol definitions, and errors shared across `gost-vault` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
pub use protocol::Scheme;
