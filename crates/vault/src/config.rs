//! Configuration loading and validation for the vault binary.
//!
//! All values are read from environment variables at startup. Every variable
//! is optional; the process exits with a clear error message if one is set to
//! an invalid value.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use primitives::kuznechik::{KeySchedule, DEFAULT_KEY_HEX};
use primitives::password::{DEFAULT_ITERATIONS, MAX_ITERATIONS};
use primitives::rsa::MIN_KEY_BITS;
use serde::Deserialize;

/// Validated vault configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Tracing log level (e.g. `"info"`, `"debug"`). `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 64-hex-digit Kuznechik master key.
    #[serde(default = "default_grasshopper_key")]
    pub grasshopper_key: String,

    /// Modulus size for newly generated RSA keypairs.
    #[serde(default = "default_rsa_key_bits")]
    pub rsa_key_bits: u64,

    /// JSON key file holding the RSA keypair. Loaded if present, written
    /// after generation otherwise. Without it the keypair lives only as long
    /// as the process.
    #[serde(default)]
    pub rsa_key_file: Option<PathBuf>,

    /// Stribog-512 rounds for new password records.
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,

    /// Wall-clock limit for a single encrypt, decrypt, or password operation.
    #[serde(default = "default_decrypt_timeout")]
    pub decrypt_timeout_secs: u64,

    /// Longest plaintext accepted for encryption, in characters.
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_grasshopper_key() -> String {
    DEFAULT_KEY_HEX.into()
}
fn default_rsa_key_bits() -> u64 {
    2048
}
fn default_password_iterations() -> u32 {
    DEFAULT_ITERATIONS
}
fn default_decrypt_timeout() -> u64 {
    30
}
fn default_max_text_chars() -> usize {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            grasshopper_key: default_grasshopper_key(),
            rsa_key_bits: default_rsa_key_bits(),
            rsa_key_file: None,
            password_iterations: default_password_iterations(),
            decrypt_timeout_secs: default_decrypt_timeout(),
            max_text_chars: default_max_text_chars(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("log_level", &self.log_level)
            .field("grasshopper_key", &"[REDACTED]")
            .field("rsa_key_bits", &self.rsa_key_bits)
            .field("rsa_key_file", &self.rsa_key_file)
            .field("password_iterations", &self.password_iterations)
            .field("decrypt_timeout_secs", &self.decrypt_timeout_secs)
            .field("max_text_chars", &self.max_text_chars)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    pub fn validate(&self) -> Result<()> {
        self.grasshopper_schedule()?;

        if self.rsa_key_bits < MIN_KEY_BITS {
            anyhow::bail!("RSA_KEY_BITS must be at least {MIN_KEY_BITS}");
        }
        if self.password_iterations == 0 {
            anyhow::bail!("PASSWORD_ITERATIONS must be > 0");
        }
        if self.password_iterations > MAX_ITERATIONS {
            anyhow::bail!("PASSWORD_ITERATIONS must be at most {MAX_ITERATIONS}");
        }
        if self.decrypt_timeout_secs == 0 {
            anyhow::bail!("DECRYPT_TIMEOUT_SECS must be > 0");
        }
        if self.max_text_chars == 0 {
            anyhow::bail!("MAX_TEXT_CHARS must be > 0");
        }
        Ok(())
    }

    /// Expand the configured Kuznechik key.
    ///
    /// # Errors
    ///
    /// Returns an error naming `GRASSHOPPER_KEY` if it is not 64 hex digits.
    pub fn grasshopper_schedule(&self) -> Result<KeySchedule> {
        KeySchedule::from_hex(&self.grasshopper_key)
            .context("GRASSHOPPER_KEY must be 64 hex digits (32 bytes)")
    }
}
