//! [`Vault`]: the four entry points with input policy and a wall-clock limit.
//!
//! The primitives are synchronous and CPU-bound, so every call runs on
//! Tokio's blocking pool and is raced against a timeout. A timed-out call is
//! reported immediately; the blocking task itself cannot be interrupted and
//! runs to completion in the background with its result discarded.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::{Scheme, ServiceError};
use primitives::{CryptoError, PasswordHasher, RsaKeypair, TextCipher};
use tracing::{debug, warn};

use crate::config::Config;

/// Input rules applied before text reaches a cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPolicy {
    pub max_chars: usize,
}

impl TextPolicy {
    /// Text must contain something other than whitespace and be no longer
    /// than `max_chars` characters.
    ///
    /// # Errors
    ///
    /// [`ServiceError::BadRequest`] describing the violated rule.
    pub fn check(&self, text: &str) -> Result<(), ServiceError> {
        if text.trim().is_empty() {
            return Err(ServiceError::BadRequest("text must not be empty".into()));
        }
        let chars = text.chars().count();
        if chars > self.max_chars {
            return Err(ServiceError::BadRequest(format!(
                "text is {chars} characters; the limit is {}",
                self.max_chars
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Vault {
    cipher: TextCipher,
    hasher: PasswordHasher,
    policy: TextPolicy,
    timeout: Duration,
}

impl Vault {
    pub fn new(
        cipher: TextCipher,
        hasher: PasswordHasher,
        policy: TextPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            cipher,
            hasher,
            policy,
            timeout,
        }
    }

    /// Build a vault from validated configuration and a provisioned keypair.
    ///
    /// # Errors
    ///
    /// Returns an error if the Kuznechik key or iteration count is invalid.
    pub fn from_config(cfg: &Config, rsa: Arc<RsaKeypair>) -> Result<Self> {
        let cipher = TextCipher::new(rsa, cfg.grasshopper_schedule()?);
        let hasher = PasswordHasher::new(cfg.password_iterations)?;
        Ok(Self::new(
            cipher,
            hasher,
            TextPolicy {
                max_chars: cfg.max_text_chars,
            },
            Duration::from_secs(cfg.decrypt_timeout_secs),
        ))
    }

    pub async fn encrypt(&self, text: String, scheme: Scheme) -> Result<String, ServiceError> {
        self.policy.check(&text)?;
        let cipher = self.cipher.clone();
        let result = self
            .run_blocking("encrypt", move || cipher.encrypt(&text, scheme))
            .await?;
        result.map_err(|e| {
            warn!(scheme = %scheme, error = %e, "encryption failed");
            ServiceError::EncryptionFailure(describe(&e))
        })
    }

    pub async fn decrypt(&self, envelope: String, scheme: Scheme) -> Result<String, ServiceError> {
        if envelope.trim().is_empty() {
            return Err(ServiceError::BadRequest("envelope must not be empty".into()));
        }
        let cipher = self.cipher.clone();
        let result = self
            .run_blocking("decrypt", move || cipher.decrypt(&envelope, scheme))
            .await?;
        result.map_err(|e| {
            warn!(scheme = %scheme, error = %e, "decryption failed");
            ServiceError::DecryptionFailure(describe(&e))
        })
    }

    pub async fn hash_password(&self, password: String) -> Result<String, ServiceError> {
        let hasher = self.hasher;
        self.run_blocking("hash_password", move || hasher.hash(&password))
            .await
    }

    /// Never fails on a malformed record; that is just `false`.
    pub async fn verify_password(
        &self,
        password: String,
        record: String,
    ) -> Result<bool, ServiceError> {
        let hasher = self.hasher;
        self.run_blocking("verify_password", move || hasher.verify(&password, &record))
            .await
    }

    async fn run_blocking<T, F>(&self, op: &'static str, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let started = std::time::Instant::now();
        match tokio::time::timeout(self.timeout, tokio::task::spawn_blocking(f)).await {
            Ok(Ok(value)) => {
                debug!(op, elapsed_ms = started.elapsed().as_millis() as u64, "operation complete");
                Ok(value)
            }
            Ok(Err(join)) => Err(ServiceError::Internal(format!("{op} task failed: {join}"))),
            Err(_) => {
                warn!(op, timeout_secs = self.timeout.as_secs(), "operation timed out");
                Err(ServiceError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}

/// Error text including the underlying cause, which never contains plaintext.
fn describe(e: &CryptoError) -> String {
    match std::error::Error::source(e) {
        Some(source) => format!("{e}: {source}"),
        None => e.to_string(),
    }
}
