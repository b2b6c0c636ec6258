//! RSA keypair provisioning.
//!
//! # Lifecycle
//!
//! 1. At startup, [`load_or_generate`] reads the keypair from `RSA_KEY_FILE`
//!    if that file exists.
//! 2. Otherwise a fresh `RSA_KEY_BITS` keypair is generated and, when a path
//!    is configured, written there so later runs can decrypt what this one
//!    encrypted. The write never replaces an existing file: if another
//!    process stored a keypair first, that one is loaded and used instead.
//! 3. The keypair is then held behind an `Arc` and never replaced for the
//!    rest of the process.
//!
//! # Security invariants
//!
//! - The private exponent is never logged or included in traces.
//! - A stored keypair is only replaced by an explicit `vault keygen --force`.

pub mod store;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use primitives::RsaKeypair;
use tracing::{info, warn};

use crate::config::Config;
use store::{KeyStoreError, WriteMode};

/// Load the configured keypair, or generate (and persist) a new one.
///
/// Generation is CPU-bound and can take seconds at 2048 bits; call this from
/// a blocking context.
///
/// # Errors
///
/// Returns an error if an existing key file cannot be read or is invalid, if
/// generation is refused, or if the new key cannot be written.
pub fn load_or_generate(cfg: &Config) -> Result<Arc<RsaKeypair>> {
    let Some(path) = cfg.rsa_key_file.as_deref() else {
        let key = RsaKeypair::generate(cfg.rsa_key_bits).context("failed to generate RSA keypair")?;
        warn!(
            bits = key.bits(),
            "RSA_KEY_FILE not set; RSA ciphertext from this run cannot be decrypted by later runs"
        );
        return Ok(Arc::new(key));
    };

    if path.exists() {
        return load(path);
    }

    let key = RsaKeypair::generate(cfg.rsa_key_bits).context("failed to generate RSA keypair")?;
    match store::write_key_file(path, &key, WriteMode::CreateNew) {
        Ok(()) => {
            info!(path = %path.display(), bits = key.bits(), "RSA keypair generated and stored");
            Ok(Arc::new(key))
        }
        Err(KeyStoreError::AlreadyExists { .. }) => {
            warn!(path = %path.display(), "RSA key file appeared concurrently; using it");
            load(path)
        }
        Err(e) => {
            Err(e).with_context(|| format!("failed to write RSA key file {}", path.display()))
        }
    }
}

fn load(path: &Path) -> Result<Arc<RsaKeypair>> {
    let key = store::read_key_file(path)
        .with_context(|| format!("failed to load RSA key file {}", path.display()))?;
    info!(path = %path.display(), bits = key.bits(), "RSA keypair loaded");
    Ok(Arc::new(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg_with_file(path: std::path::PathBuf) -> Config {
        Config {
            rsa_key_bits: 512,
            rsa_key_file: Some(path),
            ..Config::default()
        }
    }

    #[test]
    fn generates_once_then_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cfg_with_file(dir.path().join("rsa.json"));

        let first = load_or_generate(&cfg).unwrap();
        assert_eq!(first.bits(), 512);
        assert!(dir.path().join("rsa.json").exists());

        let second = load_or_generate(&cfg).unwrap();
        assert_eq!(*first, *second);
    }

    #[test]
    fn concurrent_first_start_agrees_on_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cfg_with_file(dir.path().join("rsa.json"));

        let keys: Vec<Arc<RsaKeypair>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| load_or_generate(&cfg))).collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect()
        });

        let stored = load_or_generate(&cfg).unwrap();
        for key in &keys {
            assert_eq!(**key, *stored);
        }
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsa.json");
        std::fs::write(&path, b"[]").unwrap();
        assert!(load_or_generate(&cfg_with_file(path)).is_err());
    }

    #[test]
    fn ephemeral_key_without_path() {
        let cfg = Config {
            rsa_key_bits: 512,
            ..Config::default()
        };
        assert_eq!(load_or_generate(&cfg).unwrap().bits(), 512);
    }
}
