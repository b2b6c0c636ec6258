//! Command-line interface.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use common::protocol::VerifyOutput;
use common::{Scheme, ServiceError};
use primitives::RsaKeypair;
use tracing::{info, warn};

use crate::config::Config;
use crate::keys;
use crate::keys::store::{KeyStoreError, WriteMode};
use crate::selftest;
use crate::service::Vault;

#[derive(Parser)]
#[command(
    name = "vault",
    version,
    about = "GOST text vault",
    long_about = "GOST text vault\nKuznechik / textbook RSA text encryption and Stribog password records.\n\
                  Configuration is read from the environment (LOG_LEVEL, GRASSHOPPER_KEY, RSA_KEY_BITS,\n\
                  RSA_KEY_FILE, PASSWORD_ITERATIONS, DECRYPT_TIMEOUT_SECS, MAX_TEXT_CHARS)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate an RSA keypair and write it as a JSON key file
    ///
    /// An existing key file is never overwritten unless --force is given.
    /// Replacing it makes every stored RSA ciphertext undecryptable.
    ///
    /// Example: vault keygen --bits 2048 --out /var/lib/vault/rsa.json
    #[command(name = "keygen")]
    Keygen {
        /// Modulus size in bits (defaults to RSA_KEY_BITS)
        #[arg(long)]
        bits: Option<u64>,

        /// Destination file (defaults to RSA_KEY_FILE; stdout if neither is set)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Replace an existing key file
        #[arg(long)]
        force: bool,
    },

    /// Encrypt text and print the envelope
    ///
    /// Example: echo "hello" | vault encrypt --scheme grasshopper
    #[command(name = "encrypt")]
    Encrypt {
        /// rsa or grasshopper
        #[arg(short, long)]
        scheme: Scheme,

        /// Plaintext (read from stdin if omitted)
        text: Option<String>,
    },

    /// Decrypt an envelope and print the text
    #[command(name = "decrypt")]
    Decrypt {
        /// Scheme the envelope was produced with
        #[arg(short, long)]
        scheme: Scheme,

        /// Envelope (read from stdin if omitted)
        envelope: Option<String>,
    },

    /// Hash a password and print the record
    #[command(name = "hash-password")]
    HashPassword {
        /// Password (read from stdin if omitted)
        password: Option<String>,
    },

    /// Check a password against a record and print {"valid": bool}
    #[command(name = "verify-password")]
    VerifyPassword {
        /// Stored record: streebog512$<iterations>$<salt>$<digest>
        #[arg(long)]
        record: String,

        /// Password (read from stdin if omitted)
        password: Option<String>,
    },

    /// Run the known-answer checks and print a JSON report
    #[command(name = "selftest")]
    Selftest,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Keygen { .. } => "keygen",
            Command::Encrypt { .. } => "encrypt",
            Command::Decrypt { .. } => "decrypt",
            Command::HashPassword { .. } => "hash-password",
            Command::VerifyPassword { .. } => "verify-password",
            Command::Selftest => "selftest",
        }
    }
}

/// Execute `command`, writing its result to stdout.
///
/// # Errors
///
/// Returns the [`ServiceError`] whose exit code the process should use.
pub async fn run(command: Command, cfg: Config) -> Result<(), ServiceError> {
    match command {
        Command::Keygen { bits, out, force } => keygen(&cfg, bits, out, force).await,
        Command::Selftest => {
            let report = tokio::task::spawn_blocking(selftest::run)
                .await
                .map_err(|e| ServiceError::Internal(format!("selftest task failed: {e}")))?;
            print_json(&report)?;
            if report.passed {
                Ok(())
            } else {
                Err(ServiceError::Internal("selftest failed".into()))
            }
        }
        command => {
            let vault = build_vault(cfg).await?;
            match command {
                Command::Encrypt { scheme, text } => {
                    let envelope = vault.encrypt(input_or_stdin(text)?, scheme).await?;
                    println!("{envelope}");
                }
                Command::Decrypt { scheme, envelope } => {
                    let text = vault.decrypt(input_or_stdin(envelope)?, scheme).await?;
                    println!("{text}");
                }
                Command::HashPassword { password } => {
                    let record = vault.hash_password(input_or_stdin(password)?).await?;
                    println!("{record}");
                }
                Command::VerifyPassword { record, password } => {
                    let valid = vault
                        .verify_password(input_or_stdin(password)?, record)
                        .await?;
                    print_json(&VerifyOutput { valid })?;
                }
                // Handled above without provisioning keys.
                Command::Keygen { .. } | Command::Selftest => {}
            }
            Ok(())
        }
    }
}

async fn build_vault(cfg: Config) -> Result<Vault, ServiceError> {
    tokio::task::spawn_blocking(move || {
        let rsa = keys::load_or_generate(&cfg)?;
        Vault::from_config(&cfg, rsa)
    })
    .await
    .map_err(|e| ServiceError::Internal(format!("key provisioning task failed: {e}")))?
    .map_err(|e| ServiceError::Internal(format!("{e:#}")))
}

async fn keygen(
    cfg: &Config,
    bits: Option<u64>,
    out: Option<PathBuf>,
    force: bool,
) -> Result<(), ServiceError> {
    let bits = bits.unwrap_or(cfg.rsa_key_bits);
    let dest = out.or_else(|| cfg.rsa_key_file.clone());
    let mode = if force {
        WriteMode::Replace
    } else {
        WriteMode::CreateNew
    };

    // Fail before spending time on generation; the write re-checks atomically.
    if let Some(path) = dest.as_deref().filter(|p| !force && p.exists()) {
        return Err(refuse_overwrite(path));
    }

    let key = tokio::task::spawn_blocking(move || RsaKeypair::generate(bits))
        .await
        .map_err(|e| ServiceError::Internal(format!("keygen task failed: {e}")))?
        .map_err(|e| ServiceError::BadRequest(e.to_string()))?;

    match dest {
        Some(path) => {
            keys::store::write_key_file(&path, &key, mode).map_err(|e| match e {
                KeyStoreError::AlreadyExists { .. } => refuse_overwrite(&path),
                e => ServiceError::Internal(e.to_string()),
            })?;
            if force {
                warn!(path = %path.display(), bits = key.bits(), "key file replaced");
            } else {
                info!(path = %path.display(), bits = key.bits(), "key file written");
            }
        }
        None => print_json(&key.to_key_file())?,
    }
    Ok(())
}

fn refuse_overwrite(path: &Path) -> ServiceError {
    ServiceError::BadRequest(format!(
        "key file {} already exists; pass --force to replace it",
        path.display()
    ))
}

/// Use `arg` if given, otherwise read all of stdin minus one trailing newline.
fn input_or_stdin(arg: Option<String>) -> Result<String, ServiceError> {
    if let Some(value) = arg {
        return Ok(value);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| ServiceError::BadRequest(format!("failed to read stdin: {e}")))?;
    Ok(strip_trailing_newline(buf))
}

fn strip_trailing_newline(mut s: String) -> String {
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    }
    s
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), ServiceError> {
    let json = serde_json::to_string(value)
        .map_err(|e| ServiceError::Internal(format!("failed to serialise output: {e}")))?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_scheme_case_insensitively() {
        let cli = Cli::try_parse_from(["vault", "encrypt", "--scheme", "RSA", "hi"]).unwrap();
        match cli.command {
            Command::Encrypt { scheme, text } => {
                assert_eq!(scheme, Scheme::Rsa);
                assert_eq!(text.as_deref(), Some("hi"));
            }
            _ => panic!("expected encrypt"),
        }
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(Cli::try_parse_from(["vault", "decrypt", "--scheme", "aes", "x"]).is_err());
    }

    #[test]
    fn verify_requires_record() {
        assert!(Cli::try_parse_from(["vault", "verify-password", "pw"]).is_err());
        let cli =
            Cli::try_parse_from(["vault", "verify-password", "--record", "r", "pw"]).unwrap();
        assert_eq!(cli.command.name(), "verify-password");
    }

    #[test]
    fn trailing_newline_handling() {
        assert_eq!(strip_trailing_newline("abc\n".into()), "abc");
        assert_eq!(strip_trailing_newline("abc\r\n".into()), "abc");
        assert_eq!(strip_trailing_newline("abc\n\n".into()), "abc\n");
        assert_eq!(strip_trailing_newline("abc".into()), "abc");
    }

    #[tokio::test]
    async fn keygen_writes_requested_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsa.json");
        keygen(&Config::default(), Some(512), Some(path.clone()), false)
            .await
            .unwrap();
        let key = keys::store::read_key_file(&path).unwrap();
        assert_eq!(key.bits(), 512);
    }

    #[tokio::test]
    async fn keygen_rejects_tiny_keys() {
        let err = keygen(&Config::default(), Some(128), None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn keygen_never_replaces_configured_key_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            rsa_key_bits: 512,
            rsa_key_file: Some(dir.path().join("rsa.json")),
            ..Config::default()
        };

        let vault = build_vault(cfg.clone()).await.unwrap();
        let envelope = vault.encrypt("secret".into(), Scheme::Rsa).await.unwrap();

        let err = keygen(&cfg, Some(512), None, false).await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
        assert!(err.to_string().contains("--force"));

        let reloaded = build_vault(cfg.clone()).await.unwrap();
        assert_eq!(
            reloaded.decrypt(envelope, Scheme::Rsa).await.unwrap(),
            "secret"
        );

        let path = dir.path().join("rsa.json");
        let original = keys::store::read_key_file(&path).unwrap();
        keygen(&cfg, Some(512), None, true).await.unwrap();
        assert_ne!(keys::store::read_key_file(&path).unwrap(), original);
    }

    #[test]
    fn keygen_force_flag_parses() {
        let cli = Cli::try_parse_from(["vault", "keygen", "--force", "--out", "k.json"]).unwrap();
        match cli.command {
            Command::Keygen { force, out, bits } => {
                assert!(force);
                assert_eq!(out, Some(PathBuf::from("k.json")));
                assert_eq!(bits, None);
            }
            _ => panic!("expected keygen"),
        }
    }
}
