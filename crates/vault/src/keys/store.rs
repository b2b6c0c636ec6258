//! RSA key file persistence.
//!
//! The file is the JSON form of [`KeyFile`]. It holds the private exponent,
//! so it is created with owner-only permissions on Unix.
//!
//! Writes go to a temporary file in the destination directory which is then
//! moved into place, so readers never observe a partially written key. In
//! [`WriteMode::CreateNew`] the move fails if the destination already exists.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use common::protocol::KeyFile;
use primitives::rsa::{RsaError, RsaKeypair};
use tempfile::NamedTempFile;
use thiserror::Error;

/// What to do when the destination key file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with [`KeyStoreError::AlreadyExists`].
    CreateNew,
    /// Atomically replace the existing keypair.
    Replace,
}

/// Errors produced while reading or writing a key file.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key file {path} already exists")]
    AlreadyExists { path: PathBuf },

    #[error("key file is not valid JSON")]
    Json(#[from] serde_json::Error),

    #[error("key file holds an unusable key")]
    InvalidKey(#[from] RsaError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> KeyStoreError + '_ {
    move |source| KeyStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read and validate a keypair.
///
/// # Errors
///
/// Returns a [`KeyStoreError`] if the file cannot be read, parsed, or holds
/// an invalid key.
pub fn read_key_file(path: &Path) -> Result<RsaKeypair, KeyStoreError> {
    let bytes = fs::read(path).map_err(io_error(path))?;
    let file: KeyFile = serde_json::from_slice(&bytes)?;
    Ok(RsaKeypair::from_key_file(&file)?)
}

/// Write `key` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`KeyStoreError::AlreadyExists`] if `mode` is
/// [`WriteMode::CreateNew`] and `path` exists, and [`KeyStoreError::Io`] on
/// any other filesystem failure.
pub fn write_key_file(path: &Path, key: &RsaKeypair, mode: WriteMode) -> Result<(), KeyStoreError> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
            parent
        }
        None => Path::new("."),
    };

    let json = serde_json::to_vec_pretty(&key.to_key_file())?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_error(dir))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(io_error(tmp.path()))?;
    }
    tmp.write_all(&json).map_err(io_error(tmp.path()))?;
    tmp.as_file().sync_all().map_err(io_error(tmp.path()))?;

    let persisted = match mode {
        WriteMode::CreateNew => tmp.persist_noclobber(path),
        WriteMode::Replace => tmp.persist(path),
    };
    match persisted {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
            Err(KeyStoreError::AlreadyExists {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(io_error(path)(e.error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitives::num_bigint::BigUint;

    fn toy_key() -> RsaKeypair {
        RsaKeypair::from_parts(
            BigUint::from(65_537u32),
            BigUint::from(1_335_773u32),
            BigUint::from(4_028_033u32),
        )
        .unwrap()
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rsa.json");
        write_key_file(&path, &toy_key(), WriteMode::CreateNew).unwrap();
        assert_eq!(read_key_file(&path).unwrap(), toy_key());
    }

    #[cfg(unix)]
    #[test]
    fn file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsa.json");
        write_key_file(&path, &toy_key(), WriteMode::CreateNew).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    fn other_key() -> RsaKeypair {
        // p = 2027, q = 2029
        RsaKeypair::from_parts(
            BigUint::from(65_537u32),
            BigUint::from(1_549_025u32),
            BigUint::from(4_112_783u32),
        )
        .unwrap()
    }

    #[test]
    fn create_new_keeps_existing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsa.json");
        write_key_file(&path, &toy_key(), WriteMode::CreateNew).unwrap();

        let err = write_key_file(&path, &other_key(), WriteMode::CreateNew).unwrap_err();
        assert!(matches!(err, KeyStoreError::AlreadyExists { .. }));
        assert_eq!(read_key_file(&path).unwrap(), toy_key());

        write_key_file(&path, &other_key(), WriteMode::Replace).unwrap();
        assert_eq!(read_key_file(&path).unwrap(), other_key());
    }

    #[test]
    fn no_temporary_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsa.json");
        write_key_file(&path, &toy_key(), WriteMode::CreateNew).unwrap();
        let _ = write_key_file(&path, &other_key(), WriteMode::CreateNew);
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_key_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, KeyStoreError::Io { .. }));
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsa.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(matches!(read_key_file(&path), Err(KeyStoreError::Json(_))));

        fs::write(
            &path,
            br#"{"public_exponent":"3","private_exponent":"0","modulus":"99999999"}"#,
        )
        .unwrap();
        assert!(matches!(read_key_file(&path), Err(KeyStoreError::InvalidKey(_))));
    }
}
