//! Salted, iterated Stribog-512 password records.
//!
//! # Record format
//!
//! ```text
//! streebog512$<iterations>$<hex salt>$<hex digest>
//! ```
//!
//! `digest = H(salt ‖ password)` re-hashed `iterations - 1` more times, where
//! `H` is Stribog-512. The tag is matched case-insensitively.

use std::fmt;
use std::str::FromStr;

use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::stribog::{streebog512, DigestSize, Stribog};

/// Rounds of Stribog-512 applied when the deployment does not choose its own.
pub const DEFAULT_ITERATIONS: u32 = 1000;

/// Largest iteration count accepted from a record or a configuration.
///
/// Verification runs the count stored in the record, so an unbounded value
/// would let a crafted record pin a CPU.
pub const MAX_ITERATIONS: u32 = 100_000;

/// Length of a freshly drawn salt, in bytes.
pub const SALT_LEN: usize = 16;

/// First field of every record.
pub const ALGORITHM_TAG: &str = "streebog512";

const DIGEST_LEN: usize = 64;

/// Why a record string could not be parsed. Never carries the password.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("expected 4 '$'-separated fields, found {0}")]
    WrongFieldCount(usize),

    #[error("unsupported algorithm tag '{0}'")]
    UnknownAlgorithm(String),

    #[error("iteration count must be a positive integer")]
    InvalidIterations,

    #[error("iteration count {0} exceeds the limit of 100000")]
    TooManyIterations(u32),

    #[error("salt is not valid hex")]
    InvalidSalt,

    #[error("digest must be 64 hex-encoded bytes")]
    InvalidDigest,
}

/// A parsed password record.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PasswordRecord {
    pub iterations: u32,
    pub salt: Vec<u8>,
    pub digest: [u8; DIGEST_LEN],
}

impl FromStr for PasswordRecord {
    type Err = PasswordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('$').collect();
        let [tag, iterations, salt, digest] = fields[..] else {
            return Err(PasswordError::WrongFieldCount(fields.len()));
        };

        if !tag.eq_ignore_ascii_case(ALGORITHM_TAG) {
            return Err(PasswordError::UnknownAlgorithm(tag.to_owned()));
        }

        let iterations = iterations
            .parse::<u32>()
            .ok()
            .filter(|&n| n >= 1)
            .ok_or(PasswordError::InvalidIterations)?;
        if iterations > MAX_ITERATIONS {
            return Err(PasswordError::TooManyIterations(iterations));
        }
        let salt = hex::decode(salt).map_err(|_| PasswordError::InvalidSalt)?;

        let mut digest_bytes = hex::decode(digest).map_err(|_| PasswordError::InvalidDigest)?;
        if digest_bytes.len() != DIGEST_LEN {
            return Err(PasswordError::InvalidDigest);
        }
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&digest_bytes);
        digest_bytes.zeroize();

        Ok(Self {
            iterations,
            salt,
            digest,
        })
    }
}

impl fmt::Display for PasswordRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ALGORITHM_TAG}${}${}${}",
            self.iterations,
            hex::encode(&self.salt),
            hex::encode(self.digest)
        )
    }
}

impl fmt::Debug for PasswordRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordRecord")
            .field("iterations", &self.iterations)
            .field("salt_len", &self.salt.len())
            .finish_non_exhaustive()
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; DIGEST_LEN] {
    let mut hasher = Stribog::new(DigestSize::Bits512);
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&hasher.finalize());

    for _ in 1..iterations {
        let next = streebog512(&digest);
        digest.zeroize();
        digest = next;
    }
    digest
}

/// Produces and checks password records at a fixed iteration count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl PasswordHasher {
    /// # Errors
    ///
    /// [`PasswordError::InvalidIterations`] when `iterations` is zero and
    /// [`PasswordError::TooManyIterations`] above [`MAX_ITERATIONS`].
    pub fn new(iterations: u32) -> Result<Self, PasswordError> {
        if iterations == 0 {
            return Err(PasswordError::InvalidIterations);
        }
        if iterations > MAX_ITERATIONS {
            return Err(PasswordError::TooManyIterations(iterations));
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash `password` under a fresh random salt.
    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        self.hash_with_salt(password, &salt)
    }

    /// Hash `password` under a caller-chosen salt. Deterministic.
    pub fn hash_with_salt(&self, password: &str, salt: &[u8]) -> String {
        let record = PasswordRecord {
            iterations: self.iterations,
            salt: salt.to_vec(),
            digest: derive(password, salt, self.iterations),
        };
        record.to_string()
    }

    /// Check `password` against `record`.
    ///
    /// The iteration count stored in the record is used, not this hasher's,
    /// so records survive a change of the deployment default. A malformed
    /// record is simply a mismatch.
    pub fn verify(&self, password: &str, record: &str) -> bool {
        let record = match record.trim().parse::<PasswordRecord>() {
            Ok(record) => record,
            Err(e) => {
                debug!(error = %e, "rejecting malformed password record");
                return false;
            }
        };

        let mut computed = derive(password, &record.salt, record.iterations);
        let matches: bool = computed.ct_eq(&record.digest).into();
        computed.zeroize();
        matches
    }
}

/// [`PasswordHasher::hash`] at [`DEFAULT_ITERATIONS`].
pub fn hash_password(password: &str) -> String {
    PasswordHasher::default().hash(password)
}

/// [`PasswordHasher::verify`] with the default hasher.
pub fn verify_password(password: &str, record: &str) -> bool {
    PasswordHasher::default().verify(password, record)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f,
    ];

    const KNOWN_RECORD: &str = "streebog512$3$000102030405060708090a0b0c0d0e0f$c3ca18602a9647787bea36d51c76a979c39ecc20eddeba07ee8654f35da0717115c8696bc61d8d9ab40f6a3478aa3dbde33c251d90ee82f207445a1e78e9a0f5";

    fn fast() -> PasswordHasher {
        PasswordHasher::new(3).unwrap()
    }

    #[test]
    fn known_record() {
        assert_eq!(fast().hash_with_salt("correct horse", &SALT), KNOWN_RECORD);
        assert!(fast().verify("correct horse", KNOWN_RECORD));
        assert!(!fast().verify("correct horse!", KNOWN_RECORD));
    }

    #[test]
    fn single_iteration_is_one_digest() {
        let record: PasswordRecord = PasswordHasher::new(1)
            .unwrap()
            .hash_with_salt("pw", b"salt")
            .parse()
            .unwrap();
        assert_eq!(record.digest, streebog512(b"saltpw"));
    }

    #[test]
    fn verify_uses_record_iterations() {
        let record = PasswordHasher::new(5).unwrap().hash("hunter2");
        assert!(fast().verify("hunter2", &record));
        assert!(verify_password("hunter2", &record));
    }

    #[test]
    fn fresh_salts_differ() {
        let a = fast().hash("same");
        let b = fast().hash("same");
        assert_ne!(a, b);
        assert!(fast().verify("same", &a));
        assert!(fast().verify("same", &b));
    }

    #[test]
    fn record_shape() {
        let record = fast().hash("pw");
        let fields: Vec<&str> = record.split('$').collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], ALGORITHM_TAG);
        assert_eq!(fields[1], "3");
        assert_eq!(fields[2].len(), SALT_LEN * 2);
        assert_eq!(fields[3].len(), DIGEST_LEN * 2);
    }

    #[test]
    fn tag_is_case_insensitive() {
        let upper = KNOWN_RECORD.replacen("streebog512", "STREEBOG512", 1);
        assert!(fast().verify("correct horse", &upper));
    }

    #[test]
    fn malformed_records_are_rejected() {
        let cases = [
            ("", PasswordError::WrongFieldCount(1)),
            ("streebog512$3$00", PasswordError::WrongFieldCount(3)),
            ("a$b$c$d$e", PasswordError::WrongFieldCount(5)),
            ("sha256$3$00$00", PasswordError::UnknownAlgorithm("sha256".into())),
            ("streebog512$0$00$00", PasswordError::InvalidIterations),
            ("streebog512$-1$00$00", PasswordError::InvalidIterations),
            ("streebog512$x$00$00", PasswordError::InvalidIterations),
            ("streebog512$3$zz$00", PasswordError::InvalidSalt),
            ("streebog512$3$00$00", PasswordError::InvalidDigest),
        ];
        for (record, expected) in cases {
            assert_eq!(record.parse::<PasswordRecord>().unwrap_err(), expected, "{record}");
            assert!(!fast().verify("pw", record));
        }
    }

    #[test]
    fn zero_iterations_rejected() {
        assert_eq!(PasswordHasher::new(0), Err(PasswordError::InvalidIterations));
        assert_eq!(PasswordHasher::default().iterations(), DEFAULT_ITERATIONS);
    }

    #[test]
    fn iteration_ceiling() {
        let digest = "00".repeat(DIGEST_LEN);
        let huge = format!("streebog512$4294967295$00${digest}");
        assert_eq!(
            huge.parse::<PasswordRecord>().unwrap_err(),
            PasswordError::TooManyIterations(u32::MAX)
        );
        assert!(!verify_password("pw", &huge));

        let at_limit = format!("streebog512${MAX_ITERATIONS}$00${digest}");
        assert_eq!(at_limit.parse::<PasswordRecord>().unwrap().iterations, MAX_ITERATIONS);

        assert_eq!(
            PasswordHasher::new(MAX_ITERATIONS + 1),
            Err(PasswordError::TooManyIterations(MAX_ITERATIONS + 1))
        );
        assert!(PasswordHasher::new(MAX_ITERATIONS).is_ok());
    }

    #[test]
    fn debug_hides_digest() {
        let record: PasswordRecord = KNOWN_RECORD.parse().unwrap();
        let dbg = format!("{record:?}");
        assert!(!dbg.contains("c3ca1860"));
        assert_eq!(record.to_string(), KNOWN_RECORD);
    }
}
