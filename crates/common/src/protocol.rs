//! Types exchanged between the primitives, the `vault` binary, and whatever
//! layer persists their output.
//!
//! Everything here is serialised as JSON: key files on disk and command
//! output on stdout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Scheme
// ---------------------------------------------------------------------------

/// Reversible transform applied to stored text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Per-character textbook RSA.
    Rsa,
    /// Kuznechik (GOST R 34.12-2015) over zero-padded 16-byte blocks.
    #[serde(alias = "kuznechik")]
    Grasshopper,
}

impl Scheme {
    /// Canonical lowercase name, as stored next to each ciphertext.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Rsa => "rsa",
            Scheme::Grasshopper => "grasshopper",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a scheme name is neither `rsa` nor `grasshopper`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownScheme(pub String);

impl fmt::Display for UnknownScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown scheme '{}': expected 'rsa' or 'grasshopper'", self.0)
    }
}

impl std::error::Error for UnknownScheme {}

impl FromStr for Scheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rsa" => Ok(Scheme::Rsa),
            "grasshopper" | "kuznechik" => Ok(Scheme::Grasshopper),
            _ => Err(UnknownScheme(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// RSA key file
// ---------------------------------------------------------------------------

/// On-disk form of an RSA keypair.
///
/// All three values are decimal strings so that any JSON consumer can read
/// them without arbitrary-precision number support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFile {
    /// Public exponent `e`.
    pub public_exponent: String,
    /// Private exponent `d`.
    pub private_exponent: String,
    /// Modulus `n = p·q`.
    pub modulus: String,
}

// ---------------------------------------------------------------------------
// Command output
// ---------------------------------------------------------------------------

/// Output of `verify-password`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutput {
    /// Whether the password matched the stored record.
    pub valid: bool,
}

/// Error body written to stdout when a command fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorOutput {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description; never contains plaintext or key material.
    pub message: String,
}

impl ErrorOutput {
    /// Construct an [`ErrorOutput`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_parses_case_insensitively() {
        assert_eq!("RSA".parse::<Scheme>().unwrap(), Scheme::Rsa);
        assert_eq!("Grasshopper".parse::<Scheme>().unwrap(), Scheme::Grasshopper);
        assert_eq!(" kuznechik ".parse::<Scheme>().unwrap(), Scheme::Grasshopper);
        assert!("aes".parse::<Scheme>().is_err());
    }

    #[test]
    fn scheme_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Scheme::Rsa).unwrap(), "\"rsa\"");
        let s: Scheme = serde_json::from_str("\"kuznechik\"").unwrap();
        assert_eq!(s, Scheme::Grasshopper);
        assert_eq!(Scheme::Grasshopper.to_string(), "grasshopper");
    }

    #[test]
    fn key_file_round_trip() {
        let kf = KeyFile {
            public_exponent: "65537".into(),
            private_exponent: "12345".into(),
            modulus: "99991".into(),
        };
        let json = serde_json::to_string(&kf).unwrap();
        let decoded: KeyFile = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, kf);
    }

    #[test]
    fn error_output_new() {
        let e = ErrorOutput::new("bad_request", "text must not be empty");
        assert_eq!(e.code, "bad_request");
        assert!(e.message.contains("empty"));
    }
}
