//! GOST primitives for stored text and passwords.
//!
//! - [`kuznechik`]: the GOST R 34.12-2015 128-bit block cipher.
//! - [`framing`]: Kuznechik over variable-length UTF-8 text.
//! - [`rsa`]: per-character textbook RSA.
//! - [`envelope`]: `base64(json([int, ...]))` storage encoding shared by both.
//! - [`stribog`]: the GOST R 34.11-2012 hash function.
//! - [`password`]: salted, iterated Stribog-512 password records.
//!
//! [`TextCipher`], [`hash_password`] and [`verify_password`] are the entry
//! points callers normally need. Everything here is synchronous, pure and free
//! of I/O.

pub mod envelope;
pub mod framing;
pub mod kuznechik;
pub mod password;
pub mod rsa;
pub mod stribog;
pub mod text_cipher;

pub use common::Scheme;
pub use kuznechik::KeySchedule;
pub use num_bigint;
pub use password::{hash_password, verify_password, PasswordHasher};
pub use rsa::RsaKeypair;
pub use text_cipher::{CryptoError, TextCipher};
