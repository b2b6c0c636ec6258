//! The two reversible text transforms behind one scheme-selected interface.

use std::sync::Arc;

use common::Scheme;
use thiserror::Error;
use tracing::debug;

use crate::envelope::{self, EnvelopeError, IntegerForm};
use crate::framing::{self, FramingError};
use crate::kuznechik::KeySchedule;
use crate::rsa::{RsaError, RsaKeypair};

#[derive(Debug, Error)]
pub enum CryptoError {
    /// The envelope is not base64, not JSON, or not a list of integers.
    #[error("ciphertext envelope could not be decoded")]
    Decode(#[source] EnvelopeError),

    /// A character's code point is not below the RSA modulus.
    #[error("character {0} does not fit below the RSA modulus")]
    KeyRange(usize),

    #[error("kuznechik framing failed")]
    Framing(#[source] FramingError),

    #[error("rsa operation failed")]
    Rsa(#[source] RsaError),
}

impl From<EnvelopeError> for CryptoError {
    fn from(e: EnvelopeError) -> Self {
        CryptoError::Decode(e)
    }
}

impl From<FramingError> for CryptoError {
    fn from(e: FramingError) -> Self {
        match e {
            FramingError::Envelope(inner) => CryptoError::Decode(inner),
            other => CryptoError::Framing(other),
        }
    }
}

impl From<RsaError> for CryptoError {
    fn from(e: RsaError) -> Self {
        match e {
            RsaError::KeyRange(i) => CryptoError::KeyRange(i),
            other => CryptoError::Rsa(other),
        }
    }
}

/// Encrypts and decrypts stored text under either [`Scheme`].
///
/// Holds an RSA keypair and a Kuznechik key schedule, both read-only for the
/// life of the value. Cloning is cheap and clones may be used from any thread.
#[derive(Debug, Clone)]
pub struct TextCipher {
    rsa: Arc<RsaKeypair>,
    grasshopper: Arc<KeySchedule>,
}

impl TextCipher {
    pub fn new(rsa: Arc<RsaKeypair>, grasshopper: KeySchedule) -> Self {
        Self {
            rsa,
            grasshopper: Arc::new(grasshopper),
        }
    }

    pub fn rsa(&self) -> &RsaKeypair {
        &self.rsa
    }

    /// Encrypt `text` into a storage envelope.
    ///
    /// # Errors
    ///
    /// [`CryptoError::KeyRange`] under RSA when a code point does not fit
    /// below the modulus.
    pub fn encrypt(&self, text: &str, scheme: Scheme) -> Result<String, CryptoError> {
        let envelope = match scheme {
            Scheme::Grasshopper => framing::encrypt_text(&self.grasshopper, text)?,
            Scheme::Rsa => {
                let values = self.rsa.encrypt(text)?;
                envelope::encode(&values, IntegerForm::Number)?
            }
        };
        debug!(scheme = %scheme, envelope_len = envelope.len(), "text encrypted");
        Ok(envelope)
    }

    /// Decrypt an envelope produced by [`encrypt`](Self::encrypt) with the
    /// same scheme.
    ///
    /// # Errors
    ///
    /// [`CryptoError::Decode`] when the envelope itself is malformed, other
    /// variants when its contents are not a valid ciphertext for `scheme`.
    pub fn decrypt(&self, envelope: &str, scheme: Scheme) -> Result<String, CryptoError> {
        let text = match scheme {
            Scheme::Grasshopper => framing::decrypt_text(&self.grasshopper, envelope)?,
            Scheme::Rsa => {
                let values = envelope::decode(envelope)?;
                self.rsa.decrypt(&values)?
            }
        };
        debug!(scheme = %scheme, "text decrypted");
        Ok(text)
    }
}
