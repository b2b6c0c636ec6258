//! Kuznechik over variable-length text.
//!
//! Text is UTF-8 encoded, split into 16-byte blocks with the last one
//! zero-padded, and each block is encrypted independently as a big-endian
//! integer. Decryption strips *every* trailing zero byte, so text that itself
//! ends in NUL does not survive the round trip. Existing ciphertext depends on
//! exactly this layout.

use num_bigint::BigUint;
use num_traits::ToPrimitive;
use thiserror::Error;
use tracing::debug;

use crate::envelope::{self, EnvelopeError, IntegerForm};
use crate::kuznechik::{Block, KeySchedule, BLOCK_SIZE};

#[derive(Debug, Error)]
pub enum FramingError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// A decoded integer does not fit in one 128-bit block.
    #[error("envelope element {0} does not fit in a 128-bit block")]
    BlockOutOfRange(usize),
}

/// Split `text` into zero-padded blocks.
pub fn text_to_blocks(text: &str) -> Vec<Block> {
    text.as_bytes()
        .chunks(BLOCK_SIZE)
        .map(|chunk| {
            let mut bytes = [0u8; BLOCK_SIZE];
            bytes[..chunk.len()].copy_from_slice(chunk);
            Block::from_be_bytes(bytes)
        })
        .collect()
}

/// Join blocks, strip trailing zero bytes, and decode lossily.
pub fn blocks_to_text(blocks: &[Block]) -> String {
    let mut bytes: Vec<u8> = blocks.iter().flat_map(|b| b.to_be_bytes()).collect();
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    bytes.truncate(end);
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Encrypt `text` into a storage envelope.
///
/// # Errors
///
/// Only fails if the envelope cannot be serialised.
pub fn encrypt_text(keys: &KeySchedule, text: &str) -> Result<String, FramingError> {
    let values: Vec<BigUint> = text_to_blocks(text)
        .into_iter()
        .map(|block| BigUint::from(keys.encrypt_block(block)))
        .collect();
    debug!(blocks = values.len(), "kuznechik text encrypted");
    Ok(envelope::encode(&values, IntegerForm::DecimalString)?)
}

/// Decrypt an envelope produced by [`encrypt_text`].
///
/// Invalid UTF-8 in the recovered bytes is replaced with U+FFFD rather than
/// rejected.
///
/// # Errors
///
/// [`FramingError::Envelope`] if the envelope cannot be decoded and
/// [`FramingError::BlockOutOfRange`] if any integer is ≥ 2¹²⁸.
pub fn decrypt_text(keys: &KeySchedule, envelope: &str) -> Result<String, FramingError> {
    let values = envelope::decode(envelope)?;
    let blocks = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.to_u128()
                .map(|block| keys.decrypt_block(block))
                .ok_or(FramingError::BlockOutOfRange(i))
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!(blocks = blocks.len(), "kuznechik text decrypted");
    Ok(blocks_to_text(&blocks))
}
