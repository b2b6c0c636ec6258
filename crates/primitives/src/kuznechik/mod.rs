//! Kuznechik ("Grasshopper"), the GOST R 34.12-2015 128-bit block cipher.
//!
//! Reference: RFC 7801. Only the raw block transform lives here; variable
//! length text is handled by [`crate::framing`].

pub mod cipher;
pub mod tables;

pub use cipher::{Block, KeyError, KeySchedule, BLOCK_SIZE, KEY_SIZE, ROUND_KEYS};

/// Example master key from GOST R 34.12-2015 / RFC 7801 §5.4.
///
/// Deployments that never configured their own key stored ciphertext under
/// this one, so it remains the default.
pub const DEFAULT_KEY_HEX: &str =
    "8899aabbccddeeff0011223344556677fedcba98765432100123456789abcdef";

/// [`DEFAULT_KEY_HEX`] as raw bytes.
pub const DEFAULT_KEY: [u8; KEY_SIZE] = [
    0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77,
    0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54, 0x32, 0x10, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_key_forms_agree() {
        assert_eq!(hex::encode(DEFAULT_KEY), DEFAULT_KEY_HEX);
    }

    #[test]
    fn zero_key_zero_block_roundtrip() {
        let keys = KeySchedule::new(&[0u8; KEY_SIZE]);
        let ct = keys.encrypt_block(0);
        assert_ne!(ct, 0);
        assert_eq!(keys.decrypt_block(ct), 0);
    }
}
