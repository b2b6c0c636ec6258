//! Single-block Kuznechik: the S, L and R transforms on `u128` and the
//! ten-key schedule.
//!
//! A block is the big-endian integer reading of its 16 bytes, so byte 0 of
//! the wire form is bits 127..120 of the [`Block`].

use std::fmt;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::tables::{gf_mul, LINEAR_COEFFS, PI, PI_INV};

/// One 128-bit cipher block.
pub type Block = u128;

/// Block length in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Master key length in bytes.
pub const KEY_SIZE: usize = 32;

/// Number of round keys produced by the schedule.
pub const ROUND_KEYS: usize = 10;

/// Errors raised when building a key schedule from external input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The key string is not valid hexadecimal.
    #[error("master key is not valid hex")]
    InvalidHex,

    /// The decoded key is not [`KEY_SIZE`] bytes.
    #[error("master key must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

fn substitute(x: Block, table: &[u8; 256]) -> Block {
    let mut bytes = x.to_be_bytes();
    for b in bytes.iter_mut() {
        *b = table[*b as usize];
    }
    Block::from_be_bytes(bytes)
}

/// S: byte-wise substitution through π.
pub fn s(x: Block) -> Block {
    substitute(x, &PI)
}

/// S⁻¹: byte-wise substitution through π⁻¹.
pub fn s_inv(x: Block) -> Block {
    substitute(x, &PI_INV)
}

/// ℓ: GF(2⁸) weighted sum of the 16 bytes of `x`.
pub fn linear_functional(x: Block) -> u8 {
    LINEAR_COEFFS
        .iter()
        .rev()
        .enumerate()
        .fold(0, |acc, (i, &c)| acc ^ gf_mul((x >> (8 * i)) as u8, c))
}

/// R: one linear-feedback step. The low byte drops out and ℓ(x) enters at the top.
pub fn r(x: Block) -> Block {
    (Block::from(linear_functional(x)) << 120) | (x >> 8)
}

/// R⁻¹: exact inverse of [`r`].
pub fn r_inv(x: Block) -> Block {
    let shifted = x << 8;
    shifted | Block::from(linear_functional(shifted | (x >> 120)))
}

/// L: sixteen applications of [`r`].
pub fn l(mut x: Block) -> Block {
    for _ in 0..16 {
        x = r(x);
    }
    x
}

/// L⁻¹: sixteen applications of [`r_inv`].
pub fn l_inv(mut x: Block) -> Block {
    for _ in 0..16 {
        x = r_inv(x);
    }
    x
}

/// Round keys derived from one 256-bit master key.
///
/// Built once per key and shared read-only; the keys are wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeySchedule {
    round_keys: [Block; ROUND_KEYS],
}

impl KeySchedule {
    /// Expand `master_key` into ten round keys.
    ///
    /// The two halves of the key are K₁ and K₂. Four rounds of eight Feistel
    /// steps, keyed by the iteration constants Cᵢ = L(i), produce each
    /// following pair.
    pub fn new(master_key: &[u8; KEY_SIZE]) -> Self {
        let mut half = [0u8; BLOCK_SIZE];
        half.copy_from_slice(&master_key[..BLOCK_SIZE]);
        let mut left = Block::from_be_bytes(half);
        half.copy_from_slice(&master_key[BLOCK_SIZE..]);
        let mut right = Block::from_be_bytes(half);
        half.zeroize();

        let mut round_keys = [0; ROUND_KEYS];
        round_keys[0] = left;
        round_keys[1] = right;

        for outer in 0..4 {
            for inner in 0..8 {
                let constant = l((8 * outer + inner + 1) as Block);
                let next = l(s(left ^ constant)) ^ right;
                right = left;
                left = next;
            }
            round_keys[2 * outer + 2] = left;
            round_keys[2 * outer + 3] = right;
        }

        left.zeroize();
        right.zeroize();
        Self { round_keys }
    }

    /// Parse a 64-digit hex master key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidHex`] or [`KeyError::InvalidLength`].
    pub fn from_hex(key: &str) -> Result<Self, KeyError> {
        let mut bytes = hex::decode(key.trim()).map_err(|_| KeyError::InvalidHex)?;
        if bytes.len() != KEY_SIZE {
            let len = bytes.len();
            bytes.zeroize();
            return Err(KeyError::InvalidLength(len));
        }
        let mut master = [0u8; KEY_SIZE];
        master.copy_from_slice(&bytes);
        bytes.zeroize();
        let schedule = Self::new(&master);
        master.zeroize();
        Ok(schedule)
    }

    /// The ten round keys, K₁ first.
    pub fn round_keys(&self) -> &[Block; ROUND_KEYS] {
        &self.round_keys
    }

    /// Nine rounds of X → L(S(X ⊕ Kᵢ)) followed by a final whitening with K₁₀.
    pub fn encrypt_block(&self, block: Block) -> Block {
        let mut x = block;
        for key in &self.round_keys[..ROUND_KEYS - 1] {
            x = l(s(x ^ key));
        }
        x ^ self.round_keys[ROUND_KEYS - 1]
    }

    /// Mirror of [`encrypt_block`](Self::encrypt_block): keys K₁₀ … K₂ in
    /// reverse, X → S⁻¹(L⁻¹(X ⊕ Kᵢ)), then whitening with K₁.
    pub fn decrypt_block(&self, block: Block) -> Block {
        let mut x = block;
        for key in self.round_keys[1..].iter().rev() {
            x = s_inv(l_inv(x ^ key));
        }
        x ^ self.round_keys[0]
    }
}

impl fmt::Debug for KeySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeySchedule([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const KEY: [u8; KEY_SIZE] =
        hex!("8899aabbccddeeff0011223344556677fedcba98765432100123456789abcdef");

    #[test]
    fn s_matches_rfc_7801_examples() {
        assert_eq!(
            s(0xffeeddccbbaa99881122334455667700),
            0xb66cd8887d38e8d77765aeea0c9a7efc
        );
        assert_eq!(
            s(0xb66cd8887d38e8d77765aeea0c9a7efc),
            0x559d8dd7bd06cbfe7e7b262523280d39
        );
    }

    #[test]
    fn r_matches_rfc_7801_examples() {
        assert_eq!(
            r(0x00000000000000000000000000000100),
            0x94000000000000000000000000000001
        );
        assert_eq!(
            r(0x94000000000000000000000000000001),
            0xa5940000000000000000000000000000
        );
    }

    #[test]
    fn l_matches_rfc_7801_example() {
        assert_eq!(
            l(0x64a59400000000000000000000000000),
            0xd456584dd0e3e84cc3166e4b7fa2890d
        );
    }

    #[test]
    fn r_inv_undoes_r() {
        for x in [0u128, 1, u128::MAX, 0x0123456789abcdef0011223344556677] {
            assert_eq!(r_inv(r(x)), x);
            assert_eq!(l_inv(l(x)), x);
        }
    }

    #[test]
    fn round_keys_match_rfc_7801() {
        let keys = KeySchedule::new(&KEY);
        let expected: [Block; ROUND_KEYS] = [
            0x8899aabbccddeeff0011223344556677,
            0xfedcba98765432100123456789abcdef,
            0xdb31485315694343228d6aef8cc78c44,
            0x3d4553d8e9cfec6815ebadc40a9ffd04,
            0x57646468c44a5e28d3e59246f429f1ac,
            0xbd079435165c6432b532e82834da581b,
            0x51e640757e8745de705727265a0098b1,
            0x5a7925017b9fdd3ed72a91a22286f984,
            0xbb44e25378c73123a5f32f73cdb6e517,
            0x72e9dd7416bcf45b755dbaa88e4a4043,
        ];
        assert_eq!(keys.round_keys(), &expected);
    }

    #[test]
    fn known_answer_block() {
        let keys = KeySchedule::new(&KEY);
        let pt: Block = 0x1122334455667700ffeeddccbbaa9988;
        let ct: Block = 0x7f679d90bebc24305a468d42b9d4edcd;
        assert_eq!(keys.encrypt_block(pt), ct);
        assert_eq!(keys.decrypt_block(ct), pt);
    }

    #[test]
    fn from_hex_accepts_standard_key() {
        let from_hex = KeySchedule::from_hex(
            "8899aabbccddeeff0011223344556677fedcba98765432100123456789abcdef",
        )
        .unwrap();
        assert_eq!(from_hex.round_keys(), KeySchedule::new(&KEY).round_keys());
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert_eq!(KeySchedule::from_hex("zz").unwrap_err(), KeyError::InvalidHex);
        assert_eq!(
            KeySchedule::from_hex("00112233").unwrap_err(),
            KeyError::InvalidLength(4)
        );
    }

    #[test]
    fn debug_is_redacted() {
        let keys = KeySchedule::new(&KEY);
        assert!(format!("{keys:?}").contains("REDACTED"));
    }
}
