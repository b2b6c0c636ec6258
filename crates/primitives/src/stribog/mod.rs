//! Stribog, the GOST R 34.11-2012 hash function (RFC 6986).
//!
//! The 512-bit state, the checksum Σ and every message block are kept in
//! memory order, i.e. little-endian: byte 0 is the least significant byte of
//! the 512-bit integer the standard writes on paper. The published test
//! vectors are printed most-significant-byte first, so they appear
//! byte-reversed relative to what [`Stribog::finalize`] returns.

pub mod consts;

use zeroize::Zeroize;

use self::consts::{A, BLOCK_SIZE, C, TAU};
use crate::kuznechik::tables::PI;

type State = [u8; BLOCK_SIZE];

/// Output length of a [`Stribog`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestSize {
    /// 256-bit digest. Initial state is all `0x01`.
    Bits256,
    /// 512-bit digest. Initial state is all `0x00`.
    Bits512,
}

impl DigestSize {
    /// Digest length in bytes.
    pub fn byte_len(self) -> usize {
        match self {
            DigestSize::Bits256 => 32,
            DigestSize::Bits512 => 64,
        }
    }

    fn initial_state(self) -> State {
        match self {
            DigestSize::Bits256 => [0x01; BLOCK_SIZE],
            DigestSize::Bits512 => [0x00; BLOCK_SIZE],
        }
    }
}

fn xor(a: &State, b: &State) -> State {
    let mut out = [0u8; BLOCK_SIZE];
    for ((o, x), y) in out.iter_mut().zip(a).zip(b) {
        *o = x ^ y;
    }
    out
}

/// The LPS round transform: π substitution, τ transposition, then ℓ on
/// each 64-bit lane.
fn lps(data: &State) -> State {
    let mut permuted = [0u8; BLOCK_SIZE];
    for (i, &byte) in data.iter().enumerate() {
        permuted[TAU[i] as usize] = PI[byte as usize];
    }

    let mut out = [0u8; BLOCK_SIZE];
    for (lane_in, lane_out) in permuted.chunks_exact(8).zip(out.chunks_exact_mut(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(lane_in);
        let v = u64::from_le_bytes(word);

        let mut acc = 0u64;
        for (j, row) in A.iter().enumerate() {
            if (v >> (63 - j)) & 1 == 1 {
                acc ^= row;
            }
        }
        lane_out.copy_from_slice(&acc.to_le_bytes());
    }
    out
}

/// E(K, m): twelve LPSX rounds with the key evolving through C₁ … C₁₂.
fn encrypt(mut key: State, message: &State) -> State {
    let mut state = xor(&key, message);
    for constant in C.iter() {
        state = lps(&state);
        key = lps(&xor(&key, constant));
        state = xor(&state, &key);
    }
    key.zeroize();
    state
}

/// Compression gₙ(h, m) = E(LPS(h ⊕ N), m) ⊕ h ⊕ m, applied in place.
fn compress(h: &mut State, n: u64, message: &State) {
    let mut key = *h;
    for (k, nb) in key.iter_mut().zip(n.to_le_bytes()) {
        *k ^= nb;
    }
    let e = encrypt(lps(&key), message);
    for ((hb, eb), mb) in h.iter_mut().zip(e).zip(message) {
        *hb ^= eb ^ mb;
    }
}

/// Σ ← Σ + m mod 2⁵¹².
fn add_512(sigma: &mut State, block: &State) {
    let mut carry = 0u16;
    for (s, &b) in sigma.iter_mut().zip(block) {
        let sum = u16::from(*s) + u16::from(b) + carry;
        *s = sum as u8;
        carry = sum >> 8;
    }
}

/// Incremental Stribog hasher.
///
/// ```
/// use primitives::stribog::{DigestSize, Stribog};
///
/// let mut hasher = Stribog::new(DigestSize::Bits512);
/// hasher.update(b"salt");
/// hasher.update(b"password");
/// let digest = hasher.finalize();
/// assert_eq!(digest.len(), 64);
/// ```
#[derive(Clone)]
pub struct Stribog {
    size: DigestSize,
    h: State,
    sigma: State,
    /// Bits of message compressed so far. Only the low 64 bits of the
    /// standard's 512-bit counter are ever non-zero in practice.
    n: u64,
    buffer: State,
    buffered: usize,
}

impl Stribog {
    pub fn new(size: DigestSize) -> Self {
        Self {
            size,
            h: size.initial_state(),
            sigma: [0; BLOCK_SIZE],
            n: 0,
            buffer: [0; BLOCK_SIZE],
            buffered: 0,
        }
    }

    /// Absorb `data`. Complete 64-byte blocks are compressed immediately;
    /// any remainder waits in the buffer.
    pub fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let take = (BLOCK_SIZE - self.buffered).min(data.len());
            self.buffer[self.buffered..self.buffered + take].copy_from_slice(&data[..take]);
            self.buffered += take;
            data = &data[take..];

            if self.buffered == BLOCK_SIZE {
                let block = self.buffer;
                self.absorb(&block, BLOCK_SIZE * 8);
                self.buffered = 0;
            }
        }
    }

    fn absorb(&mut self, block: &State, bits: usize) {
        compress(&mut self.h, self.n, block);
        self.n = self.n.wrapping_add(bits as u64);
        add_512(&mut self.sigma, block);
    }

    /// Pad the final partial block (possibly empty) with `0x01` and zeros,
    /// fold in the length and checksum, and return the digest.
    pub fn finalize(mut self) -> Vec<u8> {
        let mut last = [0u8; BLOCK_SIZE];
        last[..self.buffered].copy_from_slice(&self.buffer[..self.buffered]);
        last[self.buffered] = 0x01;
        self.absorb(&last, self.buffered * 8);
        last.zeroize();

        let mut length = [0u8; BLOCK_SIZE];
        length[..8].copy_from_slice(&self.n.to_le_bytes());
        compress(&mut self.h, 0, &length);
        let sigma = self.sigma;
        compress(&mut self.h, 0, &sigma);

        let digest = match self.size {
            DigestSize::Bits512 => self.h.to_vec(),
            DigestSize::Bits256 => self.h[32..].to_vec(),
        };
        self.wipe();
        digest
    }

    fn wipe(&mut self) {
        self.h.zeroize();
        self.sigma.zeroize();
        self.buffer.zeroize();
        self.buffered = 0;
        self.n = 0;
    }
}

impl std::fmt::Debug for Stribog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stribog")
            .field("size", &self.size)
            .field("bits_absorbed", &self.n)
            .finish_non_exhaustive()
    }
}

/// One-shot 512-bit digest.
pub fn streebog512(data: &[u8]) -> [u8; 64] {
    let mut hasher = Stribog::new(DigestSize::Bits512);
    hasher.update(data);
    let mut out = [0u8; 64];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// One-shot 256-bit digest.
pub fn streebog256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Stribog::new(DigestSize::Bits256);
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}
