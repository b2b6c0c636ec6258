//! Textbook RSA applied one Unicode code point at a time.
//!
//! Each character `m` becomes `mᵉ mod n` with no padding, so equal characters
//! produce equal ciphertext integers and character frequencies are visible.
//! Stored ciphertext depends on this exact behaviour; do not add padding here.

use std::fmt;

use common::protocol::KeyFile;
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use thiserror::Error;
use tracing::{debug, info};

/// Fixed public exponent F₄.
pub const PUBLIC_EXPONENT: u32 = 65_537;

/// Smallest modulus [`RsaKeypair::generate`] will produce.
pub const MIN_KEY_BITS: u64 = 512;

/// Miller–Rabin witnesses tried per candidate.
const MILLER_RABIN_ROUNDS: usize = 40;

/// Emit a progress event after this many characters.
const PROGRESS_EVERY: usize = 100;

const SMALL_PRIMES: [u32; 54] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RsaError {
    #[error("RSA modulus must be at least 512 bits, requested {0}")]
    KeySize(u64),

    /// The character at this position has a code point ≥ n.
    #[error("character {0} does not fit below the RSA modulus")]
    KeyRange(usize),

    /// The ciphertext element at this position does not decrypt to a
    /// Unicode scalar value.
    #[error("ciphertext element {0} does not decrypt to a valid character")]
    InvalidCodePoint(usize),

    #[error("invalid RSA key: {0}")]
    InvalidKey(&'static str),
}

/// Public half of an [`RsaKeypair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub e: BigUint,
    pub n: BigUint,
}

/// An RSA keypair. Immutable once built; share it behind an `Arc`.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaKeypair {
    e: BigUint,
    d: BigUint,
    n: BigUint,
}

impl RsaKeypair {
    /// Generate a fresh keypair with an OS-seeded RNG.
    ///
    /// # Errors
    ///
    /// [`RsaError::KeySize`] if `bits` is below [`MIN_KEY_BITS`].
    pub fn generate(bits: u64) -> Result<Self, RsaError> {
        Self::generate_with_rng(&mut OsRng, bits)
    }

    /// Generate a keypair from the supplied RNG.
    ///
    /// Both primes have their top two bits set so that `n` is exactly `bits`
    /// long. Candidates are regenerated until `p ≠ q` and `e` is coprime to
    /// λ(n) = lcm(p − 1, q − 1).
    ///
    /// # Errors
    ///
    /// [`RsaError::KeySize`] if `bits` is below [`MIN_KEY_BITS`].
    pub fn generate_with_rng<R: RngCore + CryptoRng>(
        rng: &mut R,
        bits: u64,
    ) -> Result<Self, RsaError> {
        if bits < MIN_KEY_BITS {
            return Err(RsaError::KeySize(bits));
        }

        let e = BigUint::from(PUBLIC_EXPONENT);
        let p_bits = bits / 2;
        let q_bits = bits - p_bits;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let p = generate_prime(rng, p_bits);
            let q = generate_prime(rng, q_bits);
            if p == q {
                continue;
            }

            let one = BigUint::one();
            let lambda = (&p - &one).lcm(&(&q - &one));
            let Some(d) = mod_inverse(&e, &lambda) else {
                continue;
            };

            let n = p * q;
            info!(bits = n.bits(), attempts, "rsa keypair generated");
            return Ok(Self { e, d, n });
        }
    }

    /// Rebuild a keypair from stored components.
    ///
    /// # Errors
    ///
    /// [`RsaError::InvalidKey`] if any component is zero or the modulus cannot
    /// hold every Unicode code point.
    pub fn from_parts(e: BigUint, d: BigUint, n: BigUint) -> Result<Self, RsaError> {
        if e.is_zero() || d.is_zero() {
            return Err(RsaError::InvalidKey("exponents must be non-zero"));
        }
        if n <= BigUint::from(u32::from(char::MAX)) {
            return Err(RsaError::InvalidKey(
                "modulus must exceed the Unicode code point range",
            ));
        }
        Ok(Self { e, d, n })
    }

    /// Parse the decimal components of a [`KeyFile`].
    ///
    /// # Errors
    ///
    /// [`RsaError::InvalidKey`] if a component is not a decimal integer or
    /// the key fails [`from_parts`](Self::from_parts).
    pub fn from_key_file(file: &KeyFile) -> Result<Self, RsaError> {
        let parse = |s: &str, what: &'static str| {
            let s = s.trim();
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(RsaError::InvalidKey(what));
            }
            BigUint::parse_bytes(s.as_bytes(), 10).ok_or(RsaError::InvalidKey(what))
        };
        Self::from_parts(
            parse(&file.public_exponent, "public exponent is not a decimal integer")?,
            parse(&file.private_exponent, "private exponent is not a decimal integer")?,
            parse(&file.modulus, "modulus is not a decimal integer")?,
        )
    }

    pub fn to_key_file(&self) -> KeyFile {
        KeyFile {
            public_exponent: self.e.to_str_radix(10),
            private_exponent: self.d.to_str_radix(10),
            modulus: self.n.to_str_radix(10),
        }
    }

    pub fn public(&self) -> RsaPublicKey {
        RsaPublicKey {
            e: self.e.clone(),
            n: self.n.clone(),
        }
    }

    /// Bit length of the modulus.
    pub fn bits(&self) -> u64 {
        self.n.bits()
    }

    /// Encrypt each character of `text` independently.
    ///
    /// # Errors
    ///
    /// [`RsaError::KeyRange`] if a code point is not below the modulus.
    pub fn encrypt(&self, text: &str) -> Result<Vec<BigUint>, RsaError> {
        let total = text.chars().count();
        let mut out = Vec::with_capacity(total);

        for (i, ch) in text.chars().enumerate() {
            let m = BigUint::from(u32::from(ch));
            if m >= self.n {
                return Err(RsaError::KeyRange(i));
            }
            out.push(m.modpow(&self.e, &self.n));

            if (i + 1) % PROGRESS_EVERY == 0 {
                debug!(processed = i + 1, total, "rsa encryption progress");
            }
        }
        Ok(out)
    }

    /// Decrypt a sequence produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// [`RsaError::InvalidCodePoint`] if an element decrypts to a surrogate or
    /// a value above U+10FFFF.
    pub fn decrypt(&self, ciphertext: &[BigUint]) -> Result<String, RsaError> {
        let total = ciphertext.len();
        let mut out = String::with_capacity(total);

        for (i, c) in ciphertext.iter().enumerate() {
            let m = c.modpow(&self.d, &self.n);
            let ch = m
                .to_u32()
                .and_then(char::from_u32)
                .ok_or(RsaError::InvalidCodePoint(i))?;
            out.push(ch);

            if (i + 1) % PROGRESS_EVERY == 0 {
                debug!(processed = i + 1, total, "rsa decryption progress");
            }
        }
        Ok(out)
    }
}

impl fmt::Debug for RsaKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeypair")
            .field("bits", &self.n.bits())
            .field("e", &self.e)
            .finish_non_exhaustive()
    }
}

/// Random prime of exactly `bits` bits with the top two bits set.
fn generate_prime<R: RngCore + CryptoRng>(rng: &mut R, bits: u64) -> BigUint {
    let one = BigUint::one();
    let mask = (&one << (bits - 1)) | (&one << (bits - 2)) | &one;
    loop {
        let candidate = rng.gen_biguint(bits) | &mask;
        if is_probable_prime(rng, &candidate) {
            return candidate;
        }
    }
}

/// Trial division by small primes, then Miller–Rabin with random bases.
pub(crate) fn is_probable_prime<R: RngCore + CryptoRng>(rng: &mut R, n: &BigUint) -> bool {
    let two = BigUint::from(2u32);
    if n < &two {
        return false;
    }
    for &p in SMALL_PRIMES.iter() {
        let p = BigUint::from(p);
        if n == &p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }

    let n_minus_one = n - 1u32;
    let Some(s) = n_minus_one.trailing_zeros() else {
        return false;
    };
    let d = &n_minus_one >> s;

    'witness: for _ in 0..MILLER_RABIN_ROUNDS {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// `a⁻¹ mod m`, or `None` when `gcd(a, m) ≠ 1`.
fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    let a = BigInt::from(a.clone());
    let m = BigInt::from(m.clone());
    let egcd = a.extended_gcd(&m);
    if !egcd.gcd.is_one() {
        return None;
    }
    egcd.x.mod_floor(&m).to_biguint()
}
