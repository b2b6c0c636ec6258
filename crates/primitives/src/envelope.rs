//! Storage envelope: an ordered list of arbitrary-precision integers,
//! JSON-encoded and then base64-encoded.
//!
//! # Format
//!
//! ```text
//! base64(json([int, int, ...]))
//! ```
//!
//! Kuznechik ciphertexts have always been stored with each integer as a
//! decimal *string* (`["1343…", "1650…"]`), RSA ciphertexts as JSON
//! *numbers*. Both forms are accepted on decode regardless of scheme.

use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use num_bigint::BigUint;
use serde_json::{Number, Value};
use thiserror::Error;

/// How integers are written into the JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerForm {
    /// Bare JSON numbers: `[123, 456]`.
    Number,
    /// Decimal strings: `["123", "456"]`.
    DecimalString,
}

/// Errors produced while decoding an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The envelope is not valid base64.
    #[error("envelope is not valid base64")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes are not valid JSON.
    #[error("envelope payload is not valid JSON")]
    Json(#[from] serde_json::Error),

    /// The JSON payload is not an array.
    #[error("envelope payload must be a JSON array")]
    NotAnArray,

    /// An array element is not a non-negative integer.
    #[error("envelope element {0} is not a non-negative integer")]
    InvalidInteger(usize),
}

/// Encode `values` as `base64(json([...]))`.
///
/// # Errors
///
/// Returns [`EnvelopeError::Json`] if serialisation fails.
pub fn encode(values: &[BigUint], form: IntegerForm) -> Result<String, EnvelopeError> {
    let items = values
        .iter()
        .map(|v| match form {
            IntegerForm::Number => Number::from_str(&v.to_str_radix(10)).map(Value::Number),
            IntegerForm::DecimalString => Ok(Value::String(v.to_str_radix(10))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let json = serde_json::to_vec(&Value::Array(items))?;
    Ok(STANDARD.encode(json))
}

/// Decode an envelope back into the exact integer sequence it was built from.
///
/// # Errors
///
/// Returns an [`EnvelopeError`] describing the first layer that failed.
pub fn decode(envelope: &str) -> Result<Vec<BigUint>, EnvelopeError> {
    let json = STANDARD.decode(envelope.trim())?;
    let value: Value = serde_json::from_slice(&json)?;
    let Value::Array(items) = value else {
        return Err(EnvelopeError::NotAnArray);
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let digits = match item {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                _ => return Err(EnvelopeError::InvalidInteger(i)),
            };
            parse_decimal(&digits).ok_or(EnvelopeError::InvalidInteger(i))
        })
        .collect()
}

fn parse_decimal(digits: &str) -> Option<BigUint> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigUint::parse_bytes(digits.as_bytes(), 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(s: &str) -> BigUint {
        BigUint::parse_bytes(s.as_bytes(), 10).unwrap()
    }

    #[test]
    fn number_form_keeps_precision() {
        let values = vec![big("340282366920938463463374607431768211455"), big("7")];
        let env = encode(&values, IntegerForm::Number).unwrap();
        let json = STANDARD.decode(&env).unwrap();
        assert_eq!(
            std::str::from_utf8(&json).unwrap(),
            "[340282366920938463463374607431768211455,7]"
        );
        assert_eq!(decode(&env).unwrap(), values);
    }

    #[test]
    fn string_form_is_quoted() {
        let env = encode(&[big("42")], IntegerForm::DecimalString).unwrap();
        let json = STANDARD.decode(&env).unwrap();
        assert_eq!(std::str::from_utf8(&json).unwrap(), "[\"42\"]");
    }

    #[test]
    fn decode_accepts_spaced_json() {
        let env = STANDARD.encode(b"[\"1\", \"22\", 333]");
        assert_eq!(decode(&env).unwrap(), vec![big("1"), big("22"), big("333")]);
    }

    #[test]
    fn empty_list() {
        let env = encode(&[], IntegerForm::Number).unwrap();
        assert!(decode(&env).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(matches!(decode("!!!not base64"), Err(EnvelopeError::Base64(_))));
    }

    #[test]
    fn rejects_bad_json() {
        let env = STANDARD.encode(b"[1, 2");
        assert!(matches!(decode(&env), Err(EnvelopeError::Json(_))));
    }

    #[test]
    fn rejects_non_array() {
        let env = STANDARD.encode(b"{\"a\": 1}");
        assert!(matches!(decode(&env), Err(EnvelopeError::NotAnArray)));
    }

    #[test]
    fn rejects_non_integers() {
        for payload in [&b"[-1]"[..], b"[1.5]", b"[\"12a\"]", b"[null]", b"[\"\"]", b"[1e3]"] {
            let env = STANDARD.encode(payload);
            assert!(
                matches!(decode(&env), Err(EnvelopeError::InvalidInteger(0))),
                "payload {:?} should be rejected",
                std::str::from_utf8(payload)
            );
        }
    }
}
