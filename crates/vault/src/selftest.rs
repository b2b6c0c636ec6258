//! Known-answer checks runnable on a deployed binary.

use primitives::{
    framing,
    kuznechik::{KeySchedule, DEFAULT_KEY},
    password::PasswordHasher,
    rsa::{RsaKeypair, MIN_KEY_BITS},
    stribog::{streebog256, streebog512},
};
use serde::Serialize;

const GOST_M1: &str = "323130393837363534333231303938373635343332313039383736353433323130393837363534333231303938373635343332313039383736353433323130";
const GOST_M1_512: &str = "486f64c1917879417fef082b3381a4e211c324f074654c38823a7b76f830ad00fa1fbae42b1285c0352f227524bc9ab16254288dd6863dccd5b9f54a1ad0541b";
const GOST_M1_256: &str = "00557be5e584fd52a449b16b0251d05d27f94ab76cbaa6da890b59d8ef1e159d";
const REFERENCE_ENVELOPE: &str = "WyIxMzQzMTY0MjI2NDk1MTcwNzg0MDcyNTQzMzg3OTE0MTUyNTE4NDkiLCAiMTY1MDkyMDk2MjUxNzc0Nzg0MjM0NTI4MzY5MjE2ODc2MTkyMTgxIl0=";
const PASSWORD_RECORD: &str = "streebog512$3$000102030405060708090a0b0c0d0e0f$c3ca18602a9647787bea36d51c76a979c39ecc20eddeba07ee8654f35da0717115c8696bc61d8d9ab40f6a3478aa3dbde33c251d90ee82f207445a1e78e9a0f5";

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub name: &'static str,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub passed: bool,
    pub checks: Vec<Check>,
}

/// Run every check. Includes generating one minimum-size RSA keypair.
pub fn run() -> Report {
    let table: [(&'static str, fn() -> bool); 6] = [
        ("kuznechik_block", kuznechik_block),
        ("stribog_512", || stribog_m1(GOST_M1_512, |m| streebog512(m).to_vec())),
        ("stribog_256", || stribog_m1(GOST_M1_256, |m| streebog256(m).to_vec())),
        ("kuznechik_reference_envelope", reference_envelope),
        ("password_record", password_record),
        ("rsa_round_trip", rsa_round_trip),
    ];
    let checks: Vec<Check> = table
        .into_iter()
        .map(|(name, check)| Check {
            name,
            passed: check(),
        })
        .collect();

    Report {
        passed: checks.iter().all(|c| c.passed),
        checks,
    }
}

fn kuznechik_block() -> bool {
    let keys = KeySchedule::new(&DEFAULT_KEY);
    let pt = 0x1122334455667700ffeeddccbbaa9988u128;
    let ct = 0x7f679d90bebc24305a468d42b9d4edcdu128;
    keys.encrypt_block(pt) == ct && keys.decrypt_block(ct) == pt
}

fn reversed_hex(s: &str) -> Option<Vec<u8>> {
    let mut bytes = hex::decode(s).ok()?;
    bytes.reverse();
    Some(bytes)
}

fn stribog_m1(expected: &str, digest: impl Fn(&[u8]) -> Vec<u8>) -> bool {
    match (reversed_hex(GOST_M1), reversed_hex(expected)) {
        (Some(message), Some(expected)) => digest(&message) == expected,
        _ => false,
    }
}

fn reference_envelope() -> bool {
    let keys = KeySchedule::new(&DEFAULT_KEY);
    matches!(
        framing::decrypt_text(&keys, REFERENCE_ENVELOPE).as_deref(),
        Ok("hello, grasshopper")
    )
}

fn password_record() -> bool {
    let Ok(hasher) = PasswordHasher::new(3) else {
        return false;
    };
    let salt: Vec<u8> = (0u8..16).collect();
    hasher.hash_with_salt("correct horse", &salt) == PASSWORD_RECORD
        && hasher.verify("correct horse", PASSWORD_RECORD)
        && !hasher.verify("wrong horse", PASSWORD_RECORD)
}

fn rsa_round_trip() -> bool {
    let Ok(key) = RsaKeypair::generate(MIN_KEY_BITS) else {
        return false;
    };
    let text = "GOST R 34.12-2015";
    key.encrypt(text)
        .and_then(|ct| key.decrypt(&ct))
        .is_ok_and(|pt| pt == text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_checks_pass() {
        let report = run();
        for check in &report.checks {
            assert!(check.passed, "{} failed", check.name);
        }
        assert!(report.passed);
        assert_eq!(report.checks.len(), 6);
    }
}
