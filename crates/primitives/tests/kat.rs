//! Known-answer tests through the public API.

use hex_literal::hex;
use primitives::{
    envelope,
    kuznechik::{KeySchedule, DEFAULT_KEY, DEFAULT_KEY_HEX},
    password::{PasswordHasher, PasswordRecord, ALGORITHM_TAG},
    stribog::{streebog256, streebog512},
};

const GOST_M1: [u8; 63] = hex!(
    "323130393837363534333231303938373635343332313039383736353433323130393837363534333231303938373635343332313039383736353433323130"
);

fn reversed(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

#[test]
fn kuznechik_gost_example() {
    let keys = KeySchedule::from_hex(DEFAULT_KEY_HEX).unwrap();
    let pt = u128::from_be_bytes(hex!("1122334455667700ffeeddccbbaa9988"));
    let ct = u128::from_be_bytes(hex!("7f679d90bebc24305a468d42b9d4edcd"));
    assert_eq!(keys.encrypt_block(pt), ct);
    assert_eq!(keys.decrypt_block(ct), pt);
}

#[test]
fn stribog_gost_example_m1() {
    let message = reversed(&GOST_M1);
    assert_eq!(
        streebog512(&message).to_vec(),
        reversed(&hex!(
            "486f64c1917879417fef082b3381a4e211c324f074654c38823a7b76f830ad00fa1fbae42b1285c0352f227524bc9ab16254288dd6863dccd5b9f54a1ad0541b"
        ))
    );
    assert_eq!(
        streebog256(&message).to_vec(),
        reversed(&hex!("00557be5e584fd52a449b16b0251d05d27f94ab76cbaa6da890b59d8ef1e159d"))
    );
}

#[test]
fn kuznechik_reference_envelope_decrypts() {
    let env = "WyIxMzQzMTY0MjI2NDk1MTcwNzg0MDcyNTQzMzg3OTE0MTUyNTE4NDkiLCAiMTY1MDkyMDk2MjUxNzc0Nzg0MjM0NTI4MzY5MjE2ODc2MTkyMTgxIl0=";
    let keys = KeySchedule::new(&DEFAULT_KEY);
    assert_eq!(envelope::decode(env).unwrap().len(), 2);
    assert_eq!(
        primitives::framing::decrypt_text(&keys, env).unwrap(),
        "hello, grasshopper"
    );
}

#[test]
fn password_record_fixed_salt() {
    let salt: Vec<u8> = (0u8..16).collect();
    let record = PasswordHasher::new(3)
        .unwrap()
        .hash_with_salt("correct horse", &salt);
    let parsed: PasswordRecord = record.parse().unwrap();
    assert!(record.starts_with(ALGORITHM_TAG));
    assert_eq!(parsed.iterations, 3);
    assert_eq!(
        parsed.digest,
        hex!(
            "c3ca18602a9647787bea36d51c76a979c39ecc20eddeba07ee8654f35da0717115c8696bc61d8d9ab40f6a3478aa3dbde33c251d90ee82f207445a1e78e9a0f5"
        )
    );
    assert!(primitives::verify_password("correct horse", &record));
}
