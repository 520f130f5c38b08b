//! Property tests for challenge parsing and response computation.
//!
//! # Invariants
//!
//! - parse_field, parse_qop and Challenge::parse never panic on any input
//! - a consumed challenge always yields a header, never a panic
//! - the response is lowercase hex of the primitive's width
//! - client nonces have the configured length and use the 16-symbol alphabet

use digest_fetch::{
    make_nonce, parse_field, parse_qop, Algorithm, Challenge, Credentials, DigestSession,
    NONCE_ALPHABET, SUPPORTED_ALGORITHMS,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::str::FromStr;

/// Challenge-shaped strings with hostile values
fn hostile_challenge() -> impl Strategy<Value = String> {
    let value = prop_oneof![
        Just("\"unterminated".to_string()),
        Just("\"a, b\"".to_string()),
        Just("\"\"".to_string()),
        Just("".to_string()),
        Just("x\r\nEvil: 1".to_string()),
        Just("tëst日本語".to_string()),
        "[ -~]{0,40}",
    ];
    let name = prop_oneof![
        Just("realm"),
        Just("nonce"),
        Just("cnonce"),
        Just("qop"),
        Just("opaque"),
        Just("algorithm"),
        Just("REALM"),
    ];
    prop::collection::vec((name, value), 0..8).prop_map(|fields| {
        let body: Vec<String> = fields
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("Digest {}", body.join(", "))
    })
}

proptest! {
    #[test]
    fn parse_field_never_panics(raw in ".*", field in "[a-zA-Z]{1,10}", trim in any::<bool>()) {
        let _ = parse_field(&raw, &field, trim);
        let _ = parse_qop(&raw);
        let _ = Challenge::parse(&raw);
    }

    #[test]
    fn parsed_values_are_substrings(raw in hostile_challenge()) {
        if let Some(nonce) = parse_field(&raw, "nonce", false) {
            prop_assert!(raw.contains(&nonce));
            prop_assert!(!nonce.contains(',') || nonce.starts_with('"'));
        }
    }

    #[test]
    fn response_has_primitive_width(
        raw in hostile_challenge(),
        algorithm in prop::sample::select(SUPPORTED_ALGORITHMS.to_vec()),
        method in "[A-Za-z]{0,8}",
        path in "/[a-z0-9/?=&]{0,20}",
        seed in any::<u64>(),
    ) {
        let algorithm = Algorithm::from_str(algorithm).unwrap();
        let mut session = DigestSession::new(Credentials::new("test", "test"), algorithm)
            .with_rng(StdRng::seed_from_u64(seed));
        session.consume_challenge(Some(&raw));
        prop_assert!(session.is_authenticated());

        let header = session.build_authorization(&path, &method);
        let width = if algorithm.algo == digest_fetch::AlgorithmType::MD5 { 32 } else { 64 };
        prop_assert_eq!(header.response.len(), width);
        prop_assert!(header.response.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
        let value = header.to_string();
        prop_assert!(value.starts_with("Digest username=\"test\""));
    }

    #[test]
    fn nonce_alphabet_and_length(size in 1usize..128, seed in any::<u64>()) {
        let nonce = make_nonce(&mut StdRng::seed_from_u64(seed), size);
        prop_assert_eq!(nonce.len(), size);
        prop_assert!(nonce.bytes().all(|b| NONCE_ALPHABET.contains(&b)));
    }
}

#[test]
fn nonces_do_not_collide() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut seen = std::collections::HashSet::new();
    for _ in 0..10_000 {
        assert!(seen.insert(make_nonce(&mut rng, 32)));
    }
}
