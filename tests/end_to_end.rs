// SPDX-License-Identifier: MPL-2.0

use assert_matches::assert_matches;
use prio_encoder::{
    encode,
    encrypt::{PrivateKey, PublicKey},
    packet::ServerId,
    share::reconstruct_shares,
    verify::{is_valid_share, Verifier, VerifyError},
    EncodeError, MeasurementSet, MetricSchema,
};
use std::sync::Once;

static INIT: Once = Once::new();

fn install_tracing_subscriber() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn measurements(values: [u64; 3]) -> MeasurementSet {
    MetricSchema::browser_default()
        .metrics()
        .iter()
        .zip(values)
        .map(|(m, v)| (m.name.clone(), v))
        .collect()
}

#[test]
fn round_trip() {
    install_tracing_subscriber();
    let priv_key_a = PrivateKey::generate().unwrap();
    let priv_key_b = PrivateKey::generate().unwrap();
    let pub_key_a = PublicKey::from(&priv_key_a);
    let pub_key_b = PublicKey::from(&priv_key_b);

    let packet = encode(
        b"2021-01-01",
        pub_key_a.as_bytes(),
        pub_key_b.as_bytes(),
        &measurements([1, 0, 1]),
    )
    .unwrap();

    let mut server_a = Verifier::new(3, ServerId::A, priv_key_a, b"2021-01-01");
    let mut server_b = Verifier::new(3, ServerId::B, priv_key_b, b"2021-01-01");
    let bundle_a = server_a.decrypt(packet.a()).unwrap();
    let bundle_b = server_b.decrypt(packet.b()).unwrap();

    let data = reconstruct_shares(&bundle_a.data, &bundle_b.data).unwrap();
    assert_eq!(data, [1u32, 0, 1]);
    let proof = reconstruct_shares(&bundle_a.proof, &bundle_b.proof).unwrap();
    assert_eq!(proof[2], proof[0] * proof[1]);

    let eval_at = server_b.choose_eval_at().unwrap();
    let v1 = server_a
        .generate_verification_message(eval_at, &bundle_a)
        .unwrap();
    let v2 = server_b
        .generate_verification_message(eval_at, &bundle_b)
        .unwrap();
    assert!(is_valid_share(&v1, &v2));
}

#[test]
fn bundles_are_bound_to_server_and_batch() {
    install_tracing_subscriber();
    let priv_key = PrivateKey::generate().unwrap();
    let pub_key = PublicKey::from(&priv_key);

    // the same key for both sides, so each ciphertext decrypts under either verifier
    let packet = encode(
        b"batch-1",
        pub_key.as_bytes(),
        pub_key.as_bytes(),
        &measurements([0, 1, 0]),
    )
    .unwrap();

    let server_a = Verifier::new(3, ServerId::A, priv_key.clone(), b"batch-1");
    assert_matches!(
        server_a.decrypt(packet.b()),
        Err(VerifyError::WrongServer(ServerId::B))
    );
    server_a.decrypt(packet.a()).unwrap();

    let other_batch = Verifier::new(3, ServerId::A, priv_key.clone(), b"batch-2");
    assert_matches!(
        other_batch.decrypt(packet.a()),
        Err(VerifyError::WrongBatch)
    );

    let other_dim = Verifier::new(4, ServerId::A, priv_key, b"batch-1");
    assert_matches!(
        other_dim.decrypt(packet.a()),
        Err(VerifyError::DimensionMismatch {
            expected: 4,
            got: 3
        })
    );

    let stranger = Verifier::new(3, ServerId::A, PrivateKey::generate().unwrap(), b"batch-1");
    assert_matches!(stranger.decrypt(packet.a()), Err(VerifyError::Decrypt(_)));
}

#[test]
fn unknown_metric_is_deterministic() {
    let pub_key = PublicKey::from(&PrivateKey::generate().unwrap());
    let mut bad = measurements([1, 1, 1]);
    bad.insert("notInSchema".to_string(), 0);

    for _ in 0..5 {
        assert_matches!(
            encode(b"b", pub_key.as_bytes(), pub_key.as_bytes(), &bad),
            Err(EncodeError::UnknownMetric(name)) if name == "notInSchema"
        );
    }
}

#[test]
fn repeated_encodes_differ() {
    let pub_key_a = PublicKey::from(&PrivateKey::generate().unwrap());
    let pub_key_b = PublicKey::from(&PrivateKey::generate().unwrap());
    let m = measurements([1, 0, 1]);

    let p1 = encode(b"b", pub_key_a.as_bytes(), pub_key_b.as_bytes(), &m).unwrap();
    let p2 = encode(b"b", pub_key_a.as_bytes(), pub_key_b.as_bytes(), &m).unwrap();
    assert_eq!(p1.a().len(), p2.a().len());
    assert_ne!(p1.a(), p2.a());
    assert_ne!(p1.b(), p2.b());
}
