// SPDX-License-Identifier: MPL-2.0

use criterion::{criterion_group, criterion_main, Criterion};

use prio_encoder::encrypt::{encrypt_share, PrivateKey, PublicKey};
use prio_encoder::field::{random_vector, Field};
use prio_encoder::proof::ProofGenerator;
use prio_encoder::share::split_vector;
use prio_encoder::{Client, MeasurementSet, Metric, MetricSchema};

/// Speed test for drawing field elements from the system CSPRNG.
pub fn random(c: &mut Criterion) {
    let test_sizes = [16, 256, 1024, 4096];
    for size in test_sizes.iter() {
        c.bench_function(&format!("rand, size={}", *size), |b| {
            b.iter(|| random_vector(*size).unwrap())
        });
    }
}

/// Proof generation for boolean vectors of increasing length, with and without splitting the
/// data into shares.
pub fn prove(c: &mut Criterion) {
    let test_sizes = [10, 100, 1_000];
    for size in test_sizes.iter() {
        let generator = ProofGenerator::new(*size).unwrap();
        let data = vec![Field::one(); *size];

        c.bench_function(&format!("prove, size={}", *size), |b| {
            b.iter(|| generator.prove(&data).unwrap())
        });

        c.bench_function(&format!("split, size={}", *size), |b| {
            b.iter(|| split_vector(&data).unwrap())
        });
    }
}

/// Hybrid encryption of plaintexts of share bundle size.
pub fn encrypt(c: &mut Criterion) {
    let public_key = PublicKey::from(&PrivateKey::generate().unwrap());
    let test_sizes = [64, 1024, 16 * 1024];
    for size in test_sizes.iter() {
        let plaintext = vec![0u8; *size];
        c.bench_function(&format!("encrypt, size={}", *size), |b| {
            b.iter(|| encrypt_share(&plaintext, &public_key).unwrap())
        });
    }
}

/// End-to-end cost of `Client::encode`.
pub fn encode(c: &mut Criterion) {
    let public_key_a = PublicKey::from(&PrivateKey::generate().unwrap());
    let public_key_b = PublicKey::from(&PrivateKey::generate().unwrap());
    let test_sizes = [3, 100, 1_000];
    for size in test_sizes.iter() {
        let metrics = (0..*size).map(|i| Metric::boolean(format!("m{i}")));
        let schema = MetricSchema::new(metrics.collect()).unwrap();
        let measurements: MeasurementSet = schema
            .metrics()
            .iter()
            .step_by(2)
            .map(|m| (m.name.clone(), 1))
            .collect();
        let client = Client::new(schema, public_key_a.clone(), public_key_b.clone()).unwrap();

        c.bench_function(&format!("encode, dimension={}", *size), |b| {
            b.iter(|| client.encode(b"bench", &measurements).unwrap())
        });
    }
}

criterion_group!(benches, random, prove, encrypt, encode);
criterion_main!(benches);
