// Copyright (c) 2020 Apple Inc.
// SPDX-License-Identifier: MPL-2.0

use prio_encoder::{
    encrypt::{PrivateKey, PublicKey},
    packet::ServerId,
    verify::{reconstruct_totals, Verifier},
    Client, MeasurementSet, Metric, MetricSchema,
};
use rand::Rng;

const PRIVATE_KEY_A: &str = "5C1A0F0B8AB0C7E0F4CFAF5B2A5C1D7D6D5CBE0B21F4D1E1B2A3C4D5E6F70819";
const PRIVATE_KEY_B: &str = "A8E0F3D2C1B0A9988776655443322110FFEEDDCCBBAA99887766554433221100";

#[test]
fn accumulation() {
    let number_of_clients = 100;
    let batch_id = b"accumulation";
    let schema = MetricSchema::new(vec![
        Metric::boolean("flagA"),
        Metric::integer("tabs", 6),
        Metric::boolean("flagB"),
        Metric::integer("windows", 3),
    ])
    .unwrap();
    let dim = schema.dimension();

    let priv_key1 = PrivateKey::from_hex(PRIVATE_KEY_A).unwrap();
    let priv_key2 = PrivateKey::from_hex(PRIVATE_KEY_B).unwrap();
    let pub_key1 = PublicKey::from(&priv_key1);
    let pub_key2 = PublicKey::from(&priv_key2);

    let mut server1 = Verifier::new(dim, ServerId::A, priv_key1, batch_id);
    let mut server2 = Verifier::new(dim, ServerId::B, priv_key2, batch_id);

    let client = Client::new(schema.clone(), pub_key1, pub_key2).unwrap();

    let mut reference_totals = vec![0u64; schema.metrics().len()];

    let mut rng = rand::rng();
    for _ in 0..number_of_clients {
        // some random data
        let measurements: MeasurementSet = schema
            .metrics()
            .iter()
            .map(|metric| {
                let value = rng.random_range(0..=metric.kind.max_value());
                (metric.name.clone(), value)
            })
            .collect();

        // update reference totals
        for (total, metric) in reference_totals.iter_mut().zip(schema.metrics()) {
            *total += measurements[&metric.name];
        }

        let packet = client.encode(batch_id, &measurements).unwrap();
        let share1 = server1.decrypt(packet.a()).unwrap();
        let share2 = server2.decrypt(packet.b()).unwrap();

        let eval_at = server1.choose_eval_at().unwrap();

        let v1 = server1
            .generate_verification_message(eval_at, &share1)
            .unwrap();
        let v2 = server2
            .generate_verification_message(eval_at, &share2)
            .unwrap();

        assert!(server1.aggregate(&share1, &v1, &v2).unwrap());
        assert!(server2.aggregate(&share2, &v1, &v2).unwrap());
    }

    let slot_sums = reconstruct_totals(server1.total_shares(), server2.total_shares()).unwrap();
    let totals = schema.decode_sums(&slot_sums).unwrap();
    let expected: Vec<(String, u64)> = schema
        .metrics()
        .iter()
        .map(|m| m.name.clone())
        .zip(reference_totals)
        .collect();
    assert_eq!(totals, expected);
}

#[test]
fn merged_totals() {
    let schema = MetricSchema::browser_default();
    let priv_key1 = PrivateKey::from_hex(PRIVATE_KEY_A).unwrap();
    let priv_key2 = PrivateKey::from_hex(PRIVATE_KEY_B).unwrap();
    let client = Client::new(
        schema.clone(),
        PublicKey::from(&priv_key1),
        PublicKey::from(&priv_key2),
    )
    .unwrap();

    let mut server1 = Verifier::new(3, ServerId::A, priv_key1, b"b");
    let mut server2 = Verifier::new(3, ServerId::B, priv_key2, b"b");

    for flags in [[1, 0, 1], [1, 1, 0], [0, 0, 1]] {
        let measurements: MeasurementSet = schema
            .metrics()
            .iter()
            .zip(flags)
            .map(|(m, v)| (m.name.clone(), v))
            .collect();
        let packet = client.encode(b"b", &measurements).unwrap();
        let share1 = server1.decrypt(packet.a()).unwrap();
        let share2 = server2.decrypt(packet.b()).unwrap();
        let eval_at = server2.choose_eval_at().unwrap();
        let v1 = server1
            .generate_verification_message(eval_at, &share1)
            .unwrap();
        let v2 = server2
            .generate_verification_message(eval_at, &share2)
            .unwrap();
        assert!(server1.aggregate(&share1, &v1, &v2).unwrap());
        assert!(server2.aggregate(&share2, &v1, &v2).unwrap());
    }

    let total2 = server2.total_shares().to_vec();
    server1.merge_total_shares(&total2).unwrap();
    let counts: Vec<u64> = server1
        .total_shares()
        .iter()
        .map(|x| u64::from(u32::from(*x)))
        .collect();
    assert_eq!(counts, vec![2, 1, 2]);
}
