// Copyright (c) 2020 Apple Inc.
// SPDX-License-Identifier: MPL-2.0

//! The client: turns a measurement set into an encrypted two-server packet.

use crate::{
    codec::{CodecError, Encode},
    encode::{encode_measurements, MeasurementSet},
    encrypt::{encrypt_share, EncryptError, PublicKey},
    field::FieldError,
    packet::{Packet, ServerId, ShareBundle},
    proof::{split_proof, ProofError, ProofGenerator},
    schema::MetricSchema,
    share::split_vector,
};
use tracing::debug;

/// Errors that abort an `encode` call. No partial packet is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// A measurement is outside its metric's declared bound.
    #[error("measurement {name:?} has out-of-range value {value}")]
    InvalidMeasurement {
        /// Metric name.
        name: String,
        /// Rejected value.
        value: u64,
    },
    /// A measurement names a metric that is not in the schema.
    #[error("unknown metric {0:?}")]
    UnknownMetric(String),
    /// A field operation failed. Not reachable with a valid schema.
    #[error("arithmetic error: {0}")]
    ArithmeticError(String),
    /// A server public key is malformed.
    #[error("invalid public key: {0}")]
    InvalidKey(EncryptError),
    /// The system's secure randomness source failed.
    #[error("secure randomness unavailable: {0}")]
    EntropyFailure(String),
    /// A share bundle could not be serialized, for example because the batch id is too long.
    #[error("serialization error")]
    Codec(#[from] CodecError),
}

impl From<FieldError> for EncodeError {
    fn from(e: FieldError) -> Self {
        match e {
            FieldError::Entropy(e) => EncodeError::EntropyFailure(e.to_string()),
            e => EncodeError::ArithmeticError(e.to_string()),
        }
    }
}

impl From<ProofError> for EncodeError {
    fn from(e: ProofError) -> Self {
        match e {
            ProofError::Field(e) => e.into(),
            e => EncodeError::ArithmeticError(e.to_string()),
        }
    }
}

impl From<EncryptError> for EncodeError {
    fn from(e: EncryptError) -> Self {
        match e {
            EncryptError::Entropy(e) => EncodeError::EntropyFailure(e.to_string()),
            e if e.is_key_error() => EncodeError::InvalidKey(e),
            e => EncodeError::ArithmeticError(e.to_string()),
        }
    }
}

/// Encodes measurements for one schema and one pair of servers.
///
/// A client holds no per-call state, so one instance can serve concurrent `encode` calls.
#[derive(Debug, Clone)]
pub struct Client {
    schema: MetricSchema,
    public_key_a: PublicKey,
    public_key_b: PublicKey,
    prover: ProofGenerator,
}

impl Client {
    /// Creates a client for `schema` whose packets are readable by the holders of the private
    /// keys matching `public_key_a` and `public_key_b`.
    pub fn new(
        schema: MetricSchema,
        public_key_a: PublicKey,
        public_key_b: PublicKey,
    ) -> Result<Self, EncodeError> {
        let prover = ProofGenerator::new(schema.dimension())?;
        Ok(Self {
            schema,
            public_key_a,
            public_key_b,
            prover,
        })
    }

    /// The schema this client encodes with.
    pub fn schema(&self) -> &MetricSchema {
        &self.schema
    }

    /// Encodes `measurements` into a packet for `batch_id`.
    ///
    /// The measurement vector is split into two additive shares, a proof that every slot is 0 or
    /// 1 is computed over the whole vector and split the same way, and each side's shares are
    /// serialized and encrypted under that side's key. Every call draws fresh shares, proof
    /// randomness and ephemeral keys.
    pub fn encode(
        &self,
        batch_id: &[u8],
        measurements: &MeasurementSet,
    ) -> Result<Packet, EncodeError> {
        let data = encode_measurements(&self.schema, measurements)?;

        let (data_a, data_b) = split_vector(&data)?;
        let proof = self.prover.prove(&data)?;
        let (proof_a, proof_b) = split_proof(&proof)?;

        let bundle_a = ShareBundle {
            batch_id: batch_id.to_vec(),
            server: ServerId::A,
            data: data_a,
            proof: proof_a,
        }
        .get_encoded()?;
        let bundle_b = ShareBundle {
            batch_id: batch_id.to_vec(),
            server: ServerId::B,
            data: data_b,
            proof: proof_b,
        }
        .get_encoded()?;

        let a = encrypt_share(&bundle_a, &self.public_key_a)?;
        let b = encrypt_share(&bundle_b, &self.public_key_b)?;
        debug!(
            dimension = data.len(),
            ciphertext_a = a.len(),
            ciphertext_b = b.len(),
            "encoded packet"
        );

        Ok(Packet::new(batch_id.to_vec(), a, b))
    }
}

/// Encodes `measurements` with the default browser schema.
///
/// The public keys are raw 32-byte X25519 keys; anything else fails with
/// [`EncodeError::InvalidKey`].
pub fn encode(
    batch_id: &[u8],
    public_key_a: &[u8],
    public_key_b: &[u8],
    measurements: &MeasurementSet,
) -> Result<Packet, EncodeError> {
    encode_with_schema(
        MetricSchema::browser_default(),
        batch_id,
        public_key_a,
        public_key_b,
        measurements,
    )
}

/// Like [`encode`], for an explicit schema.
pub fn encode_with_schema(
    schema: MetricSchema,
    batch_id: &[u8],
    public_key_a: &[u8],
    public_key_b: &[u8],
    measurements: &MeasurementSet,
) -> Result<Packet, EncodeError> {
    let public_key_a = PublicKey::from_bytes(public_key_a)?;
    let public_key_b = PublicKey::from_bytes(public_key_b)?;
    Client::new(schema, public_key_a, public_key_b)?.encode(batch_id, measurements)
}
