// SPDX-License-Identifier: MPL-2.0

//! Share bundles and the packet a client hands to its transport.
//!
//! A [`ShareBundle`] is the plaintext one server receives: its share of the encoded data and its
//! share of the proof, bound to the batch and to the server it is meant for. Each bundle is
//! encrypted under its server's key, and the two ciphertexts travel together in a [`Packet`].

use crate::{
    codec::{
        decode_u16_opaque, decode_u32_items, encode_u16_opaque, encode_u32_items, CodecError,
        Decode, Encode,
    },
    field::Field,
    proof::proof_length,
};
use std::io::Cursor;

/// Identifies which of the two aggregation servers a bundle belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServerId {
    /// The first server. It subtracts one from its share of `g` during verification.
    A,
    /// The second server.
    B,
}

impl ServerId {
    /// Whether this is the server that applies the constant terms during verification.
    pub fn is_first(&self) -> bool {
        matches!(self, ServerId::A)
    }
}

impl Encode for ServerId {
    fn encode(&self, bytes: &mut Vec<u8>) -> Result<(), CodecError> {
        match self {
            ServerId::A => 0u8,
            ServerId::B => 1u8,
        }
        .encode(bytes)
    }
}

impl Decode for ServerId {
    fn decode(bytes: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        match u8::decode(bytes)? {
            0 => Ok(ServerId::A),
            1 => Ok(ServerId::B),
            _ => Err(CodecError::UnexpectedValue),
        }
    }
}

/// One server's plaintext: a share of the data and a share of the flattened proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareBundle {
    /// Batch the measurement belongs to.
    pub batch_id: Vec<u8>,
    /// Intended recipient.
    pub server: ServerId,
    /// Share of the encoded measurement.
    pub data: Vec<Field>,
    /// Share of the proof, `proof_length(data.len())` elements.
    pub proof: Vec<Field>,
}

impl ShareBundle {
    /// Number of encoded measurement slots.
    pub fn dimension(&self) -> usize {
        self.data.len()
    }
}

impl Encode for ShareBundle {
    fn encode(&self, bytes: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_u16_opaque(bytes, &self.batch_id)?;
        self.server.encode(bytes)?;
        u32::try_from(self.data.len())
            .map_err(|_| CodecError::LengthPrefixOverflow(self.data.len()))?
            .encode(bytes)?;
        encode_u32_items(bytes, &self.data)?;
        encode_u32_items(bytes, &self.proof)
    }
}

impl Decode for ShareBundle {
    fn decode(bytes: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let batch_id = decode_u16_opaque(bytes)?;
        let server = ServerId::decode(bytes)?;
        let dimension = u32::decode(bytes)? as usize;

        let data: Vec<Field> = decode_u32_items(Field::ENCODED_SIZE, bytes)?;
        if data.len() != dimension {
            return Err(CodecError::UnexpectedValue);
        }
        let proof: Vec<Field> = decode_u32_items(Field::ENCODED_SIZE, bytes)?;
        if proof.len() != proof_length(dimension) {
            return Err(CodecError::UnexpectedValue);
        }

        Ok(Self {
            batch_id,
            server,
            data,
            proof,
        })
    }
}

/// The output of one `encode` call: the batch identifier in the clear and one ciphertext per
/// server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    batch_id: Vec<u8>,
    a: Vec<u8>,
    b: Vec<u8>,
}

impl Packet {
    pub(crate) fn new(batch_id: Vec<u8>, a: Vec<u8>, b: Vec<u8>) -> Self {
        Self { batch_id, a, b }
    }

    /// The batch identifier.
    pub fn batch_id(&self) -> &[u8] {
        &self.batch_id
    }

    /// Ciphertext for server A.
    pub fn a(&self) -> &[u8] {
        &self.a
    }

    /// Ciphertext for server B.
    pub fn b(&self) -> &[u8] {
        &self.b
    }

    /// Ciphertext for the given server.
    pub fn for_server(&self, server: ServerId) -> &[u8] {
        match server {
            ServerId::A => &self.a,
            ServerId::B => &self.b,
        }
    }

    /// Consumes the packet, returning `(batch_id, a, b)`.
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        (self.batch_id, self.a, self.b)
    }
}
