// Copyright (c) 2020 Apple Inc.
// SPDX-License-Identifier: MPL-2.0

//! Server-side processing of share bundles: decryption, proof verification and aggregation.
//!
//! Only built for tests and with the `test-util` feature. It exercises the client's guarantees
//! end to end and backs the command line tool's `decrypt` subcommand.

use crate::{
    codec::{CodecError, Decode},
    encrypt::{decrypt_share, EncryptError, PrivateKey},
    field::{merge_vector, Field, FieldError},
    packet::{ServerId, ShareBundle},
    polynomial::{poly_interpret_eval, PolyTempMemory},
    proof::{unpack_proof, ProofError},
};
use tracing::debug;

/// Errors raised while processing a share bundle.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The ciphertext could not be decrypted.
    #[error("decryption error")]
    Decrypt(#[from] EncryptError),
    /// The plaintext is not a well-formed share bundle.
    #[error("malformed share bundle")]
    Codec(#[from] CodecError),
    /// The bundle was encrypted for the other server.
    #[error("bundle is addressed to server {0:?}")]
    WrongServer(ServerId),
    /// The bundle belongs to a different batch.
    #[error("bundle belongs to another batch")]
    WrongBatch,
    /// The bundle's dimension differs from this verifier's.
    #[error("bundle has dimension {got}, expected {expected}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Dimension of the bundle.
        got: usize,
    },
    /// A proof share could not be unpacked.
    #[error(transparent)]
    Proof(#[from] ProofError),
    /// A field operation failed.
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// One server's evaluations of its shares of `f`, `g` and `h` at the common random point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerificationMessage {
    /// f evaluated at random point
    pub f_r: Field,
    /// g evaluated at random point
    pub g_r: Field,
    /// h evaluated at random point
    pub h_r: Field,
}

/// Decides whether the two servers' verification messages are consistent with valid data.
pub fn is_valid_share(v1: &VerificationMessage, v2: &VerificationMessage) -> bool {
    // reconstruct f_r, g_r, h_r
    let f_r = v1.f_r + v2.f_r;
    let g_r = v1.g_r + v2.g_r;
    let h_r = v1.h_r + v2.h_r;
    // validity check
    f_r * g_r == h_r
}

#[derive(Debug)]
struct ValidationMemory {
    points_f: Vec<Field>,
    points_g: Vec<Field>,
    points_h: Vec<Field>,
    poly_mem: PolyTempMemory,
}

impl ValidationMemory {
    fn new(dimension: usize) -> Self {
        let n = (dimension + 1).next_power_of_two();
        ValidationMemory {
            points_f: vec![Field::zero(); n],
            points_g: vec![Field::zero(); n],
            points_h: vec![Field::zero(); 2 * n],
            poly_mem: PolyTempMemory::new(2 * n),
        }
    }
}

/// One aggregation server.
#[derive(Debug)]
pub struct Verifier {
    dimension: usize,
    server: ServerId,
    private_key: PrivateKey,
    batch_id: Vec<u8>,
    accumulator: Vec<Field>,
    validation_mem: ValidationMemory,
}

impl Verifier {
    /// Creates the verifier for `server`, accepting bundles of `dimension` elements in
    /// `batch_id`.
    pub fn new(
        dimension: usize,
        server: ServerId,
        private_key: PrivateKey,
        batch_id: &[u8],
    ) -> Self {
        Self {
            dimension,
            server,
            private_key,
            batch_id: batch_id.to_vec(),
            accumulator: vec![Field::zero(); dimension],
            validation_mem: ValidationMemory::new(dimension),
        }
    }

    /// Decrypts and decodes a bundle, checking that it is addressed to this server and batch.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<ShareBundle, VerifyError> {
        let plaintext = decrypt_share(ciphertext, &self.private_key)?;
        let bundle = ShareBundle::get_decoded(&plaintext)?;
        if bundle.server != self.server {
            return Err(VerifyError::WrongServer(bundle.server));
        }
        if bundle.batch_id != self.batch_id {
            return Err(VerifyError::WrongBatch);
        }
        if bundle.dimension() != self.dimension {
            return Err(VerifyError::DimensionMismatch {
                expected: self.dimension,
                got: bundle.dimension(),
            });
        }
        Ok(bundle)
    }

    /// Picks a random evaluation point outside the roots of unity used by the proof. Both
    /// servers must use the same point.
    pub fn choose_eval_at(&self) -> Result<Field, VerifyError> {
        loop {
            let eval_at = Field::random()?;
            if !self.validation_mem.poly_mem.roots.contains(&eval_at) {
                return Ok(eval_at);
            }
        }
    }

    /// Evaluates this server's shares of `f`, `g` and `h` at `eval_at`.
    pub fn generate_verification_message(
        &mut self,
        eval_at: Field,
        bundle: &ShareBundle,
    ) -> Result<VerificationMessage, VerifyError> {
        if bundle.dimension() != self.dimension {
            return Err(VerifyError::DimensionMismatch {
                expected: self.dimension,
                got: bundle.dimension(),
            });
        }
        let unpacked = unpack_proof(&bundle.proof, self.dimension)?;
        let mem = &mut self.validation_mem;

        // set zero terms
        mem.points_f[0] = *unpacked.f0;
        mem.points_g[0] = *unpacked.g0;
        mem.points_h[0] = *unpacked.h0;

        // set points_f and points_g
        for (i, x) in bundle.data.iter().enumerate() {
            mem.points_f[i + 1] = *x;

            if self.server.is_first() {
                // only one server needs to subtract one
                mem.points_g[i + 1] = *x - Field::one();
            } else {
                mem.points_g[i + 1] = *x;
            }
        }

        // set points_h, skipping over elements that should be zero
        for (point, packed) in mem.points_h[1..]
            .iter_mut()
            .step_by(2)
            .zip(unpacked.points_h_packed.iter())
        {
            *point = *packed;
        }

        // evaluate polynomials at random point
        let f_r = poly_interpret_eval(
            &mem.points_f,
            &mem.poly_mem.roots_half_inverted,
            eval_at,
            &mut mem.poly_mem.coeffs,
            &mut mem.poly_mem.fft_memory,
        );
        let g_r = poly_interpret_eval(
            &mem.points_g,
            &mem.poly_mem.roots_half_inverted,
            eval_at,
            &mut mem.poly_mem.coeffs,
            &mut mem.poly_mem.fft_memory,
        );
        let h_r = poly_interpret_eval(
            &mem.points_h,
            &mem.poly_mem.roots_inverted,
            eval_at,
            &mut mem.poly_mem.coeffs,
            &mut mem.poly_mem.fft_memory,
        );

        Ok(VerificationMessage { f_r, g_r, h_r })
    }

    /// Adds the data share of `bundle` to the running total if the verification messages
    /// accept it. Returns whether it was accepted.
    pub fn aggregate(
        &mut self,
        bundle: &ShareBundle,
        v1: &VerificationMessage,
        v2: &VerificationMessage,
    ) -> Result<bool, VerifyError> {
        let is_valid = is_valid_share(v1, v2);
        if is_valid {
            merge_vector(&mut self.accumulator, &bundle.data)?;
        } else {
            debug!(server = ?self.server, "rejected share");
        }
        Ok(is_valid)
    }

    /// This server's share of the sum of all accepted measurements.
    pub fn total_shares(&self) -> &[Field] {
        &self.accumulator
    }

    /// Adds another server's total into this one.
    pub fn merge_total_shares(&mut self, other_total_shares: &[Field]) -> Result<(), VerifyError> {
        Ok(merge_vector(&mut self.accumulator, other_total_shares)?)
    }
}

/// Reconstructs aggregate counts from both servers' totals.
pub fn reconstruct_totals(total_a: &[Field], total_b: &[Field]) -> Result<Vec<u64>, VerifyError> {
    let mut sum = total_a.to_vec();
    merge_vector(&mut sum, total_b)?;
    Ok(sum.into_iter().map(|x| u64::from(u32::from(x))).collect())
}
