// Copyright (c) 2020 Apple Inc.
// SPDX-License-Identifier: MPL-2.0

//! Construction of the proof that every encoded value is 0 or 1.
//!
//! Let `N = (dimension + 1).next_power_of_two()`. The prover defines polynomials `f` and `g` of
//! degree less than `N` through the `N`-th roots of unity: `f(w^0) = f0` and `f(w^i) = x_i`,
//! `g(w^0) = g0` and `g(w^i) = x_i - 1`, where `f0` and `g0` are random. The product
//! `h = f * g` vanishes at every `w^i` with `i >= 1` exactly when each `x_i` is boolean. The
//! proof is the zero term `h0 = f0 * g0` together with the values of `h` at the odd `2N`-th
//! roots of unity; the even ones are implied. Servers holding additive shares of the data and
//! the proof can evaluate their shares of `f`, `g` and `h` at a random point `r` and jointly
//! check `f(r) * g(r) = h(r)`.

use crate::{
    field::{Field, FieldError, N_ROOTS},
    polynomial::{fft_get_roots, poly_fft, PolyFFTTempMemory},
    share::split_vector,
};
use tracing::debug;

/// Errors raised while building or unpacking a proof.
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    /// Not enough roots of unity in the field for this dimension.
    #[error("dimension {0} exceeds field capacity")]
    DimensionTooLarge(usize),
    /// The input does not have the length the prover or unpacker expects.
    #[error("input has wrong length")]
    InputSizeMismatch,
    /// A field operation failed.
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Number of points the polynomials `f` and `g` are interpolated through.
fn num_points(dimension: usize) -> usize {
    (dimension + 1).next_power_of_two()
}

/// Returns the number of field elements in a flattened proof for `dimension` data elements:
/// the three zero terms followed by `N` packed points of `h`.
pub fn proof_length(dimension: usize) -> usize {
    3 + num_points(dimension)
}

/// A validity proof for one encoded measurement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    /// Zeroth point of polynomial f.
    pub f0: Field,
    /// Zeroth point of polynomial g.
    pub g0: Field,
    /// Zeroth point of polynomial h.
    pub h0: Field,
    /// Values of h at the odd `2N`-th roots of unity.
    pub points_h_packed: Vec<Field>,
}

impl Proof {
    /// Flattens the proof to `[f0, g0, h0, points_h_packed...]`.
    pub fn to_vec(&self) -> Vec<Field> {
        let mut out = Vec::with_capacity(3 + self.points_h_packed.len());
        out.extend_from_slice(&[self.f0, self.g0, self.h0]);
        out.extend_from_slice(&self.points_h_packed);
        out
    }
}

/// A flattened proof (or proof share) viewed as its components.
#[derive(Debug)]
pub struct UnpackedProof<'a> {
    /// Zeroth point of polynomial f
    pub f0: &'a Field,
    /// Zeroth point of polynomial g
    pub g0: &'a Field,
    /// Zeroth point of polynomial h
    pub h0: &'a Field,
    /// Non-zero points of polynomial h
    pub points_h_packed: &'a [Field],
}

/// Mutable counterpart of [`UnpackedProof`].
#[derive(Debug)]
pub struct UnpackedProofMut<'a> {
    /// Zeroth point of polynomial f
    pub f0: &'a mut Field,
    /// Zeroth point of polynomial g
    pub g0: &'a mut Field,
    /// Zeroth point of polynomial h
    pub h0: &'a mut Field,
    /// Non-zero points of polynomial h
    pub points_h_packed: &'a mut [Field],
}

/// Unpacks a flattened proof for `dimension` data elements.
pub fn unpack_proof(proof: &[Field], dimension: usize) -> Result<UnpackedProof<'_>, ProofError> {
    if proof.len() != proof_length(dimension) {
        return Err(ProofError::InputSizeMismatch);
    }
    if let ([f0, g0, h0], points_h_packed) = proof.split_at(3) {
        Ok(UnpackedProof {
            f0,
            g0,
            h0,
            points_h_packed,
        })
    } else {
        Err(ProofError::InputSizeMismatch)
    }
}

/// Unpacks a mutable flattened proof for `dimension` data elements.
pub fn unpack_proof_mut(
    proof: &mut [Field],
    dimension: usize,
) -> Result<UnpackedProofMut<'_>, ProofError> {
    if proof.len() != proof_length(dimension) {
        return Err(ProofError::InputSizeMismatch);
    }
    if let ([f0, g0, h0], points_h_packed) = proof.split_at_mut(3) {
        Ok(UnpackedProofMut {
            f0,
            g0,
            h0,
            points_h_packed,
        })
    } else {
        Err(ProofError::InputSizeMismatch)
    }
}

/// Builds proofs for a fixed dimension. The roots of unity are computed once; scratch space is
/// allocated per proof so that one generator can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct ProofGenerator {
    dimension: usize,
    roots_2n: Vec<Field>,
    roots_n_inverted: Vec<Field>,
}

impl ProofGenerator {
    /// Prepares a generator for vectors of length `dimension`.
    pub fn new(dimension: usize) -> Result<Self, ProofError> {
        let n = num_points(dimension);
        if 2 * n > N_ROOTS as usize {
            return Err(ProofError::DimensionTooLarge(dimension));
        }

        Ok(Self {
            dimension,
            roots_2n: fft_get_roots(2 * n, false),
            roots_n_inverted: fft_get_roots(n, true),
        })
    }

    /// The vector length this generator accepts.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Proves that each element of `data` is 0 or 1.
    ///
    /// Non-boolean input is not refused: the proof is built as usual and will fail server-side
    /// verification.
    pub fn prove(&self, data: &[Field]) -> Result<Proof, ProofError> {
        if data.len() != self.dimension {
            return Err(ProofError::InputSizeMismatch);
        }
        if data.iter().any(|x| *x != 0 && *x != 1) {
            debug!(
                dimension = self.dimension,
                "proving non-boolean data; verification will fail"
            );
        }

        let n = num_points(self.dimension);
        let mut points_f = vec![Field::zero(); n];
        let mut points_g = vec![Field::zero(); n];
        let mut evals_f = vec![Field::zero(); 2 * n];
        let mut evals_g = vec![Field::zero(); 2 * n];
        let mut coeffs = vec![Field::zero(); 2 * n];
        let mut fft_memory = PolyFFTTempMemory::new(2 * n);

        // set zero terms to random
        let f0 = Field::random()?;
        let g0 = Field::random()?;
        points_f[0] = f0;
        points_g[0] = g0;

        // set zero term for the proof polynomial
        let h0 = f0 * g0;

        // set f_i = data_(i - 1)
        // set g_i = f_i - 1
        for ((f, g), x) in points_f[1..]
            .iter_mut()
            .zip(points_g[1..].iter_mut())
            .zip(data.iter())
        {
            *f = *x;
            *g = *x - Field::one();
        }

        for (points, evals) in [(&points_f, &mut evals_f), (&points_g, &mut evals_g)] {
            // interpolate through the N-th roots of unity, then evaluate at the 2N-th roots
            poly_fft(
                &mut coeffs,
                points,
                &self.roots_n_inverted,
                n,
                true,
                &mut fft_memory,
            );
            coeffs[n..].iter_mut().for_each(|c| *c = Field::zero());
            poly_fft(
                evals,
                &coeffs,
                &self.roots_2n,
                2 * n,
                false,
                &mut fft_memory,
            );
        }

        // h at the odd 2N-th roots of unity; the even ones are zero except h0
        let points_h_packed = evals_f
            .iter()
            .zip(evals_g.iter())
            .skip(1)
            .step_by(2)
            .map(|(f, g)| *f * *g)
            .collect();

        Ok(Proof {
            f0,
            g0,
            h0,
            points_h_packed,
        })
    }
}

/// Proves that each element of `values` is 0 or 1.
pub fn prove(values: &[Field]) -> Result<Proof, ProofError> {
    ProofGenerator::new(values.len())?.prove(values)
}

/// Splits a proof into two additive shares of its flattened form, with fresh randomness per
/// element.
pub fn split_proof(proof: &Proof) -> Result<(Vec<Field>, Vec<Field>), FieldError> {
    split_vector(&proof.to_vec())
}
