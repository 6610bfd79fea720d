// SPDX-License-Identifier: MPL-2.0

//! Functions for polynomial interpolation and evaluation over the roots of unity.

use crate::field::{Field, N_ROOTS};

/// Scratch space for the recursive FFT.
#[derive(Debug)]
pub(crate) struct PolyFFTTempMemory {
    fft_tmp: Vec<Field>,
    fft_y_sub: Vec<Field>,
    fft_roots_sub: Vec<Field>,
}

impl PolyFFTTempMemory {
    pub(crate) fn new(point_count: usize) -> Self {
        PolyFFTTempMemory {
            fft_tmp: vec![Field::zero(); point_count],
            fft_y_sub: vec![Field::zero(); point_count],
            fft_roots_sub: vec![Field::zero(); point_count],
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
/// Precomputed roots and scratch space for interpolating through `point_count / 2` and
/// `point_count` roots of unity.
#[derive(Debug)]
pub(crate) struct PolyTempMemory {
    pub roots: Vec<Field>,
    pub roots_inverted: Vec<Field>,
    pub roots_half_inverted: Vec<Field>,
    pub coeffs: Vec<Field>,
    pub fft_memory: PolyFFTTempMemory,
}

#[cfg(any(test, feature = "test-util"))]
impl PolyTempMemory {
    pub(crate) fn new(point_count: usize) -> Self {
        PolyTempMemory {
            roots: fft_get_roots(point_count, false),
            roots_inverted: fft_get_roots(point_count, true),
            roots_half_inverted: fft_get_roots(point_count / 2, true),
            coeffs: vec![Field::zero(); point_count],
            fft_memory: PolyFFTTempMemory::new(point_count),
        }
    }
}

fn fft_recurse(
    out: &mut [Field],
    n: usize,
    roots: &[Field],
    ys: &[Field],
    tmp: &mut [Field],
    y_sub: &mut [Field],
    roots_sub: &mut [Field],
) {
    if n == 1 {
        out[0] = ys[0];
        return;
    }

    let half_n = n / 2;

    let (tmp_first, tmp_second) = tmp.split_at_mut(half_n);
    let (y_sub_first, y_sub_second) = y_sub.split_at_mut(half_n);
    let (roots_sub_first, roots_sub_second) = roots_sub.split_at_mut(half_n);

    // Recurse on the first half
    for i in 0..half_n {
        y_sub_first[i] = ys[i] + ys[i + half_n];
        roots_sub_first[i] = roots[2 * i];
    }
    fft_recurse(
        tmp_first,
        half_n,
        roots_sub_first,
        y_sub_first,
        tmp_second,
        y_sub_second,
        roots_sub_second,
    );
    for i in 0..half_n {
        out[2 * i] = tmp_first[i];
    }

    // Recurse on the second half
    for i in 0..half_n {
        y_sub_first[i] = (ys[i] - ys[i + half_n]) * roots[i];
    }
    fft_recurse(
        tmp_first,
        half_n,
        roots_sub_first,
        y_sub_first,
        tmp_second,
        y_sub_second,
        roots_sub_second,
    );
    for i in 0..half_n {
        out[2 * i + 1] = tmp_first[i];
    }
}

/// Returns the `count`-th roots of unity `w^0, w^1, ..., w^(count - 1)`, or their inverses.
/// `count` must be a power of two no larger than [`N_ROOTS`].
pub(crate) fn fft_get_roots(count: usize, invert: bool) -> Vec<Field> {
    let mut roots = vec![Field::zero(); count];
    let mut gen = Field::generator();
    if invert {
        // The generator is a root of unity, never zero.
        gen = gen.pow(N_ROOTS - 1);
    }

    roots[0] = Field::one();
    let step_size = N_ROOTS / (count as u32);
    // generator for subgroup of order count
    gen = gen.pow(step_size);

    for i in 1..count {
        roots[i] = gen * roots[i - 1];
    }

    roots
}

/// Evaluates the polynomial with coefficients `points_in` at each of the first `n_points`
/// `scaled_roots`. With `invert` set, the output is scaled by `1 / n_points`, which turns
/// evaluation at the inverted roots into interpolation.
pub(crate) fn poly_fft(
    points_out: &mut [Field],
    points_in: &[Field],
    scaled_roots: &[Field],
    n_points: usize,
    invert: bool,
    mem: &mut PolyFFTTempMemory,
) {
    fft_recurse(
        points_out,
        n_points,
        scaled_roots,
        points_in,
        &mut mem.fft_tmp,
        &mut mem.fft_y_sub,
        &mut mem.fft_roots_sub,
    );
    if invert {
        // n_points is a power of two below the modulus, so this is the inverse of n_points.
        let n_inverse = Field::from(n_points as u32).pow(crate::field::MODULUS - 2);
        for out in points_out[..n_points].iter_mut() {
            *out *= n_inverse;
        }
    }
}

/// Evaluates `poly` at `eval_at` by Horner's rule.
#[cfg(any(test, feature = "test-util"))]
pub(crate) fn poly_horner_eval(poly: &[Field], eval_at: Field) -> Field {
    let mut result = poly[poly.len() - 1];

    for i in (0..(poly.len() - 1)).rev() {
        result *= eval_at;
        result += poly[i];
    }

    result
}

/// Interpolates the polynomial taking value `points[i]` at the `i`-th root of unity and
/// evaluates it at `eval_at`. `roots` are the inverted `points.len()`-th roots of unity.
#[cfg(any(test, feature = "test-util"))]
pub(crate) fn poly_interpret_eval(
    points: &[Field],
    roots: &[Field],
    eval_at: Field,
    tmp_coeffs: &mut [Field],
    fft_memory: &mut PolyFFTTempMemory,
) -> Field {
    poly_fft(tmp_coeffs, points, roots, points.len(), true, fft_memory);
    poly_horner_eval(&tmp_coeffs[..points.len()], eval_at)
}
