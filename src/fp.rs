// SPDX-License-Identifier: MPL-2.0

//! Low-level arithmetic for a prime field GF(p) with p < 2^32.
//!
//! Values handled here are plain integers in `[0, p)` stored in a `u64` so that the product of
//! two of them never overflows.

/// Log2 of the order of the multiplicative subgroup generated by [`FieldParameters::g`]. The
/// largest FFT this crate runs has size `2^MAX_ROOTS`.
pub(crate) const MAX_ROOTS: usize = 20;

/// The parameters of a finite field GF(p) for which p < 2^32.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct FieldParameters {
    /// The prime modulus `p`.
    pub p: u64,
    /// Generator of the multiplicative subgroup of order `2^num_roots`.
    pub g: u64,
    /// Log2 of the order of `g`.
    pub num_roots: usize,
}

impl FieldParameters {
    /// Addition.
    pub fn add(&self, x: u64, y: u64) -> u64 {
        let (z, borrow) = (x + y).overflowing_sub(self.p);
        let m = 0u64.wrapping_sub(borrow as u64);
        z.wrapping_add(m & self.p)
    }

    /// Subtraction.
    pub fn sub(&self, x: u64, y: u64) -> u64 {
        let (z, borrow) = x.overflowing_sub(y);
        let m = 0u64.wrapping_sub(borrow as u64);
        z.wrapping_add(m & self.p)
    }

    /// Multiplication. Both inputs are below 2^32, so the product fits in a `u64`.
    pub fn mul(&self, x: u64, y: u64) -> u64 {
        (x * y) % self.p
    }

    /// Negation, i.e., `-x (mod p)`.
    pub fn neg(&self, x: u64) -> u64 {
        self.sub(0, x)
    }

    /// Modular exponentiation, i.e., `x^exp (mod p)`. The runtime is linear in the bit length
    /// of `exp`.
    pub fn pow(&self, x: u64, exp: u64) -> u64 {
        let mut t = 1;
        for i in (0..64 - exp.leading_zeros()).rev() {
            t = self.mul(t, t);
            if (exp >> i) & 1 != 0 {
                t = self.mul(t, x);
            }
        }
        t
    }

    /// Modular inversion by Fermat's little theorem. The inverse of 0 is 0; callers that
    /// must reject it check beforehand.
    pub fn inv(&self, x: u64) -> u64 {
        self.pow(x, self.p - 2)
    }

    /// Reduces an arbitrary integer into `[0, p)`.
    pub fn elem(&self, x: u64) -> u64 {
        x % self.p
    }

    #[cfg(test)]
    pub fn check(&self) {
        assert!(self.p < 1 << 32, "p >= 2^32");
        // p - 1 must be divisible by the subgroup order for the roots of unity to exist.
        assert_eq!(
            (self.p - 1) % (1 << self.num_roots),
            0,
            "order does not divide p - 1"
        );
        assert_eq!(
            self.pow(self.g, 1 << self.num_roots),
            1,
            "g order incorrect"
        );
        assert_eq!(
            self.pow(self.g, 1 << (self.num_roots - 1)),
            self.p - 1,
            "g is not a principal root"
        );
    }
}

/// GF(2^32 - 2^20 + 1), an FFT-friendly prime.
pub(crate) const FP32: FieldParameters = FieldParameters {
    p: 4293918721,
    g: 3925978153,
    num_roots: MAX_ROOTS,
};
