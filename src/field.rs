// Copyright (c) 2020 Apple Inc.
// SPDX-License-Identifier: MPL-2.0

//! Finite field arithmetic over GF(2^32 - 2^20 + 1).
//!
//! The field has a multiplicative subgroup of order `2^20`, generated by [`GENERATOR`], which
//! provides the roots of unity used by the proof system.

use crate::{
    codec::{CodecError, Decode, Encode},
    fp::FP32,
};
use rand_core::{OsError, OsRng, TryRngCore};
use std::{
    fmt::{self, Display, Formatter},
    io::{Cursor, Read},
    ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};
use subtle::{Choice, ConstantTimeEq};

/// Possible errors from finite field operations.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    /// Input sizes do not match.
    #[error("input sizes do not match")]
    InputSizeMismatch,
    /// Returned when decoding a field element from a short byte string.
    #[error("short read from bytes")]
    ShortRead,
    /// Returned when decoding a field element from a byte string encoding an integer larger
    /// than or equal to the field modulus.
    #[error("read from byte slice exceeds modulus")]
    ModulusOverflow,
    /// Zero has no multiplicative inverse.
    #[error("inverse of zero")]
    InverseOfZero,
    /// The operating system's entropy source failed.
    #[error("system entropy source failed: {0}")]
    Entropy(OsError),
}

impl From<OsError> for FieldError {
    fn from(e: OsError) -> Self {
        FieldError::Entropy(e)
    }
}

/// Modulus for the field, an FFT friendly prime: 2^32 - 2^20 + 1.
pub const MODULUS: u32 = FP32.p as u32;
/// Generator for the multiplicative subgroup of order [`N_ROOTS`].
pub const GENERATOR: u32 = FP32.g as u32;
/// Order of the subgroup generated by [`GENERATOR`].
pub const N_ROOTS: u32 = 1 << FP32.num_roots;

/// An element of GF(2^32 - 2^20 + 1), always kept in canonical form `[0, p)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Field(u32);

impl Field {
    /// Size in bytes of the encoding of a value.
    pub const ENCODED_SIZE: usize = 4;

    /// Returns the additive identity.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the multiplicative identity.
    pub fn one() -> Self {
        Self(1)
    }

    /// Modular exponentation, i.e., `self^exp (mod p)`.
    pub fn pow(self, exp: u32) -> Self {
        Self(FP32.pow(u64::from(self.0), u64::from(exp)) as u32)
    }

    /// Modular inversion, i.e., `self^-1 (mod p)`.
    ///
    /// # Errors
    ///
    /// Fails with [`FieldError::InverseOfZero`] if `self` is zero.
    pub fn inv(self) -> Result<Self, FieldError> {
        if self.0 == 0 {
            return Err(FieldError::InverseOfZero);
        }
        Ok(Self(FP32.inv(u64::from(self.0)) as u32))
    }

    /// Returns the generator of the multiplicative subgroup of order [`N_ROOTS`].
    pub fn generator() -> Self {
        Self(GENERATOR)
    }

    /// Samples a uniformly random field element from the operating system's CSPRNG, rejecting
    /// 32-bit words that are not below the modulus.
    ///
    /// # Errors
    ///
    /// Fails with [`FieldError::Entropy`] if the entropy source is unavailable. There is no
    /// fallback to a weaker generator.
    pub fn random() -> Result<Self, FieldError> {
        let mut buf = [0; Self::ENCODED_SIZE];
        loop {
            OsRng.try_fill_bytes(&mut buf)?;
            let candidate = u32::from_le_bytes(buf);
            if candidate < MODULUS {
                return Ok(Self(candidate));
            }
        }
    }

    /// Interprets the next [`Self::ENCODED_SIZE`] bytes from the reader as a little-endian
    /// encoded field element.
    ///
    /// # Errors
    ///
    /// Fails if the reader runs out of input or if the integer is not below the modulus.
    pub fn try_from_reader<R: Read>(reader: &mut R) -> Result<Self, FieldError> {
        let mut buf = [0; Self::ENCODED_SIZE];
        reader
            .read_exact(&mut buf)
            .map_err(|_| FieldError::ShortRead)?;
        let int = u32::from_le_bytes(buf);
        if int >= MODULUS {
            return Err(FieldError::ModulusOverflow);
        }
        Ok(Self(int))
    }
}

impl Add for Field {
    type Output = Field;

    fn add(self, rhs: Self) -> Self {
        Self(FP32.add(u64::from(self.0), u64::from(rhs.0)) as u32)
    }
}

impl AddAssign for Field {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Field {
    type Output = Field;

    fn sub(self, rhs: Self) -> Self {
        Self(FP32.sub(u64::from(self.0), u64::from(rhs.0)) as u32)
    }
}

impl SubAssign for Field {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul for Field {
    type Output = Field;

    fn mul(self, rhs: Self) -> Self {
        Self(FP32.mul(u64::from(self.0), u64::from(rhs.0)) as u32)
    }
}

impl MulAssign for Field {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Neg for Field {
    type Output = Field;

    fn neg(self) -> Self {
        Self(FP32.neg(u64::from(self.0)) as u32)
    }
}

impl ConstantTimeEq for Field {
    fn ct_eq(&self, rhs: &Self) -> Choice {
        self.0.ct_eq(&rhs.0)
    }
}

impl PartialEq for Field {
    fn eq(&self, rhs: &Self) -> bool {
        self.ct_eq(rhs).into()
    }
}

impl Eq for Field {}

impl From<u32> for Field {
    fn from(x: u32) -> Self {
        Self(FP32.elem(u64::from(x)) as u32)
    }
}

impl From<Field> for u32 {
    fn from(x: Field) -> Self {
        x.0
    }
}

impl PartialEq<u32> for Field {
    fn eq(&self, rhs: &u32) -> bool {
        self.0 == *rhs
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Encode for Field {
    fn encode(&self, bytes: &mut Vec<u8>) -> Result<(), CodecError> {
        bytes.extend_from_slice(&self.0.to_le_bytes());
        Ok(())
    }
}

impl Decode for Field {
    fn decode(bytes: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::try_from_reader(bytes).map_err(|e| match e {
            FieldError::ShortRead => CodecError::Io(std::io::ErrorKind::UnexpectedEof.into()),
            _ => CodecError::UnexpectedValue,
        })
    }
}

/// Returns a vector of `len` independently sampled random field elements.
///
/// # Errors
///
/// Fails if the entropy source is unavailable.
pub fn random_vector(len: usize) -> Result<Vec<Field>, FieldError> {
    (0..len).map(|_| Field::random()).collect()
}

/// Merge two vectors of fields by summing other_vector into accumulator.
///
/// # Errors
///
/// Fails if the two vectors do not have the same length.
pub fn merge_vector(accumulator: &mut [Field], other_vector: &[Field]) -> Result<(), FieldError> {
    if accumulator.len() != other_vector.len() {
        return Err(FieldError::InputSizeMismatch);
    }
    for (a, o) in accumulator.iter_mut().zip(other_vector.iter()) {
        *a += *o;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_arithmetic() {
        // add
        assert_eq!(Field::from(MODULUS - 1) + Field::from(1), 0);
        assert_eq!(Field::from(MODULUS - 2) + Field::from(2), 0);
        assert_eq!(Field::from(MODULUS - 2) + Field::from(3), 1);
        assert_eq!(Field::from(1) + Field::from(1), 2);
        assert_eq!(Field::from(2) + Field::from(MODULUS), 2);
        assert_eq!(Field::from(3) + Field::from(MODULUS - 1), 2);

        // sub
        assert_eq!(Field::from(0) - Field::from(1), MODULUS - 1);
        assert_eq!(Field::from(1) - Field::from(2), MODULUS - 1);
        assert_eq!(Field::from(15) - Field::from(3), 12);
        assert_eq!(Field::from(2) - Field::from(MODULUS), 2);
        assert_eq!(Field::from(3) - Field::from(MODULUS - 1), 4);
        assert_eq!(-Field::from(1), MODULUS - 1);

        // add + sub
        for _ in 0..100 {
            let f = Field::random().unwrap();
            let g = Field::random().unwrap();
            assert_eq!(f + g - f - g, 0);
            assert_eq!(f + g - g, f);
            assert_eq!(f + g - f, g);
        }

        // mul
        assert_eq!(Field::from(35) * Field::from(123), 4305);
        assert_eq!(Field::from(1) * Field::from(MODULUS), 0);
        assert_eq!(Field::from(0) * Field::from(123), 0);
        assert_eq!(Field::from(123123123) * Field::from(123123123), 1237630077);

        // inv
        assert_matches!(Field::zero().inv(), Err(FieldError::InverseOfZero));
        for _ in 0..100 {
            let f = Field::random().unwrap();
            if f == 0 {
                continue;
            }
            assert_eq!(f * f.inv().unwrap(), 1);
        }
        assert_eq!(
            Field::from(1237630077) * Field::from(123123123).inv().unwrap(),
            123123123
        );

        // pow
        assert_eq!(Field::from(2).pow(3), 8);
        assert_eq!(Field::from(3).pow(9), 19683);
        assert_eq!(Field::from(51).pow(27), 3760729523);
        assert_eq!(Field::from(432).pow(0), 1);
        assert_eq!(Field::zero().pow(123), 0);
        assert_eq!(Field::generator().pow(N_ROOTS), 1);
    }

    #[test]
    fn test_encoding() {
        let value = Field::from(MODULUS - 1);
        let bytes = value.get_encoded().unwrap();
        assert_eq!(bytes, (MODULUS - 1).to_le_bytes());
        assert_eq!(Field::get_decoded(&bytes).unwrap(), value);
        assert_eq!(Field::from(1).get_encoded().unwrap(), [1, 0, 0, 0]);

        assert_matches!(
            Field::try_from_reader(&mut &bytes[..3]),
            Err(FieldError::ShortRead)
        );
        assert_matches!(
            Field::try_from_reader(&mut &MODULUS.to_le_bytes()[..]),
            Err(FieldError::ModulusOverflow)
        );
        assert_matches!(
            Field::get_decoded(&u32::MAX.to_le_bytes()),
            Err(CodecError::UnexpectedValue)
        );
    }

    #[test]
    fn test_accumulate() {
        let mut lhs = vec![Field::from(1); 10];
        let rhs = vec![Field::from(2); 10];

        merge_vector(&mut lhs, &rhs).unwrap();

        lhs.iter().for_each(|f| assert_eq!(*f, 3));
        rhs.iter().for_each(|f| assert_eq!(*f, 2));

        let wrong_len = vec![Field::zero(); 9];
        let result = merge_vector(&mut lhs, &wrong_len);
        assert_matches!(result, Err(FieldError::InputSizeMismatch));
    }

    #[test]
    fn random_is_reduced() {
        let v = random_vector(1000).unwrap();
        assert!(v.iter().all(|f| u32::from(*f) < MODULUS));
    }
}
