// SPDX-License-Identifier: MPL-2.0

//! Additive secret sharing of field elements between two servers.

use crate::field::{Field, FieldError};

/// Splits `value` into `(r, value - r)` for a fresh uniformly random `r`.
///
/// Each half on its own is uniformly distributed and independent of `value`.
///
/// # Errors
///
/// Fails if the entropy source is unavailable.
pub fn split(value: Field) -> Result<(Field, Field), FieldError> {
    let r = Field::random()?;
    Ok((r, value - r))
}

/// Splits each element of `values` with [`split`], drawing fresh randomness per position.
pub fn split_vector(values: &[Field]) -> Result<(Vec<Field>, Vec<Field>), FieldError> {
    let mut share1 = Vec::with_capacity(values.len());
    let mut share2 = Vec::with_capacity(values.len());
    for value in values {
        let (s1, s2) = split(*value)?;
        share1.push(s1);
        share2.push(s2);
    }
    Ok((share1, share2))
}

/// Adds two share vectors coordinatewise. Returns `None` if their lengths differ.
pub fn reconstruct_shares(share1: &[Field], share2: &[Field]) -> Option<Vec<Field>> {
    if share1.len() != share2.len() {
        return None;
    }

    Some(
        share1
            .iter()
            .zip(share2.iter())
            .map(|(s1, s2)| *s1 + *s2)
            .collect(),
    )
}
