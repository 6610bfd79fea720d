// SPDX-License-Identifier: MPL-2.0

//! Support for encoding and decoding messages to or from the byte sequences carried inside
//! encrypted share bundles.
//!
//! Integers and length prefixes are big-endian. Variable-length sequences carry a length prefix
//! counting bytes (for opaque byte strings) or items (for vectors of encodable values).

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

/// An error that occurred during decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An I/O error, most commonly a short read.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// Extra data remained in the input after decoding a value.
    #[error("{0} bytes left in buffer after decoding value")]
    BytesLeftOver(usize),

    /// A value is too long to fit in its length prefix.
    #[error("value of length {0} does not fit in length prefix")]
    LengthPrefixOverflow(usize),

    /// The input decoded to a value that is not permitted in its position.
    #[error("unexpected value")]
    UnexpectedValue,
}

/// Describes how to decode an object from a byte sequence.
pub trait Decode: Sized {
    /// Read and decode an encoded object from `bytes`. On success, the decoded value is returned
    /// and `bytes` is advanced by the encoded size of the value.
    fn decode(bytes: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// Convenience method to get a decoded value. Returns an error if [`Self::decode`] fails or
    /// if any input is left over.
    fn get_decoded(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(bytes);
        let decoded = Self::decode(&mut cursor)?;
        let remaining = bytes.len() - cursor.position() as usize;
        if remaining != 0 {
            return Err(CodecError::BytesLeftOver(remaining));
        }
        Ok(decoded)
    }
}

/// Describes how to encode objects into a byte sequence.
pub trait Encode {
    /// Append the encoded form of this object to the end of `bytes`.
    fn encode(&self, bytes: &mut Vec<u8>) -> Result<(), CodecError>;

    /// Convenience method to encode a value into a new `Vec<u8>`.
    fn get_encoded(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        self.encode(&mut bytes)?;
        Ok(bytes)
    }
}

impl Decode for u8 {
    fn decode(bytes: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(bytes.read_u8()?)
    }
}

impl Encode for u8 {
    fn encode(&self, bytes: &mut Vec<u8>) -> Result<(), CodecError> {
        bytes.write_u8(*self)?;
        Ok(())
    }
}

impl Decode for u16 {
    fn decode(bytes: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(bytes.read_u16::<BigEndian>()?)
    }
}

impl Encode for u16 {
    fn encode(&self, bytes: &mut Vec<u8>) -> Result<(), CodecError> {
        bytes.write_u16::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode for u32 {
    fn decode(bytes: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(bytes.read_u32::<BigEndian>()?)
    }
}

impl Encode for u32 {
    fn encode(&self, bytes: &mut Vec<u8>) -> Result<(), CodecError> {
        bytes.write_u32::<BigEndian>(*self)?;
        Ok(())
    }
}

/// Encode `opaque` as a byte string with a two-byte length prefix.
pub fn encode_u16_opaque(bytes: &mut Vec<u8>, opaque: &[u8]) -> Result<(), CodecError> {
    let len =
        u16::try_from(opaque.len()).map_err(|_| CodecError::LengthPrefixOverflow(opaque.len()))?;
    len.encode(bytes)?;
    bytes.extend_from_slice(opaque);
    Ok(())
}

/// Decode a byte string with a two-byte length prefix.
pub fn decode_u16_opaque(bytes: &mut Cursor<&[u8]>) -> Result<Vec<u8>, CodecError> {
    let len = usize::from(u16::decode(bytes)?);
    let mut opaque = vec![0; len];
    bytes.read_exact(&mut opaque)?;
    Ok(opaque)
}

/// Encode `items` with a four-byte prefix counting the items.
pub fn encode_u32_items<E: Encode>(bytes: &mut Vec<u8>, items: &[E]) -> Result<(), CodecError> {
    let len =
        u32::try_from(items.len()).map_err(|_| CodecError::LengthPrefixOverflow(items.len()))?;
    len.encode(bytes)?;
    for item in items {
        item.encode(bytes)?;
    }
    Ok(())
}

/// Decode a sequence of items with a four-byte prefix counting the items. The prefix is checked
/// against the remaining input before anything is allocated.
pub fn decode_u32_items<D: Decode>(
    min_item_len: usize,
    bytes: &mut Cursor<&[u8]>,
) -> Result<Vec<D>, CodecError> {
    let len = u32::decode(bytes)? as usize;
    let remaining = bytes.get_ref().len() - bytes.position() as usize;
    if len.saturating_mul(min_item_len) > remaining {
        return Err(CodecError::Io(std::io::ErrorKind::UnexpectedEof.into()));
    }
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(D::decode(bytes)?);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn opaque_prefix() {
        let mut bytes = Vec::new();
        encode_u16_opaque(&mut bytes, b"batch").unwrap();
        assert_eq!(bytes, [0, 5, b'b', b'a', b't', b'c', b'h']);

        let decoded = decode_u16_opaque(&mut Cursor::new(&bytes[..])).unwrap();
        assert_eq!(decoded, b"batch");

        assert_matches!(
            decode_u16_opaque(&mut Cursor::new(&bytes[..4])),
            Err(CodecError::Io(_))
        );

        let too_long = vec![0; 1 << 16];
        assert_matches!(
            encode_u16_opaque(&mut Vec::new(), &too_long),
            Err(CodecError::LengthPrefixOverflow(65536))
        );
    }

    #[test]
    fn items_prefix() {
        let mut bytes = Vec::new();
        encode_u32_items(&mut bytes, &[1u16, 2, 0xffff]).unwrap();
        assert_eq!(bytes, [0, 0, 0, 3, 0, 1, 0, 2, 0xff, 0xff]);

        let items: Vec<u16> = decode_u32_items(2, &mut Cursor::new(&bytes[..])).unwrap();
        assert_eq!(items, [1, 2, 0xffff]);

        // A length prefix claiming more items than the input holds.
        let bogus = [0xff, 0xff, 0xff, 0xff, 0, 1];
        assert_matches!(
            decode_u32_items::<u16>(2, &mut Cursor::new(&bogus[..])),
            Err(CodecError::Io(_))
        );
    }

    #[test]
    fn leftover_bytes() {
        assert_eq!(u16::get_decoded(&[1, 2]).unwrap(), 0x0102);
        assert_matches!(
            u16::get_decoded(&[1, 2, 3]),
            Err(CodecError::BytesLeftOver(1))
        );
    }
}
