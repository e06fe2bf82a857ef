//! Deterministic binary encoding for cache records.
//!
//! Layout rules, applied uniformly:
//! - fixed-width integers and floats are little-endian
//! - variable-length values (strings, byte strings, lists) carry a `u32` length
//!   prefix and are never terminated
//! - booleans are a single `0` or `1` byte, options a `0`/`1` tag then the value
//! - structs are framed: a `u32` length prefix followed by the fields in order
//!
//! The same logical value always encodes to the same bytes.

use chain_cache_types::{Address, Hash};
use thiserror::Error;

/// Upper bound on any single length-prefixed field or list.
pub const MAX_FIELD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CodecError {
    /// Bytes are inconsistent with the layout (short buffer, bad length, bad tag).
    #[error("corrupt data: {0}")]
    Corrupt(String),
    /// Payload written by a newer schema than this build understands.
    #[error("schema version {found} is newer than supported version {supported}")]
    SchemaMismatch { found: u16, supported: u16 },
}

impl CodecError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt(reason.into())
    }

    fn truncated(needed: usize, available: usize) -> Self {
        Self::Corrupt(format!(
            "needed {needed} bytes, only {available} available"
        ))
    }

    /// Prefix a corruption reason with the field being decoded.
    pub fn with_context(self, field: &str) -> Self {
        match self {
            Self::Corrupt(reason) => Self::Corrupt(format!("{field}: {reason}")),
            other => other,
        }
    }
}

/// Trait for writing a value in the cache byte layout.
pub trait Encode {
    fn encode(&self, buf: &mut Vec<u8>);

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

/// Trait for reading a value back.
///
/// Implementors provide [`decode_unfinished`](Decode::decode_unfinished), which
/// returns the value and the bytes that follow it; consumers call
/// [`decode`](Decode::decode), which also rejects trailing bytes.
pub trait Decode: Sized {
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError>;

    fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let (value, rest) = Self::decode_unfinished(buf)?;
        if !rest.is_empty() {
            return Err(CodecError::corrupt(format!(
                "{} trailing bytes",
                rest.len()
            )));
        }
        Ok(value)
    }
}

fn split_fixed<const N: usize>(buf: &[u8]) -> Result<([u8; N], &[u8]), CodecError> {
    if buf.len() < N {
        return Err(CodecError::truncated(N, buf.len()));
    }
    let (head, rest) = buf.split_at(N);
    let mut out = [0u8; N];
    out.copy_from_slice(head);
    Ok((out, rest))
}

macro_rules! impl_fixed_int {
    ($($ty:ty),*) => {
        $(
            impl Encode for $ty {
                fn encode(&self, buf: &mut Vec<u8>) {
                    buf.extend_from_slice(&self.to_le_bytes());
                }
            }

            impl Decode for $ty {
                fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError> {
                    let (bytes, rest) = split_fixed::<{ std::mem::size_of::<$ty>() }>(buf)?;
                    Ok((<$ty>::from_le_bytes(bytes), rest))
                }
            }
        )*
    };
}

impl_fixed_int!(u8, u16, u32, u64, i64);

impl Encode for f64 {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.to_bits().encode(buf);
    }
}

impl Decode for f64 {
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let (bits, rest) = u64::decode_unfinished(buf)?;
        Ok((f64::from_bits(bits), rest))
    }
}

impl Encode for bool {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(u8::from(*self));
    }
}

impl Decode for bool {
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let (byte, rest) = u8::decode_unfinished(buf)?;
        match byte {
            0 => Ok((false, rest)),
            1 => Ok((true, rest)),
            other => Err(CodecError::corrupt(format!(
                "malformed boolean 0x{other:02x}"
            ))),
        }
    }
}

/// Oversized lengths still encode; the decoder rejects them, and stores refuse
/// any key or payload over [`MAX_FIELD_BYTES`] before it reaches disk.
fn encode_len(len: usize, buf: &mut Vec<u8>) {
    u32::try_from(len).unwrap_or(u32::MAX).encode(buf);
}

/// Check that `len` bytes fit in one length-prefixed field.
pub fn check_field_len(field: &str, len: usize) -> Result<(), CodecError> {
    if len > MAX_FIELD_BYTES {
        return Err(CodecError::corrupt(format!(
            "{field} of {len} bytes exceeds limit of {MAX_FIELD_BYTES}"
        )));
    }
    Ok(())
}

fn decode_len(buf: &[u8]) -> Result<(usize, &[u8]), CodecError> {
    let (len, rest) = u32::decode_unfinished(buf)?;
    let len = len as usize;
    if len > MAX_FIELD_BYTES {
        return Err(CodecError::corrupt(format!(
            "length {len} exceeds limit of {MAX_FIELD_BYTES}"
        )));
    }
    Ok((len, rest))
}

/// Write a length-prefixed byte string.
pub fn encode_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
    encode_len(bytes.len(), buf);
    buf.extend_from_slice(bytes);
}

/// Read a length-prefixed byte string, borrowing from the input.
pub fn decode_bytes(buf: &[u8]) -> Result<(&[u8], &[u8]), CodecError> {
    let (len, rest) = decode_len(buf)?;
    if rest.len() < len {
        return Err(CodecError::truncated(len, rest.len()));
    }
    Ok(rest.split_at(len))
}

impl Encode for str {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl Encode for String {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.as_str().encode(buf);
    }
}

impl Decode for String {
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let (bytes, rest) = decode_bytes(buf)?;
        let text = std::str::from_utf8(bytes)
            .map_err(|_| CodecError::corrupt("string is not valid utf-8"))?;
        Ok((text.to_string(), rest))
    }
}

// A Vec<u8> written through this impl has the same layout as `encode_bytes`.
impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_len(self.len(), buf);
        for item in self {
            item.encode(buf);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let (count, mut rest) = decode_len(buf)?;
        // Every element takes at least one byte, so a count beyond the buffer is corrupt.
        if count > rest.len() {
            return Err(CodecError::truncated(count, rest.len()));
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let (item, next) = T::decode_unfinished(rest)?;
            items.push(item);
            rest = next;
        }
        Ok((items, rest))
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            None => buf.push(0),
            Some(value) => {
                buf.push(1);
                value.encode(buf);
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let (tag, rest) = u8::decode_unfinished(buf)?;
        match tag {
            0 => Ok((None, rest)),
            1 => {
                let (value, rest) = T::decode_unfinished(rest)?;
                Ok((Some(value), rest))
            }
            other => Err(CodecError::corrupt(format!(
                "malformed option tag 0x{other:02x}"
            ))),
        }
    }
}

impl Encode for Address {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Decode for Address {
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let (bytes, rest) = split_fixed::<{ Address::LENGTH }>(buf)?;
        Ok((Address::new(bytes), rest))
    }
}

impl Encode for Hash {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Decode for Hash {
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let (bytes, rest) = split_fixed::<{ Hash::LENGTH }>(buf)?;
        Ok((Hash::new(bytes), rest))
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, buf: &mut Vec<u8>) {
        (**self).encode(buf);
    }
}

/// # Struct encoding helper
///
/// Collects fields in order and writes them as one framed payload on
/// [`finish`](Encoder::finish).
///
/// ```
/// use chain_cache_store::codec::{Decoder, Encoder};
///
/// let mut buf = Vec::new();
/// Encoder::new(&mut buf)
///     .encode_field(&7u64)
///     .encode_field("seven")
///     .finish();
///
/// let decoder = Decoder::new(&buf).unwrap();
/// let (number, decoder) = decoder.decode_field::<u64>("number").unwrap();
/// let (name, decoder) = decoder.decode_field::<String>("name").unwrap();
/// assert!(decoder.finish().unwrap().is_empty());
/// assert_eq!((number, name.as_str()), (7, "seven"));
/// ```
#[must_use = "`Encoder` must be consumed with `finish` to write the struct"]
pub struct Encoder<'a> {
    buf: &'a mut Vec<u8>,
    payload: Vec<u8>,
}

impl<'a> Encoder<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self {
            buf,
            payload: Vec::new(),
        }
    }

    pub fn encode_field<T: Encode + ?Sized>(mut self, value: &T) -> Self {
        value.encode(&mut self.payload);
        self
    }

    /// Write a byte string without going through `Vec<T>` element encoding.
    pub fn encode_bytes(mut self, value: &[u8]) -> Self {
        encode_bytes(value, &mut self.payload);
        self
    }

    pub fn finish(self) {
        encode_bytes(&self.payload, self.buf);
    }
}

/// # Struct decoding helper
///
/// Reads a framed payload written by [`Encoder`]. Fields must be requested in
/// the order they were encoded.
#[derive(Debug)]
#[must_use = "`Decoder` must be consumed with `finish` to perform decoding checks"]
pub struct Decoder<'a> {
    payload: &'a [u8],
    remaining: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Result<Self, CodecError> {
        let (payload, remaining) = decode_bytes(buf)?;
        Ok(Self { payload, remaining })
    }

    pub fn decode_field<T: Decode>(self, name: &str) -> Result<(T, Self), CodecError> {
        let (field, rest) =
            T::decode_unfinished(self.payload).map_err(|err| err.with_context(name))?;
        Ok((
            field,
            Self {
                payload: rest,
                ..self
            },
        ))
    }

    pub fn decode_bytes(self, name: &str) -> Result<(Vec<u8>, Self), CodecError> {
        let (bytes, rest) = decode_bytes(self.payload).map_err(|err| err.with_context(name))?;
        Ok((
            bytes.to_vec(),
            Self {
                payload: rest,
                ..self
            },
        ))
    }

    /// Returns the bytes after the struct. Fails if any field was left unread.
    pub fn finish(self) -> Result<&'a [u8], CodecError> {
        if self.payload.is_empty() {
            Ok(self.remaining)
        } else {
            Err(CodecError::corrupt(format!(
                "{} unread bytes in struct",
                self.payload.len()
            )))
        }
    }

    /// Like [`finish`](Decoder::finish), but also rejects bytes after the struct.
    pub fn finish_all(self) -> Result<(), CodecError> {
        let rest = self.finish()?;
        if rest.is_empty() {
            Ok(())
        } else {
            Err(CodecError::corrupt(format!(
                "{} trailing bytes after struct",
                rest.len()
            )))
        }
    }
}

/// Prefix `body` with a `u16` schema version.
pub fn encode_versioned(version: u16, body: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
    let mut buf = Vec::new();
    version.encode(&mut buf);
    body(&mut buf);
    buf
}

/// Split a versioned payload, refusing versions newer than `supported`.
pub fn decode_versioned(bytes: &[u8], supported: u16) -> Result<(u16, &[u8]), CodecError> {
    let (version, rest) = u16::decode_unfinished(bytes)?;
    if version == 0 {
        return Err(CodecError::corrupt("schema version 0"));
    }
    if version > supported {
        return Err(CodecError::SchemaMismatch {
            found: version,
            supported,
        });
    }
    Ok((version, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_field_length_limit() {
        assert!(check_field_len("payload", MAX_FIELD_BYTES).is_ok());
        let err = check_field_len("payload", MAX_FIELD_BYTES + 1).unwrap_err();
        assert!(err.to_string().contains("payload"));

        let mut buf = Vec::new();
        encode_len(usize::MAX, &mut buf);
        assert_eq!(buf, vec![0xff; 4]);
        assert!(matches!(decode_len(&buf), Err(CodecError::Corrupt(_))));
    }

    #[test]
    fn test_integers_are_little_endian() {
        assert_eq!(0x0102u16.encode_to_vec(), vec![0x02, 0x01]);
        assert_eq!(1u64.encode_to_vec(), vec![1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!((-1i64).encode_to_vec(), vec![0xff; 8]);
    }

    #[test]
    fn test_strings_are_length_prefixed() {
        let bytes = "a|b".to_string().encode_to_vec();
        assert_eq!(bytes, vec![3, 0, 0, 0, b'a', b'|', b'b']);
    }

    #[test]
    fn test_truncated_string_is_corrupt() {
        let mut bytes = "hello".to_string().encode_to_vec();
        bytes.pop();
        assert!(matches!(
            String::decode(&bytes),
            Err(CodecError::Corrupt(_))
        ));
    }

    #[test]
    fn test_oversized_length_is_corrupt() {
        let bytes = u32::MAX.encode_to_vec();
        assert!(matches!(
            Vec::<u8>::decode(&bytes),
            Err(CodecError::Corrupt(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = 5u32.encode_to_vec();
        bytes.push(0);
        assert!(u32::decode(&bytes).is_err());
    }

    #[test]
    fn test_malformed_bool() {
        let err = bool::decode(&[2]).unwrap_err();
        assert_eq!(err, CodecError::corrupt("malformed boolean 0x02"));
    }

    #[test]
    fn test_decoder_reports_field_context() {
        let mut buf = Vec::new();
        Encoder::new(&mut buf).encode_field(&1u8).finish();
        let decoder = Decoder::new(&buf).unwrap();
        let (_, decoder) = decoder.decode_field::<u8>("first").unwrap();
        let err = decoder.decode_field::<u64>("second").unwrap_err();
        assert!(err.to_string().contains("second"));
    }

    #[test]
    fn test_decoder_rejects_unread_fields() {
        let mut buf = Vec::new();
        Encoder::new(&mut buf)
            .encode_field(&1u8)
            .encode_field(&2u8)
            .finish();
        let decoder = Decoder::new(&buf).unwrap();
        let (_, decoder) = decoder.decode_field::<u8>("first").unwrap();
        assert!(decoder.finish().is_err());
    }

    #[test]
    fn test_versioned_envelope() {
        let bytes = encode_versioned(2, |buf| 9u8.encode(buf));
        let (version, body) = decode_versioned(&bytes, 2).unwrap();
        assert_eq!(version, 2);
        assert_eq!(body, &[9]);

        assert_eq!(
            decode_versioned(&bytes, 1),
            Err(CodecError::SchemaMismatch {
                found: 2,
                supported: 1
            })
        );
        assert!(decode_versioned(&[0, 0], 1).is_err());
    }

    proptest! {
        #[test]
        fn prop_string_list_round_trips(values in proptest::collection::vec(".*", 0..8)) {
            let bytes = values.encode_to_vec();
            prop_assert_eq!(Vec::<String>::decode(&bytes).unwrap(), values);
        }

        #[test]
        fn prop_optional_u64_round_trips(value in proptest::option::of(any::<u64>())) {
            let bytes = value.encode_to_vec();
            prop_assert_eq!(Option::<u64>::decode(&bytes).unwrap(), value);
        }

        #[test]
        fn prop_arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = Vec::<String>::decode(&bytes);
            let _ = Decoder::new(&bytes).map(|d| d.decode_field::<u64>("x"));
        }
    }
}
