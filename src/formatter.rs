//! Per-element encoding and decoding.
//!
//! Chunk framing doesn't care how an element's bytes look, only that each one is a single
//! complete MessagePack value. [`ElementEncoder`] and [`ElementDecoder`] are the seam where the
//! element representation gets plugged in; [`SerdeFormatter`] covers anything that implements
//! serde's traits.

use serde::{de::DeserializeOwned, Serialize};

use crate::{de::decode_value, error::Result, ser::encode_value};

/// Appends the MessagePack encoding of one element to a buffer.
///
/// The appended bytes must form exactly one MessagePack value. On error, the buffer may hold a
/// partially written value; the caller is expected to discard it.
pub trait ElementEncoder<T: ?Sized> {
    fn encode(&self, buf: &mut Vec<u8>, value: &T) -> Result<()>;
}

/// Decodes one element from the start of a byte slice, returning it along with the number of
/// bytes it occupied.
pub trait ElementDecoder<T> {
    fn decode(&self, data: &[u8]) -> Result<(T, usize)>;
}

impl<T: ?Sized, E: ElementEncoder<T> + ?Sized> ElementEncoder<T> for &E {
    fn encode(&self, buf: &mut Vec<u8>, value: &T) -> Result<()> {
        (**self).encode(buf, value)
    }
}

impl<T, D: ElementDecoder<T> + ?Sized> ElementDecoder<T> for &D {
    fn decode(&self, data: &[u8]) -> Result<(T, usize)> {
        (**self).decode(data)
    }
}

/// Encodes and decodes elements through serde.
///
/// Structs are written as maps keyed by field name, enums as either the variant name or a
/// single-entry map from variant name to contents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SerdeFormatter;

impl<T: Serialize + ?Sized> ElementEncoder<T> for SerdeFormatter {
    fn encode(&self, buf: &mut Vec<u8>, value: &T) -> Result<()> {
        encode_value(buf, value)
    }
}

impl<T: DeserializeOwned> ElementDecoder<T> for SerdeFormatter {
    fn decode(&self, data: &[u8]) -> Result<(T, usize)> {
        decode_value(data)
    }
}
