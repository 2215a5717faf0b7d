//! Serialization of single values into MessagePack.
//!
//! Structs are written as maps keyed by field name, in declaration order. Enum variants, when
//! mapped, are:
//! - Unit - Just the variant name as a string
//! - Newtype - Map with one pair. Key is variant name, content is the value
//! - Tuple - Map with one pair. Key is variant name, content is the tuple as an array
//! - Struct - Map with one pair. Key is variant name, content is the struct
//!
//! Sequences and maps of unknown length get a fixed-width header that is filled in once the
//! last item has been written.

use serde::ser::*;
use std::convert::TryFrom;

use crate::depth_tracking::DepthTracker;
use crate::element::*;
use crate::error::{Error, Result};

/// Serialize a single value onto the end of `buf`.
///
/// On failure, `buf` may hold a partially written value.
pub fn encode_value<T: Serialize + ?Sized>(buf: &mut Vec<u8>, value: &T) -> Result<()> {
    let mut ser = PackSerializer::new(buf);
    value.serialize(&mut ser)
}

pub(crate) struct PackSerializer<'b> {
    depth_tracking: DepthTracker,
    buf: &'b mut Vec<u8>,
}

impl<'b> PackSerializer<'b> {
    pub(crate) fn new(buf: &'b mut Vec<u8>) -> Self {
        PackSerializer {
            depth_tracking: DepthTracker::new(),
            buf,
        }
    }

    fn encode_element(&mut self, elem: Element) -> Result<()> {
        let len = match elem {
            Element::Str(v) => v.len(),
            Element::Bin(v) => v.len(),
            Element::Array(len) | Element::Map(len) => len,
            _ => 0,
        };
        if len > u32::MAX as usize {
            return Err(Error::LengthTooLong {
                max: u32::MAX as usize,
                actual: len,
            });
        }
        self.depth_tracking.update_elem(&elem)?;
        serialize_elem(self.buf, elem);
        Ok(())
    }

    /// Reserve a fixed-width header for a container of unknown length, returning its position.
    fn reserve_header(&mut self, placeholder: Element) -> Result<usize> {
        self.depth_tracking.update_elem(&placeholder)?;
        let pos = self.buf.len();
        self.buf.extend_from_slice(&[0u8; ARRAY32_LEN]);
        Ok(pos)
    }

    fn patch_len(len: usize) -> Result<u32> {
        u32::try_from(len).map_err(|_| Error::LengthTooLong {
            max: u32::MAX as usize,
            actual: len,
        })
    }
}

impl<'a, 'b> Serializer for &'a mut PackSerializer<'b> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = SeqSerializer<'a, 'b>;
    type SerializeTuple = TupleSerializer<'a, 'b>;
    type SerializeTupleStruct = TupleSerializer<'a, 'b>;
    type SerializeTupleVariant = TupleSerializer<'a, 'b>;
    type SerializeMap = MapSerializer<'a, 'b>;
    type SerializeStruct = StructSerializer<'a, 'b>;
    type SerializeStructVariant = StructSerializer<'a, 'b>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.encode_element(Element::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.encode_element(Element::Int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.encode_element(Element::UInt(v))
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.encode_element(Element::F32(v))
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.encode_element(Element::F64(v))
    }

    fn serialize_char(self, v: char) -> Result<()> {
        let mut tmp = [0u8; 4];
        self.encode_element(Element::Str(v.encode_utf8(&mut tmp)))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.encode_element(Element::Str(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.encode_element(Element::Bin(v))
    }

    fn serialize_none(self) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_some<T: Serialize + ?Sized>(self, v: &T) -> Result<()> {
        v.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.encode_element(Element::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        v: &T,
    ) -> Result<()> {
        v.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        self.encode_element(Element::Map(1))?;
        self.encode_element(Element::Str(variant))?;
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        SeqSerializer::new(self, len)
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.encode_element(Element::Array(len))?;
        Ok(TupleSerializer::new(self))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        // Tuple structs usually just discard the name
        self.encode_element(Element::Array(len))?;
        Ok(TupleSerializer::new(self))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.encode_element(Element::Map(1))?;
        self.encode_element(Element::Str(variant))?;
        self.encode_element(Element::Array(len))?;
        Ok(TupleSerializer::new(self))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        MapSerializer::new(self, len)
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        self.encode_element(Element::Map(len))?;
        Ok(StructSerializer::new(self))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.encode_element(Element::Map(1))?;
        self.encode_element(Element::Str(variant))?;
        self.encode_element(Element::Map(len))?;
        Ok(StructSerializer::new(self))
    }
}

/// Encode a sequence of possibly unknown length.
///
/// If the length is known, this looks just like the TupleSerializer. If it isn't, we:
///
/// 1. Update the depth tracker with a placeholder Array element
/// 2. Reserve a fixed-width `array 32` header in the buffer
/// 3. Serialize elements directly after it, counting them
/// 4. On end(), overwrite the reserved header with the real count and drop the placeholder
///    from the depth tracker
pub(crate) struct SeqSerializer<'a, 'b> {
    se: &'a mut PackSerializer<'b>,
    unknown_len: Option<(usize, usize)>,
}

impl<'a, 'b> SeqSerializer<'a, 'b> {
    fn new(se: &'a mut PackSerializer<'b>, len: Option<usize>) -> Result<Self> {
        if let Some(len) = len {
            se.encode_element(Element::Array(len))?;
            Ok(Self {
                se,
                unknown_len: None,
            })
        } else {
            let pos = se.reserve_header(Element::Array(u32::MAX as usize))?;
            Ok(Self {
                se,
                unknown_len: Some((0, pos)),
            })
        }
    }
}

impl<'a, 'b> SerializeSeq for SeqSerializer<'a, 'b> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        if let Some((ref mut len, _)) = self.unknown_len {
            *len += 1;
        }
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        if let Some((len, pos)) = self.unknown_len {
            let len = PackSerializer::patch_len(len)?;
            write_array32_header(&mut self.se.buf[pos..], len);
            self.se.depth_tracking.early_end();
        }
        Ok(())
    }
}

pub(crate) struct TupleSerializer<'a, 'b> {
    se: &'a mut PackSerializer<'b>,
}

impl<'a, 'b> TupleSerializer<'a, 'b> {
    fn new(se: &'a mut PackSerializer<'b>) -> Self {
        Self { se }
    }
}

impl<'a, 'b> SerializeTuple for TupleSerializer<'a, 'b> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a, 'b> SerializeTupleStruct for TupleSerializer<'a, 'b> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a, 'b> SerializeTupleVariant for TupleSerializer<'a, 'b> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// Encode a map of possibly unknown length. Works the same way as [`SeqSerializer`], counting
/// key-value pairs and patching a reserved `map 32` header at the end.
pub(crate) struct MapSerializer<'a, 'b> {
    se: &'a mut PackSerializer<'b>,
    unknown_len: Option<(usize, usize)>,
}

impl<'a, 'b> MapSerializer<'a, 'b> {
    fn new(se: &'a mut PackSerializer<'b>, len: Option<usize>) -> Result<Self> {
        if let Some(len) = len {
            se.encode_element(Element::Map(len))?;
            Ok(Self {
                se,
                unknown_len: None,
            })
        } else {
            let pos = se.reserve_header(Element::Map(u32::MAX as usize))?;
            Ok(Self {
                se,
                unknown_len: Some((0, pos)),
            })
        }
    }
}

impl<'a, 'b> SerializeMap for MapSerializer<'a, 'b> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        if let Some((ref mut len, _)) = self.unknown_len {
            *len += 1;
        }
        key.serialize(&mut *self.se)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        if let Some((len, pos)) = self.unknown_len {
            let len = PackSerializer::patch_len(len)?;
            write_map32_header(&mut self.se.buf[pos..], len);
            self.se.depth_tracking.early_end();
        }
        Ok(())
    }
}

pub(crate) struct StructSerializer<'a, 'b> {
    se: &'a mut PackSerializer<'b>,
}

impl<'a, 'b> StructSerializer<'a, 'b> {
    fn new(se: &'a mut PackSerializer<'b>) -> Self {
        Self { se }
    }

    fn serialize_field_inner<T: Serialize + ?Sized>(
        &mut self,
        field: &'static str,
        value: &T,
    ) -> Result<()> {
        self.se.encode_element(Element::Str(field))?;
        value.serialize(&mut *self.se)
    }
}

impl<'a, 'b> SerializeStruct for StructSerializer<'a, 'b> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        field: &'static str,
        value: &T,
    ) -> Result<()> {
        self.serialize_field_inner(field, value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a, 'b> SerializeStructVariant for StructSerializer<'a, 'b> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        field: &'static str,
        value: &T,
    ) -> Result<()> {
        self.serialize_field_inner(field, value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}
