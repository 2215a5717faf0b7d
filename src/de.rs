//! Deserialization of single values from MessagePack.
//!
//! Mirrors the layout produced by [`encode_value`][crate::encode_value]: structs may come in as maps or as arrays,
//! enum variants as a string or a single-entry map.

use serde::de::Error as DeError;
use serde::de::*;

use crate::depth_tracking::DepthTracker;
use crate::{
    element::*,
    error::{Error, Result},
    marker::Marker,
};

/// Deserialize a single value from the start of `data`, returning it along with the number of
/// bytes it occupied.
pub fn decode_value<'de, T: Deserialize<'de>>(data: &'de [u8]) -> Result<(T, usize)> {
    let mut de = PackDeserializer::new(data);
    let value = T::deserialize(&mut de)?;
    Ok((value, de.parser.consumed()))
}

pub(crate) struct PackDeserializer<'a> {
    depth_tracking: DepthTracker,
    parser: Parser<'a>,
}

impl<'a> PackDeserializer<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self {
            depth_tracking: DepthTracker::new(),
            parser: Parser::new(buf),
        }
    }

    fn next_elem(&mut self) -> Result<Element<'a>> {
        let elem = self.parser.next().ok_or(Error::LengthTooShort {
            step: "get next value",
            actual: 0,
            expected: 1,
        })??;
        self.depth_tracking.update_elem(&elem)?;
        Ok(elem)
    }

    fn peek_marker(&self) -> Result<Marker> {
        self.parser.peek_marker().ok_or(Error::LengthTooShort {
            step: "peek next value",
            actual: 0,
            expected: 1,
        })
    }
}

impl<'de, 'a> serde::Deserializer<'de> for &'a mut PackDeserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let elem = self.next_elem()?;
        match elem {
            Element::Null => visitor.visit_unit(),
            Element::Bool(v) => visitor.visit_bool(v),
            Element::UInt(v) => visitor.visit_u64(v),
            Element::Int(v) => visitor.visit_i64(v),
            Element::Str(v) => visitor.visit_borrowed_str(v),
            Element::F32(v) => visitor.visit_f32(v),
            Element::F64(v) => visitor.visit_f64(v),
            Element::Bin(v) => visitor.visit_borrowed_bytes(v),
            Element::Array(len) => visitor.visit_seq(SeqAccess::new(self, len)),
            Element::Map(len) => visitor.visit_map(MapAccess::new(self, len)),
            Element::Ext(..) => Err(Error::invalid_type(
                elem.unexpected(),
                &"a value without an extension type",
            )),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.peek_marker()? == Marker::Null {
            self.next_elem()?;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_enum(EnumAccess::new(self))
    }

    fn is_human_readable(&self) -> bool {
        false
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str
        string bytes byte_buf unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

struct EnumAccess<'a, 'de> {
    de: &'a mut PackDeserializer<'de>,
    has_value: bool,
}

impl<'a, 'de> EnumAccess<'a, 'de> {
    fn new(de: &'a mut PackDeserializer<'de>) -> Self {
        Self {
            de,
            has_value: false,
        }
    }
}

impl<'a, 'de> serde::de::EnumAccess<'de> for EnumAccess<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(mut self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let val = match self.de.peek_marker()? {
            Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => {
                match self.de.next_elem()? {
                    Element::Map(1) => (),
                    elem => {
                        return Err(Error::invalid_type(elem.unexpected(), &"a size-1 map"))
                    }
                }
                self.has_value = true;
                seed.deserialize(&mut *self.de)?
            }
            Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 => {
                self.has_value = false;
                seed.deserialize(&mut *self.de)?
            }
            _ => {
                return Err(Error::SerdeFail(
                    "expected a size-1 map or a string".to_string(),
                ))
            }
        };
        Ok((val, self))
    }
}

impl<'a, 'de> serde::de::VariantAccess<'de> for EnumAccess<'a, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        if self.has_value {
            Err(Error::SerdeFail(
                "invalid type: non-unit variant, expected unit variant".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        if self.has_value {
            seed.deserialize(&mut *self.de)
        } else {
            Err(Error::SerdeFail(
                "invalid type: unit variant, expected newtype variant".to_string(),
            ))
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.has_value {
            serde::Deserializer::deserialize_map(self.de, visitor)
        } else {
            Err(Error::SerdeFail(
                "invalid type: unit variant, expected struct variant".to_string(),
            ))
        }
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.has_value {
            serde::Deserializer::deserialize_tuple(self.de, len, visitor)
        } else {
            Err(Error::SerdeFail(
                "invalid type: unit variant, expected tuple variant".to_string(),
            ))
        }
    }
}

struct SeqAccess<'a, 'de> {
    de: &'a mut PackDeserializer<'de>,
    size_left: usize,
}

impl<'a, 'de> SeqAccess<'a, 'de> {
    fn new(de: &'a mut PackDeserializer<'de>, len: usize) -> Self {
        Self { de, size_left: len }
    }
}

impl<'a, 'de> serde::de::SeqAccess<'de> for SeqAccess<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        if self.size_left > 0 {
            self.size_left -= 1;
            let val = seed.deserialize(&mut *self.de)?;
            Ok(Some(val))
        } else {
            Ok(None)
        }
    }

    fn size_hint(&self) -> Option<usize> {
        // Don't let a corrupt length drive a huge up-front allocation
        Some(self.size_left.min(self.de.parser.remaining().len()))
    }
}

struct MapAccess<'a, 'de> {
    de: &'a mut PackDeserializer<'de>,
    size_left: usize,
}

impl<'a, 'de> MapAccess<'a, 'de> {
    fn new(de: &'a mut PackDeserializer<'de>, len: usize) -> Self {
        Self { de, size_left: len }
    }
}

impl<'a, 'de> serde::de::MapAccess<'de> for MapAccess<'a, 'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        if self.size_left > 0 {
            self.size_left -= 1;
            Ok(Some(seed.deserialize(&mut *self.de)?))
        } else {
            Ok(None)
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.size_left.min(self.de.parser.remaining().len()))
    }
}
