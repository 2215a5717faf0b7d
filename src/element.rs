use crate::error::{Error, Result};
use crate::marker::*;
use serde::de::Unexpected;

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};

/// Size of a forced `array 32` header: marker plus a 4-byte length.
pub const ARRAY32_LEN: usize = 5;
/// Size of a forced `ext 32` header: marker, 4-byte length, and 1-byte type code.
pub const EXT32_HEADER_LEN: usize = 6;
/// Size of a forced `int 32` value: marker plus 4 bytes.
pub const INT32_LEN: usize = 5;

/// One MessagePack token. Arrays and maps only carry their length; their contents follow as
/// separate elements.
#[derive(Clone, Debug, PartialEq)]
pub enum Element<'a> {
    Null,
    Bool(bool),
    UInt(u64),
    Int(i64),
    F32(f32),
    F64(f64),
    Str(&'a str),
    Bin(&'a [u8]),
    Array(usize),
    Map(usize),
    Ext(i8, &'a [u8]),
}

impl<'a> Element<'a> {
    pub fn name(&self) -> &'static str {
        use self::Element::*;
        match self {
            Null => "Null",
            Bool(_) => "Bool",
            UInt(_) | Int(_) => "Int",
            F32(_) => "F32",
            F64(_) => "F64",
            Str(_) => "Str",
            Bin(_) => "Bin",
            Array(_) => "Array",
            Map(_) => "Map",
            Ext(..) => "Ext",
        }
    }

    pub fn unexpected(&self) -> Unexpected {
        use self::Element::*;
        match self {
            Null => Unexpected::Unit,
            Bool(v) => Unexpected::Bool(*v),
            UInt(v) => Unexpected::Unsigned(*v),
            Int(v) => Unexpected::Signed(*v),
            F32(v) => Unexpected::Float(*v as f64),
            F64(v) => Unexpected::Float(*v),
            Str(v) => Unexpected::Str(v),
            Bin(v) => Unexpected::Bytes(v),
            Array(_) => Unexpected::Seq,
            Map(_) => Unexpected::Map,
            Ext(..) => Unexpected::Other("extension type"),
        }
    }
}

fn serialize_uint(buf: &mut Vec<u8>, v: u64) {
    if v <= 127 {
        buf.push(Marker::PosFixInt(v as u8).into());
    } else if v <= u8::MAX as u64 {
        buf.push(Marker::UInt8.into());
        buf.push(v as u8);
    } else if v <= u16::MAX as u64 {
        buf.push(Marker::UInt16.into());
        buf.extend_from_slice(&(v as u16).to_be_bytes());
    } else if v <= u32::MAX as u64 {
        buf.push(Marker::UInt32.into());
        buf.extend_from_slice(&(v as u32).to_be_bytes());
    } else {
        buf.push(Marker::UInt64.into());
        buf.extend_from_slice(&v.to_be_bytes());
    }
}

fn serialize_neg_int(buf: &mut Vec<u8>, v: i64) {
    if v >= -32 {
        buf.push(Marker::NegFixInt(v as i8).into());
    } else if v >= i8::MIN as i64 {
        buf.push(Marker::Int8.into());
        buf.push(v as u8);
    } else if v >= i16::MIN as i64 {
        buf.push(Marker::Int16.into());
        buf.extend_from_slice(&(v as i16).to_be_bytes());
    } else if v >= i32::MIN as i64 {
        buf.push(Marker::Int32.into());
        buf.extend_from_slice(&(v as i32).to_be_bytes());
    } else {
        buf.push(Marker::Int64.into());
        buf.extend_from_slice(&v.to_be_bytes());
    }
}

/// Serialize an element onto a byte vector, using the shortest encoding available. Doesn't
/// check if Array & Map structures make sense, just writes elements out.
pub fn serialize_elem(buf: &mut Vec<u8>, elem: Element) {
    use self::Element::*;
    match elem {
        Null => buf.push(Marker::Null.into()),
        Bool(v) => buf.push(if v { Marker::True } else { Marker::False }.into()),
        UInt(v) => serialize_uint(buf, v),
        Int(v) => {
            if v >= 0 {
                serialize_uint(buf, v as u64)
            } else {
                serialize_neg_int(buf, v)
            }
        }
        F32(v) => {
            buf.push(Marker::F32.into());
            buf.extend_from_slice(&v.to_bits().to_be_bytes());
        }
        F64(v) => {
            buf.push(Marker::F64.into());
            buf.extend_from_slice(&v.to_bits().to_be_bytes());
        }
        Str(v) => {
            let len = v.len();
            assert!(len <= (u32::MAX as usize));
            if len <= 31 {
                buf.push(Marker::FixStr(len as u8).into());
            } else if len <= u8::MAX as usize {
                buf.push(Marker::Str8.into());
                buf.push(len as u8);
            } else if len <= u16::MAX as usize {
                buf.push(Marker::Str16.into());
                buf.extend_from_slice(&(len as u16).to_be_bytes());
            } else {
                buf.push(Marker::Str32.into());
                buf.extend_from_slice(&(len as u32).to_be_bytes());
            }
            buf.extend_from_slice(v.as_bytes());
        }
        Bin(v) => {
            let len = v.len();
            assert!(len <= (u32::MAX as usize));
            if len <= u8::MAX as usize {
                buf.push(Marker::Bin8.into());
                buf.push(len as u8);
            } else if len <= u16::MAX as usize {
                buf.push(Marker::Bin16.into());
                buf.extend_from_slice(&(len as u16).to_be_bytes());
            } else {
                buf.push(Marker::Bin32.into());
                buf.extend_from_slice(&(len as u32).to_be_bytes());
            }
            buf.extend_from_slice(v);
        }
        Array(len) => {
            assert!(len <= (u32::MAX as usize));
            if len <= 15 {
                buf.push(Marker::FixArray(len as u8).into());
            } else if len <= u16::MAX as usize {
                buf.push(Marker::Array16.into());
                buf.extend_from_slice(&(len as u16).to_be_bytes());
            } else {
                buf.push(Marker::Array32.into());
                buf.extend_from_slice(&(len as u32).to_be_bytes());
            }
        }
        Map(len) => {
            assert!(len <= (u32::MAX as usize));
            if len <= 15 {
                buf.push(Marker::FixMap(len as u8).into());
            } else if len <= u16::MAX as usize {
                buf.push(Marker::Map16.into());
                buf.extend_from_slice(&(len as u16).to_be_bytes());
            } else {
                buf.push(Marker::Map32.into());
                buf.extend_from_slice(&(len as u32).to_be_bytes());
            }
        }
        Ext(ext_type, v) => {
            Marker::encode_ext_marker(buf, v.len());
            buf.push(ext_type as u8);
            buf.extend_from_slice(v);
        }
    }
}

/// Write a forced-width `array 32` header into the first [`ARRAY32_LEN`] bytes of `dst`.
///
/// The header is the same size no matter the count, so it can be reserved up front and
/// overwritten once the count is known.
pub fn write_array32_header(dst: &mut [u8], len: u32) {
    dst[0] = Marker::Array32.into();
    BigEndian::write_u32(&mut dst[1..ARRAY32_LEN], len);
}

/// Write a forced-width `map 32` header into the first [`ARRAY32_LEN`] bytes of `dst`.
pub fn write_map32_header(dst: &mut [u8], len: u32) {
    dst[0] = Marker::Map32.into();
    BigEndian::write_u32(&mut dst[1..ARRAY32_LEN], len);
}

/// Write a forced-width `ext 32` header into the first [`EXT32_HEADER_LEN`] bytes of `dst`.
pub fn write_ext32_header(dst: &mut [u8], ext_type: ExtType, len: u32) {
    dst[0] = Marker::Ext32.into();
    BigEndian::write_u32(&mut dst[1..5], len);
    dst[5] = ext_type.into_i8() as u8;
}

/// Write a forced-width `int 32` value into the first [`INT32_LEN`] bytes of `dst`.
pub fn write_int32(dst: &mut [u8], v: i32) {
    dst[0] = Marker::Int32.into();
    BigEndian::write_i32(&mut dst[1..INT32_LEN], v);
}

/// Measure one complete MessagePack value, including everything nested inside it, at the start
/// of `data`. Returns `Ok(None)` if `data` ends before the value does.
pub fn value_len(data: &[u8]) -> Result<Option<usize>> {
    let mut parser = Parser::new(data);
    let mut pending: u64 = 1;
    while pending > 0 {
        match parser.next() {
            None | Some(Err(Error::LengthTooShort { .. })) => return Ok(None),
            Some(Err(e)) => return Err(e),
            Some(Ok(elem)) => pending = add_children(pending - 1, &elem)?,
        }
    }
    Ok(Some(parser.consumed()))
}

/// Add the number of values nested directly inside `elem` to a count of values still to read.
fn add_children(pending: u64, elem: &Element) -> Result<u64> {
    let children = match *elem {
        Element::Array(len) => Some(len as u64),
        Element::Map(len) => (len as u64).checked_mul(2),
        _ => return Ok(pending),
    };
    children
        .and_then(|c| pending.checked_add(c))
        .ok_or_else(|| Error::BadFrame("too many nested values to measure".to_string()))
}

/// Iterates over the elements in a byte slice. Any valid MessagePack encoding is accepted, not
/// just the shortest one.
#[derive(Clone, Debug)]
pub struct Parser<'a> {
    data: &'a [u8],
    total_len: usize,
    errored: bool,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8]) -> Parser<'a> {
        Self {
            data,
            total_len: data.len(),
            errored: false,
        }
    }

    pub fn peek_marker(&self) -> Option<Marker> {
        self.data.first().map(|n| Marker::from_u8(*n))
    }

    /// How many bytes have been parsed so far.
    pub fn consumed(&self) -> usize {
        self.total_len - self.data.len()
    }

    /// The bytes that haven't been parsed yet.
    pub fn remaining(&self) -> &'a [u8] {
        self.data
    }

    fn read_u8(&mut self, step: &'static str) -> Result<u8> {
        self.data.read_u8().map_err(|_| Error::LengthTooShort {
            step,
            actual: 0,
            expected: 1,
        })
    }

    fn read_u16(&mut self, step: &'static str) -> Result<u16> {
        let actual = self.data.len();
        self.data
            .read_u16::<BigEndian>()
            .map_err(|_| Error::LengthTooShort {
                step,
                actual,
                expected: 2,
            })
    }

    fn read_u32(&mut self, step: &'static str) -> Result<u32> {
        let actual = self.data.len();
        self.data
            .read_u32::<BigEndian>()
            .map_err(|_| Error::LengthTooShort {
                step,
                actual,
                expected: 4,
            })
    }

    fn read_u64(&mut self, step: &'static str) -> Result<u64> {
        let actual = self.data.len();
        self.data
            .read_u64::<BigEndian>()
            .map_err(|_| Error::LengthTooShort {
                step,
                actual,
                expected: 8,
            })
    }

    fn take(&mut self, len: usize, step: &'static str) -> Result<&'a [u8]> {
        if len > self.data.len() {
            return Err(Error::LengthTooShort {
                step,
                actual: self.data.len(),
                expected: len,
            });
        }
        let (bytes, data) = self.data.split_at(len);
        self.data = data;
        Ok(bytes)
    }

    fn take_str(&mut self, len: usize, step: &'static str) -> Result<&'a str> {
        let string = self.take(len, step)?;
        std::str::from_utf8(string).map_err(|e| Error::BadEncode(format!("{}", e)))
    }

    fn take_ext(&mut self, len: usize, step: &'static str) -> Result<Element<'a>> {
        let ext_type = self.read_u8("decode Ext type")? as i8;
        let bytes = self.take(len, step)?;
        Ok(Element::Ext(ext_type, bytes))
    }

    // Given a retrieved marker, try to turn it into the next element, which may move through the
    // data. If we can't, error. This function *does not* set the the errored flag. That's up to
    // the caller.
    fn parse_element(&mut self, marker: Marker) -> Result<Element<'a>> {
        use self::Marker::*;
        let elem = match marker {
            Reserved => return Err(Error::BadEncode(String::from("Reserved marker found"))),
            Null => Element::Null,
            False => Element::Bool(false),
            True => Element::Bool(true),
            PosFixInt(v) => Element::UInt(v as u64),
            NegFixInt(v) => Element::Int(v as i64),
            UInt8 => Element::UInt(self.read_u8("decode UInt8")? as u64),
            UInt16 => Element::UInt(self.read_u16("decode UInt16")? as u64),
            UInt32 => Element::UInt(self.read_u32("decode UInt32")? as u64),
            UInt64 => Element::UInt(self.read_u64("decode UInt64")?),
            Int8 => Element::Int(self.read_u8("decode Int8")? as i8 as i64),
            Int16 => Element::Int(self.read_u16("decode Int16")? as i16 as i64),
            Int32 => Element::Int(self.read_u32("decode Int32")? as i32 as i64),
            Int64 => Element::Int(self.read_u64("decode Int64")? as i64),
            F32 => Element::F32(f32::from_bits(self.read_u32("decode F32")?)),
            F64 => Element::F64(f64::from_bits(self.read_u64("decode F64")?)),
            Bin8 => {
                let len = self.read_u8("decode Bin8 length")? as usize;
                Element::Bin(self.take(len, "get Bin8 content")?)
            }
            Bin16 => {
                let len = self.read_u16("decode Bin16 length")? as usize;
                Element::Bin(self.take(len, "get Bin16 content")?)
            }
            Bin32 => {
                let len = self.read_u32("decode Bin32 length")? as usize;
                Element::Bin(self.take(len, "get Bin32 content")?)
            }
            FixStr(len) => Element::Str(self.take_str(len as usize, "get FixStr content")?),
            Str8 => {
                let len = self.read_u8("decode Str8 length")? as usize;
                Element::Str(self.take_str(len, "get Str8 content")?)
            }
            Str16 => {
                let len = self.read_u16("decode Str16 length")? as usize;
                Element::Str(self.take_str(len, "get Str16 content")?)
            }
            Str32 => {
                let len = self.read_u32("decode Str32 length")? as usize;
                Element::Str(self.take_str(len, "get Str32 content")?)
            }
            FixArray(len) => Element::Array(len as usize),
            Array16 => Element::Array(self.read_u16("decode Array16 length")? as usize),
            Array32 => Element::Array(self.read_u32("decode Array32 length")? as usize),
            FixMap(len) => Element::Map(len as usize),
            Map16 => Element::Map(self.read_u16("decode Map16 length")? as usize),
            Map32 => Element::Map(self.read_u32("decode Map32 length")? as usize),
            FixExt1 => self.take_ext(1, "get FixExt1 content")?,
            FixExt2 => self.take_ext(2, "get FixExt2 content")?,
            FixExt4 => self.take_ext(4, "get FixExt4 content")?,
            FixExt8 => self.take_ext(8, "get FixExt8 content")?,
            FixExt16 => self.take_ext(16, "get FixExt16 content")?,
            Ext8 => {
                let len = self.read_u8("decode Ext8 length")? as usize;
                self.take_ext(len, "get Ext8 content")?
            }
            Ext16 => {
                let len = self.read_u16("decode Ext16 length")? as usize;
                self.take_ext(len, "get Ext16 content")?
            }
            Ext32 => {
                let len = self.read_u32("decode Ext32 length")? as usize;
                self.take_ext(len, "get Ext32 content")?
            }
        };
        Ok(elem)
    }
}

impl<'a> std::iter::Iterator for Parser<'a> {
    type Item = Result<Element<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.errored {
            return None;
        }
        let (&marker, data) = self.data.split_first()?;
        self.data = data;
        let result = self.parse_element(Marker::from_u8(marker));
        if result.is_err() {
            self.errored = true;
        }
        Some(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn roundtrip(elem: Element) -> Vec<u8> {
        let mut enc = Vec::new();
        serialize_elem(&mut enc, elem.clone());
        let mut parser = Parser::new(enc.as_ref());
        let val = parser.next().unwrap().unwrap();
        assert!(parser.next().is_none());
        assert_eq!(parser.consumed(), enc.len());
        match (&elem, &val) {
            // Non-negative signed integers come back as unsigned
            (Element::Int(a), Element::UInt(b)) => assert_eq!(*a as u64, *b),
            _ => assert_eq!(elem, val),
        }
        enc
    }

    #[test]
    fn reserved() {
        let mut parser = Parser::new(&[0xc1, 0x00]);
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
    }

    #[test]
    fn null_and_bool() {
        assert_eq!(roundtrip(Element::Null), &[0xc0]);
        assert_eq!(roundtrip(Element::Bool(false)), &[0xc2]);
        assert_eq!(roundtrip(Element::Bool(true)), &[0xc3]);
    }

    mod integer {
        use super::*;

        #[test]
        fn spec_pos_int() {
            let test_cases: Vec<(u64, Vec<u8>)> = vec![
                (0, vec![0x00]),
                (127, vec![0x7f]),
                (128, vec![0xcc, 0x80]),
                (255, vec![0xcc, 0xff]),
                (256, vec![0xcd, 0x01, 0x00]),
                (65535, vec![0xcd, 0xff, 0xff]),
                (65536, vec![0xce, 0x00, 0x01, 0x00, 0x00]),
                (u32::MAX as u64, vec![0xce, 0xff, 0xff, 0xff, 0xff]),
                (
                    u32::MAX as u64 + 1,
                    vec![0xcf, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00],
                ),
            ];
            for (val, expected) in test_cases {
                assert_eq!(roundtrip(Element::UInt(val)), expected, "value {}", val);
            }
        }

        #[test]
        fn spec_neg_int() {
            let test_cases: Vec<(i64, Vec<u8>)> = vec![
                (-1, vec![0xff]),
                (-32, vec![0xe0]),
                (-33, vec![0xd0, 0xdf]),
                (-128, vec![0xd0, 0x80]),
                (-129, vec![0xd1, 0xff, 0x7f]),
                (-32768, vec![0xd1, 0x80, 0x00]),
                (-32769, vec![0xd2, 0xff, 0xff, 0x7f, 0xff]),
                (
                    i32::MIN as i64 - 1,
                    vec![0xd3, 0xff, 0xff, 0xff, 0xff, 0x7f, 0xff, 0xff, 0xff],
                ),
            ];
            for (val, expected) in test_cases {
                assert_eq!(roundtrip(Element::Int(val)), expected, "value {}", val);
            }
        }

        #[test]
        fn non_negative_signed_is_unsigned() {
            assert_eq!(roundtrip(Element::Int(5)), &[0x05]);
            assert_eq!(roundtrip(Element::Int(200)), &[0xcc, 0xc8]);
        }

        #[test]
        fn non_canonical_accepted() {
            // A small value in a wide encoding is still valid MessagePack
            let mut parser = Parser::new(&[0xce, 0x00, 0x00, 0x00, 0x01]);
            assert_eq!(parser.next().unwrap().unwrap(), Element::UInt(1));
            let mut parser = Parser::new(&[0xd2, 0x00, 0x00, 0x00, 0x01]);
            assert_eq!(parser.next().unwrap().unwrap(), Element::Int(1));
        }

        #[test]
        fn not_enough_bytes() {
            for case in [
                &[0xcc][..],
                &[0xcd, 0x00],
                &[0xce, 0x00, 0x00, 0x00],
                &[0xcf, 0, 0, 0, 0, 0, 0, 0],
                &[0xd3, 0, 0],
            ] {
                let mut parser = Parser::new(case);
                match parser.next().unwrap() {
                    Err(Error::LengthTooShort { .. }) => (),
                    other => panic!("expected LengthTooShort for {:x?}, got {:?}", case, other),
                }
                assert!(parser.next().is_none());
            }
        }
    }

    #[test]
    fn floats() {
        assert_eq!(
            roundtrip(Element::F32(1.0)),
            &[0xca, 0x3f, 0x80, 0x00, 0x00]
        );
        assert_eq!(
            roundtrip(Element::F64(-2.0)),
            &[0xcb, 0xc0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    mod bin {
        use super::*;
        use rand::prelude::*;

        #[test]
        fn roundtrip_sizes() {
            let mut rng = thread_rng();
            for (len, header) in [
                (0usize, vec![0xc4, 0x00]),
                (255, vec![0xc4, 0xff]),
                (256, vec![0xc5, 0x01, 0x00]),
                (65536, vec![0xc6, 0x00, 0x01, 0x00, 0x00]),
            ] {
                let mut test = vec![0; len];
                rng.fill_bytes(test.as_mut());
                let enc = roundtrip(Element::Bin(&test));
                assert_eq!(&enc[..header.len()], &header[..]);
                assert_eq!(enc.len(), header.len() + len);
            }
        }

        #[test]
        fn not_enough_bytes() {
            let mut case = vec![0xc5, 0xff, 0xff];
            case.resize(1000, 0u8);
            let mut parser = Parser::new(&case);
            assert!(parser.next().unwrap().is_err());
            assert!(parser.next().is_none());
        }
    }

    mod str {
        use super::*;
        use rand::prelude::*;

        #[test]
        fn roundtrip_sizes() {
            let mut rng = thread_rng();
            for (len, marker) in [
                (0usize, 0xa0u8),
                (31, 0xbf),
                (32, 0xd9),
                (255, 0xd9),
                (256, 0xda),
                (70_000, 0xdb),
            ] {
                let test: String = rand::distributions::Alphanumeric
                    .sample_iter(&mut rng)
                    .take(len)
                    .map(char::from)
                    .collect();
                let enc = roundtrip(Element::Str(&test));
                assert_eq!(enc[0], marker, "length {}", len);
            }
        }

        #[test]
        fn bad_utf8() {
            let mut parser = Parser::new(&[0xa2, 0xc3, 0x28]);
            match parser.next().unwrap() {
                Err(Error::BadEncode(_)) => (),
                other => panic!("expected BadEncode, got {:?}", other),
            }
        }
    }

    #[test]
    fn array_and_map_headers() {
        assert_eq!(roundtrip(Element::Array(0)), &[0x90]);
        assert_eq!(roundtrip(Element::Array(15)), &[0x9f]);
        assert_eq!(roundtrip(Element::Array(16)), &[0xdc, 0x00, 0x10]);
        assert_eq!(
            roundtrip(Element::Array(65536)),
            &[0xdd, 0x00, 0x01, 0x00, 0x00]
        );
        assert_eq!(roundtrip(Element::Map(1)), &[0x81]);
        assert_eq!(roundtrip(Element::Map(16)), &[0xde, 0x00, 0x10]);
        assert_eq!(
            roundtrip(Element::Map(65536)),
            &[0xdf, 0x00, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn ext() {
        assert_eq!(roundtrip(Element::Ext(5, &[1, 2, 3, 4])), &[0xd6, 0x05, 1, 2, 3, 4]);
        assert_eq!(roundtrip(Element::Ext(-1, &[9, 9, 9])), &[0xc7, 0x03, 0xff, 9, 9, 9]);
    }

    #[test]
    fn fixed_width_writers() {
        let mut buf = [0u8; ARRAY32_LEN];
        write_array32_header(&mut buf, 3);
        assert_eq!(buf, [0xdd, 0x00, 0x00, 0x00, 0x03]);
        let mut parser = Parser::new(&buf);
        assert_eq!(parser.next().unwrap().unwrap(), Element::Array(3));

        let mut buf = [0u8; ARRAY32_LEN];
        write_map32_header(&mut buf, 2);
        assert_eq!(buf, [0xdf, 0x00, 0x00, 0x00, 0x02]);

        let mut buf = [0u8; EXT32_HEADER_LEN];
        write_ext32_header(&mut buf, ExtType::Lz4Block, 0x0102);
        assert_eq!(buf, [0xc9, 0x00, 0x00, 0x01, 0x02, 99]);

        let mut buf = [0u8; INT32_LEN];
        write_int32(&mut buf, 1000);
        assert_eq!(buf, [0xd2, 0x00, 0x00, 0x03, 0xe8]);
    }

    #[test]
    fn measure_values() {
        // [1, "ab", {2: nil}]
        let data = [0x93, 0x01, 0xa2, b'a', b'b', 0x81, 0x02, 0xc0, 0xff];
        assert_eq!(value_len(&data).unwrap(), Some(8));
        for end in 0..8 {
            assert_eq!(value_len(&data[..end]).unwrap(), None, "prefix of {} bytes", end);
        }
        assert_eq!(value_len(&[0x05]).unwrap(), Some(1));
        assert!(value_len(&[0xc1]).is_err());
    }

    #[test]
    fn measure_overflow() {
        assert_eq!(add_children(3, &Element::Map(2)).unwrap(), 7);
        assert_eq!(add_children(3, &Element::Null).unwrap(), 3);
        assert!(matches!(
            add_children(u64::MAX - 1, &Element::Array(2)),
            Err(Error::BadFrame(_))
        ));
        assert!(matches!(
            add_children(u64::MAX - 10, &Element::Map(u32::MAX as usize)),
            Err(Error::BadFrame(_))
        ));
    }
}
