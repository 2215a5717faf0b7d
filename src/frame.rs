//! Frame encoding and header parsing.
//!
//! A frame is one of three things, told apart by its first byte:
//!
//! - A compressed chunk: an `ext 32` header of type 99, an `int 32` holding the uncompressed
//!     length, then the LZ4 block. The header is always [`FRAME_HEADER_LEN`] bytes. A chunk whose
//!     last element carried it past 2 GiB records its length as a `uint 32` instead.
//! - A raw chunk: the chunk's MessagePack array, as-is.
//! - The null list marker, a single `nil`.

use byteorder::{BigEndian, ByteOrder};

use crate::{
    compress::Compress,
    element::{write_ext32_header, write_int32, EXT32_HEADER_LEN, INT32_LEN},
    error::{Error, Result},
    marker::{ExtType, Marker},
    options::ChunkOptions,
};

/// Length of a compressed frame's header: the `ext 32` header plus the `int 32` original length.
pub const FRAME_HEADER_LEN: usize = EXT32_HEADER_LEN + INT32_LEN;

/// The kind of frame, as determined by its leading marker byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// An LZ4-compressed chunk.
    Compressed,
    /// An uncompressed chunk.
    Raw,
    /// The null list marker.
    Nil,
}

impl FrameKind {
    /// Classify a frame by its first byte. Fails on anything that can't start a frame.
    pub fn from_marker(byte: u8) -> Result<Self> {
        match Marker::from_u8(byte) {
            Marker::Ext32 => Ok(FrameKind::Compressed),
            Marker::Null => Ok(FrameKind::Nil),
            m if m.is_array() => Ok(FrameKind::Raw),
            m => Err(Error::BadFrame(format!(
                "frame can't start with marker {:?} (0x{:02x})",
                m, byte
            ))),
        }
    }
}

/// The parsed header of a compressed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    /// Length of the LZ4 block following the header.
    pub compressed_len: usize,
    /// Length of the chunk body once decompressed.
    pub original_len: usize,
}

impl FrameHeader {
    /// Parse a compressed frame header. `header` must be at least [`FRAME_HEADER_LEN`] bytes.
    ///
    /// The original length is written as an `int 32`, but a non-negative `uint 32` is accepted
    /// too.
    pub(crate) fn parse(header: &[u8]) -> Result<Self> {
        if header.len() < FRAME_HEADER_LEN {
            return Err(Error::LengthTooShort {
                step: "parse frame header",
                actual: header.len(),
                expected: FRAME_HEADER_LEN,
            });
        }
        if header[0] != u8::from(Marker::Ext32) {
            return Err(Error::BadFrame(format!(
                "expected an ext 32 marker, got 0x{:02x}",
                header[0]
            )));
        }
        let ext_len = BigEndian::read_u32(&header[1..5]) as usize;
        let ext_type = header[5] as i8;
        if ExtType::from_i8(ext_type) != Some(ExtType::Lz4Block) {
            return Err(Error::BadFrame(format!(
                "unknown extension type {}",
                ext_type
            )));
        }
        let compressed_len = ext_len.checked_sub(INT32_LEN).ok_or_else(|| {
            Error::BadFrame(format!(
                "extension length {} can't hold the original length field",
                ext_len
            ))
        })?;
        let len_field = &header[EXT32_HEADER_LEN..FRAME_HEADER_LEN];
        let original_len = match Marker::from_u8(len_field[0]) {
            Marker::Int32 => {
                let len = BigEndian::read_i32(&len_field[1..]);
                if len < 0 {
                    return Err(Error::BadFrame(format!(
                        "negative original length {}",
                        len
                    )));
                }
                len as usize
            }
            Marker::UInt32 => BigEndian::read_u32(&len_field[1..]) as usize,
            m => {
                return Err(Error::BadFrame(format!(
                    "original length must be a 32-bit integer, got marker {:?}",
                    m
                )))
            }
        };
        Ok(Self {
            compressed_len,
            original_len,
        })
    }
}

/// Turns finished chunk bodies into frames. Holds on to the compression buffer between frames.
#[derive(Clone, Debug)]
pub(crate) struct FrameEncoder {
    compress: Compress,
    min_compress_size: usize,
    buf: Vec<u8>,
}

impl FrameEncoder {
    pub(crate) fn new(options: &ChunkOptions) -> Self {
        Self {
            compress: options.compress,
            min_compress_size: options.min_compress_size,
            buf: Vec::new(),
        }
    }

    /// Encode a chunk body as a frame. Small bodies, and all bodies when compression is off, are
    /// passed through unchanged.
    pub(crate) fn encode<'a>(&'a mut self, body: &'a [u8]) -> Result<(FrameKind, &'a [u8])> {
        if body.len() < self.min_compress_size {
            return Ok((FrameKind::Raw, body));
        }
        if body.len() > u32::MAX as usize {
            return Err(Error::LengthTooLong {
                max: u32::MAX as usize,
                actual: body.len(),
            });
        }

        // Reserve the header, compress after it, then go back and fill it in
        self.buf.clear();
        self.buf.resize(FRAME_HEADER_LEN, 0);
        if !self.compress.compress(&mut self.buf, body)? {
            return Ok((FrameKind::Raw, body));
        }
        let ext_len = self.buf.len() - EXT32_HEADER_LEN;
        if ext_len > u32::MAX as usize {
            return Err(Error::LengthTooLong {
                max: u32::MAX as usize,
                actual: ext_len,
            });
        }
        write_ext32_header(
            &mut self.buf[..EXT32_HEADER_LEN],
            ExtType::Lz4Block,
            ext_len as u32,
        );
        write_original_len(
            &mut self.buf[EXT32_HEADER_LEN..FRAME_HEADER_LEN],
            body.len(),
        )?;
        Ok((FrameKind::Compressed, &self.buf[..]))
    }
}

/// Write a compressed frame's original length field. It's an `int 32`, unless the chunk went far
/// enough past the cutoff to need a `uint 32`.
fn write_original_len(dst: &mut [u8], len: usize) -> Result<()> {
    if let Ok(len) = i32::try_from(len) {
        write_int32(dst, len);
        return Ok(());
    }
    let len = u32::try_from(len).map_err(|_| Error::LengthTooLong {
        max: u32::MAX as usize,
        actual: len,
    })?;
    dst[0] = Marker::UInt32.into();
    BigEndian::write_u32(&mut dst[1..INT32_LEN], len);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compress::lz4_decompress;

    fn body_of_len(len: usize) -> Vec<u8> {
        // An array 32 of positive fixints, padded out to the requested length
        let mut body = vec![0xdd];
        body.extend_from_slice(&((len - 5) as u32).to_be_bytes());
        body.extend((0..(len - 5)).map(|i| (i % 100) as u8));
        body
    }

    #[test]
    fn frame_kinds() {
        assert_eq!(FrameKind::from_marker(0xc9).unwrap(), FrameKind::Compressed);
        assert_eq!(FrameKind::from_marker(0xc0).unwrap(), FrameKind::Nil);
        for byte in (0x90..=0x9f).chain([0xdc, 0xdd]) {
            assert_eq!(FrameKind::from_marker(byte).unwrap(), FrameKind::Raw);
        }
        for byte in [0x00, 0x80, 0xa0, 0xc1, 0xc7, 0xc8, 0xd2, 0xde, 0xff] {
            assert!(matches!(
                FrameKind::from_marker(byte),
                Err(Error::BadFrame(_))
            ));
        }
    }

    #[test]
    fn small_body_is_raw() {
        let body = body_of_len(63);
        let mut enc = FrameEncoder::new(&ChunkOptions::default());
        let (kind, frame) = enc.encode(&body).unwrap();
        assert_eq!(kind, FrameKind::Raw);
        assert_eq!(frame, &body[..]);
    }

    #[test]
    fn threshold_body_is_compressed() {
        let body = body_of_len(64);
        let mut enc = FrameEncoder::new(&ChunkOptions::default());
        let (kind, frame) = enc.encode(&body).unwrap();
        assert_eq!(kind, FrameKind::Compressed);
        assert_eq!(frame[0], 0xc9);
        assert_eq!(frame[5], 99);
        assert_eq!(&frame[6..11], &[0xd2, 0, 0, 0, 64]);
        let ext_len = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]) as usize;
        assert_eq!(ext_len, frame.len() - 6);

        let header = FrameHeader::parse(frame).unwrap();
        assert_eq!(header.original_len, 64);
        assert_eq!(header.compressed_len, frame.len() - FRAME_HEADER_LEN);
        let mut out = Vec::new();
        lz4_decompress(&frame[FRAME_HEADER_LEN..], header.original_len, &mut out).unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn compression_disabled() {
        let body = body_of_len(10_000);
        let options = ChunkOptions::default().with_compress(Compress::None);
        let mut enc = FrameEncoder::new(&options);
        let (kind, frame) = enc.encode(&body).unwrap();
        assert_eq!(kind, FrameKind::Raw);
        assert_eq!(frame, &body[..]);
    }

    #[test]
    fn encoder_reuse() {
        let mut enc = FrameEncoder::new(&ChunkOptions::default());
        let big = body_of_len(5000);
        let big_frame = enc.encode(&big).unwrap().1.to_vec();
        let small = body_of_len(100);
        let small_frame = enc.encode(&small).unwrap().1.to_vec();
        assert!(small_frame.len() < big_frame.len());
        let header = FrameHeader::parse(&small_frame).unwrap();
        assert_eq!(header.original_len, 100);
        assert_eq!(header.compressed_len + FRAME_HEADER_LEN, small_frame.len());
    }

    #[test]
    fn original_len_past_i32() {
        let mut field = [0u8; INT32_LEN];
        write_original_len(&mut field, i32::MAX as usize).unwrap();
        assert_eq!(field, [0xd2, 0x7f, 0xff, 0xff, 0xff]);
        write_original_len(&mut field, i32::MAX as usize + 1).unwrap();
        assert_eq!(field, [0xce, 0x80, 0, 0, 0]);

        // A chunk closed just past the largest cutoff still gets a readable header
        let mut header = vec![0xc9, 0, 0, 0, 9, 99];
        header.extend_from_slice(&field);
        let parsed = FrameHeader::parse(&header).unwrap();
        assert_eq!(parsed.original_len, crate::MAX_CUTOFF + 1);

        write_original_len(&mut field, u32::MAX as usize).unwrap();
        assert_eq!(field, [0xce, 0xff, 0xff, 0xff, 0xff]);
        if let Some(too_long) = (u32::MAX as usize).checked_add(1) {
            assert!(matches!(
                write_original_len(&mut field, too_long),
                Err(Error::LengthTooLong { .. })
            ));
        }
    }

    #[test]
    fn header_variants() {
        // uint 32 original length is accepted
        let header = [0xc9, 0, 0, 0, 9, 99, 0xce, 0, 0, 1, 0];
        assert_eq!(
            FrameHeader::parse(&header).unwrap(),
            FrameHeader {
                compressed_len: 4,
                original_len: 256
            }
        );
        // Negative length
        let header = [0xc9, 0, 0, 0, 9, 99, 0xd2, 0xff, 0xff, 0xff, 0xff];
        assert!(matches!(FrameHeader::parse(&header), Err(Error::BadFrame(_))));
        // Wrong extension type
        let header = [0xc9, 0, 0, 0, 9, 98, 0xd2, 0, 0, 1, 0];
        assert!(matches!(FrameHeader::parse(&header), Err(Error::BadFrame(_))));
        // Extension too short for the length field
        let header = [0xc9, 0, 0, 0, 4, 99, 0xd2, 0, 0, 1, 0];
        assert!(matches!(FrameHeader::parse(&header), Err(Error::BadFrame(_))));
        // Length field isn't a 32-bit integer
        let header = [0xc9, 0, 0, 0, 9, 99, 0xcd, 0, 0, 1, 0];
        assert!(matches!(FrameHeader::parse(&header), Err(Error::BadFrame(_))));
        // Not enough bytes
        assert!(matches!(
            FrameHeader::parse(&[0xc9, 0, 0]),
            Err(Error::LengthTooShort { .. })
        ));
    }
}
