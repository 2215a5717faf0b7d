//! Assembly of elements into chunk bodies, and decoding of chunk bodies back into elements.
//!
//! A chunk body is a MessagePack array whose header is always the 5-byte `array 32` form. The
//! header is reserved before the first element goes in and filled in with the final count when
//! the chunk is closed.

use crate::{
    element::{write_array32_header, Element, Parser, ARRAY32_LEN},
    error::{Error, Result},
    formatter::{ElementDecoder, ElementEncoder},
    frame::{FrameEncoder, FrameKind},
    options::ChunkOptions,
};

/// Accumulates encoded elements into a chunk body and turns it into a frame once it's closed.
#[derive(Clone, Debug)]
pub(crate) struct ChunkEncoder {
    block: Vec<u8>,
    count: usize,
    cutoff: usize,
    frame: FrameEncoder,
}

impl ChunkEncoder {
    pub(crate) fn new(options: &ChunkOptions) -> Self {
        Self {
            block: vec![0; ARRAY32_LEN],
            count: 0,
            cutoff: options.cutoff,
            frame: FrameEncoder::new(options),
        }
    }

    /// Number of elements in the open chunk.
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Encode one more element into the open chunk. Returns true if the chunk has gone past the
    /// cutoff and should be closed.
    ///
    /// If encoding fails, the chunk is left as it was before the call.
    pub(crate) fn push<T, E>(&mut self, encoder: &E, value: &T) -> Result<bool>
    where
        T: ?Sized,
        E: ElementEncoder<T> + ?Sized,
    {
        if self.count >= u32::MAX as usize {
            return Err(Error::LengthTooLong {
                max: u32::MAX as usize,
                actual: self.count + 1,
            });
        }
        let prev_len = self.block.len();
        if let Err(e) = encoder.encode(&mut self.block, value) {
            self.block.truncate(prev_len);
            return Err(e);
        }
        self.count += 1;
        Ok(self.block.len() > self.cutoff)
    }

    /// Close the open chunk: fill in its header, encode it as a frame, and hand the frame to `f`.
    /// The encoder is then ready to start the next chunk, whether or not `f` succeeded.
    pub(crate) fn close_with<F, R>(&mut self, f: F) -> Result<R>
    where
        F: FnOnce(FrameKind, &[u8]) -> Result<R>,
    {
        write_array32_header(&mut self.block[..ARRAY32_LEN], self.count as u32);
        let result = match self.frame.encode(&self.block) {
            Ok((kind, frame)) => {
                log::debug!(
                    "closing chunk: {} elements, {} byte body, {} byte {} frame",
                    self.count,
                    self.block.len(),
                    frame.len(),
                    if kind == FrameKind::Compressed {
                        "compressed"
                    } else {
                        "raw"
                    }
                );
                f(kind, frame)
            }
            Err(e) => Err(e),
        };
        self.reset();
        result
    }

    /// Drop everything in the open chunk.
    pub(crate) fn reset(&mut self) {
        self.block.truncate(ARRAY32_LEN);
        self.count = 0;
    }
}

/// Decode every element in a chunk body, appending them to `out`. Returns the number of elements
/// decoded.
///
/// The body must be exactly one MessagePack array. Any header width is accepted.
pub(crate) fn decode_chunk<T, D>(body: &[u8], decoder: &D, out: &mut Vec<T>) -> Result<usize>
where
    D: ElementDecoder<T> + ?Sized,
{
    let mut parser = Parser::new(body);
    let count = match parser.next() {
        Some(Ok(Element::Array(len))) => len,
        Some(Ok(elem)) => {
            return Err(Error::BadFrame(format!(
                "chunk body must be an array, not {}",
                elem.name()
            )))
        }
        Some(Err(e)) => return Err(e),
        None => {
            return Err(Error::BadFrame("chunk body is empty".to_string()));
        }
    };

    let mut data = parser.remaining();
    // Every element takes at least one byte, so a count larger than that is corrupt anyway
    out.reserve(count.min(data.len()));
    for _ in 0..count {
        let (value, used) = decoder.decode(data)?;
        if used > data.len() {
            return Err(Error::BadFrame(format!(
                "element decoder claims {} bytes, only {} remain",
                used,
                data.len()
            )));
        }
        out.push(value);
        data = &data[used..];
    }
    if !data.is_empty() {
        return Err(Error::BadFrame(format!(
            "{} bytes left over after the last element of the chunk",
            data.len()
        )));
    }
    Ok(count)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{compress::lz4_decompress, formatter::SerdeFormatter, frame::FrameHeader};

    fn close(enc: &mut ChunkEncoder) -> (FrameKind, Vec<u8>) {
        enc.close_with(|kind, frame| Ok((kind, frame.to_vec())))
            .unwrap()
    }

    #[test]
    fn empty_chunk() {
        let mut enc = ChunkEncoder::new(&ChunkOptions::default());
        let (kind, frame) = close(&mut enc);
        assert_eq!(kind, FrameKind::Raw);
        assert_eq!(frame, &[0xdd, 0, 0, 0, 0]);
        let mut out: Vec<u32> = Vec::new();
        assert_eq!(decode_chunk(&frame, &SerdeFormatter, &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn small_chunk_roundtrip() {
        let mut enc = ChunkEncoder::new(&ChunkOptions::default());
        for i in 0..10u32 {
            assert!(!enc.push(&SerdeFormatter, &i).unwrap());
        }
        assert_eq!(enc.count(), 10);
        let (kind, frame) = close(&mut enc);
        assert_eq!(kind, FrameKind::Raw);
        assert_eq!(&frame[..5], &[0xdd, 0, 0, 0, 10]);
        assert_eq!(frame.len(), 15);
        let mut out: Vec<u32> = Vec::new();
        decode_chunk(&frame, &SerdeFormatter, &mut out).unwrap();
        assert_eq!(out, (0..10).collect::<Vec<u32>>());

        // The encoder is reset for the next chunk
        assert_eq!(enc.count(), 0);
        enc.push(&SerdeFormatter, &1u32).unwrap();
        let (_, frame) = close(&mut enc);
        assert_eq!(frame, &[0xdd, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn cutoff_reporting() {
        let options = ChunkOptions::default().with_cutoff(20);
        let mut enc = ChunkEncoder::new(&options);
        // Each u32 below 128 is a single byte, so the 16th one takes the offset to 21
        for i in 0..15u32 {
            assert!(!enc.push(&SerdeFormatter, &i).unwrap(), "element {}", i);
        }
        assert!(enc.push(&SerdeFormatter, &15u32).unwrap());
    }

    #[test]
    fn large_chunk_is_compressed() {
        let mut enc = ChunkEncoder::new(&ChunkOptions::default());
        for i in 0..1000u64 {
            enc.push(&SerdeFormatter, &(i * 1000)).unwrap();
        }
        let (kind, frame) = close(&mut enc);
        assert_eq!(kind, FrameKind::Compressed);
        let header = FrameHeader::parse(&frame).unwrap();
        let mut body = Vec::new();
        lz4_decompress(&frame[11..], header.original_len, &mut body).unwrap();
        let mut out: Vec<u64> = Vec::new();
        assert_eq!(decode_chunk(&body, &SerdeFormatter, &mut out).unwrap(), 1000);
        assert!(out.iter().enumerate().all(|(i, v)| *v == i as u64 * 1000));
    }

    #[test]
    fn failed_push_leaves_chunk_intact() {
        struct Picky;
        impl ElementEncoder<u8> for Picky {
            fn encode(&self, buf: &mut Vec<u8>, value: &u8) -> Result<()> {
                buf.push(0xcc);
                if *value == 0 {
                    return Err(Error::SerdeFail("zero not allowed".into()));
                }
                buf.push(*value);
                Ok(())
            }
        }
        let mut enc = ChunkEncoder::new(&ChunkOptions::default());
        enc.push(&Picky, &200).unwrap();
        assert!(enc.push(&Picky, &0).is_err());
        assert_eq!(enc.count(), 1);
        let (_, frame) = close(&mut enc);
        assert_eq!(frame, &[0xdd, 0, 0, 0, 1, 0xcc, 200]);
    }

    #[test]
    fn reset_discards_open_chunk() {
        let mut enc = ChunkEncoder::new(&ChunkOptions::default());
        for i in 0..5u8 {
            enc.push(&SerdeFormatter, &i).unwrap();
        }
        enc.reset();
        assert_eq!(enc.count(), 0);
        enc.push(&SerdeFormatter, &9u8).unwrap();
        let (_, frame) = close(&mut enc);
        assert_eq!(frame, &[0xdd, 0, 0, 0, 1, 9]);
    }

    #[test]
    fn short_array_headers() {
        // fixarray and array 16 bodies are valid chunks too
        let mut out: Vec<u8> = Vec::new();
        decode_chunk(&[0x92, 0x01, 0x02], &SerdeFormatter, &mut out).unwrap();
        decode_chunk(&[0xdc, 0x00, 0x01, 0x03], &SerdeFormatter, &mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn malformed_bodies() {
        let mut out: Vec<u8> = Vec::new();
        // Not an array
        assert!(matches!(
            decode_chunk(&[0x81, 0x01, 0x02], &SerdeFormatter, &mut out),
            Err(Error::BadFrame(_))
        ));
        // Empty
        assert!(matches!(
            decode_chunk(&[], &SerdeFormatter, &mut out),
            Err(Error::BadFrame(_))
        ));
        // Trailing bytes
        assert!(matches!(
            decode_chunk(&[0x91, 0x01, 0x02], &SerdeFormatter, &mut out),
            Err(Error::BadFrame(_))
        ));
        // Too few elements for the count
        assert!(matches!(
            decode_chunk(&[0xdd, 0xff, 0xff, 0xff, 0xff, 0x01], &SerdeFormatter, &mut out),
            Err(Error::LengthTooShort { .. })
        ));
    }
}
