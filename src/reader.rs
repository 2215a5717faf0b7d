//! Reading lists back from a byte stream.

use std::io::Read;

use crate::{
    chunk::decode_chunk,
    compress::lz4_decompress,
    element::value_len,
    error::{Error, Result},
    formatter::ElementDecoder,
    frame::{FrameHeader, FrameKind, FRAME_HEADER_LEN},
    options::ChunkOptions,
};

/// The smallest read used while looking for the end of an uncompressed chunk.
const MIN_RAW_READ: usize = 64;

/// The result of reading one frame with [`ChunkReader::read_chunk_into`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkRead {
    /// The frame was the null list marker.
    Nil,
    /// The frame was a chunk holding this many elements.
    Elements(usize),
}

/// Reads lists from a stream of chunk frames.
///
/// The reader may pull more bytes from the stream than the frames it has returned so far, so the
/// stream shouldn't be used for anything else while the reader holds it.
#[derive(Debug)]
pub struct ChunkReader<R> {
    reader: R,
    pending: Vec<u8>,
    body: Vec<u8>,
    max_chunk_size: usize,
}

impl<R: Read> ChunkReader<R> {
    /// Create a reader using the default options.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            body: Vec::new(),
            max_chunk_size: ChunkOptions::default().max_chunk_size,
        }
    }

    /// Create a reader with the given options. Fails if the options don't
    /// [validate][ChunkOptions::validate].
    pub fn with_options(reader: R, options: &ChunkOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            reader,
            pending: Vec::new(),
            body: Vec::new(),
            max_chunk_size: options.max_chunk_size,
        })
    }

    /// Read frames until the stream ends, returning the complete list.
    ///
    /// A stream holding only the null list marker gives `None`. An empty stream is read as an
    /// empty list.
    pub fn read_list<T, D>(&mut self, decoder: &D) -> Result<Option<Vec<T>>>
    where
        D: ElementDecoder<T> + ?Sized,
    {
        let mut list = Vec::new();
        let mut chunks = 0usize;
        loop {
            match self.read_chunk_into(decoder, &mut list)? {
                None => return Ok(Some(list)),
                Some(ChunkRead::Elements(_)) => chunks += 1,
                Some(ChunkRead::Nil) => {
                    if chunks > 0 {
                        return Err(Error::BadFrame(
                            "null list marker found after list chunks".to_string(),
                        ));
                    }
                    self.fill(1)?;
                    if !self.pending.is_empty() {
                        return Err(Error::BadFrame(
                            "data found after the null list marker".to_string(),
                        ));
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Read one frame, appending any elements in it to `out`. Returns `None` once the stream has
    /// ended cleanly on a frame boundary.
    ///
    /// If this fails partway through a chunk, `out` may hold some of that chunk's elements.
    pub fn read_chunk_into<T, D>(&mut self, decoder: &D, out: &mut Vec<T>) -> Result<Option<ChunkRead>>
    where
        D: ElementDecoder<T> + ?Sized,
    {
        self.fill(FRAME_HEADER_LEN)?;
        let lead = match self.pending.first() {
            Some(lead) => *lead,
            None => return Ok(None),
        };

        let (frame_len, count) = match FrameKind::from_marker(lead)? {
            FrameKind::Nil => {
                self.consume(1);
                log::trace!("read null list marker");
                return Ok(Some(ChunkRead::Nil));
            }
            FrameKind::Compressed => {
                if self.pending.len() < FRAME_HEADER_LEN {
                    return Err(Error::LengthTooShort {
                        step: "read frame header",
                        actual: self.pending.len(),
                        expected: FRAME_HEADER_LEN,
                    });
                }
                let header = FrameHeader::parse(&self.pending[..FRAME_HEADER_LEN])?;
                if header.original_len > self.max_chunk_size {
                    return Err(Error::LengthTooLong {
                        max: self.max_chunk_size,
                        actual: header.original_len,
                    });
                }
                let max_compressed = lz4_flex::block::get_maximum_output_size(self.max_chunk_size);
                if header.compressed_len > max_compressed {
                    return Err(Error::LengthTooLong {
                        max: max_compressed,
                        actual: header.compressed_len,
                    });
                }
                let frame_len = FRAME_HEADER_LEN + header.compressed_len;
                self.fill(frame_len)?;
                if self.pending.len() < frame_len {
                    return Err(Error::LengthTooShort {
                        step: "read compressed chunk",
                        actual: self.pending.len(),
                        expected: frame_len,
                    });
                }
                self.body.clear();
                lz4_decompress(
                    &self.pending[FRAME_HEADER_LEN..frame_len],
                    header.original_len,
                    &mut self.body,
                )?;
                let count = decode_chunk(&self.body, decoder, out)?;
                log::trace!(
                    "read compressed chunk: {} elements, {} byte frame, {} byte body",
                    count,
                    frame_len,
                    header.original_len
                );
                (frame_len, count)
            }
            FrameKind::Raw => {
                let frame_len = self.measure_raw()?;
                let count = decode_chunk(&self.pending[..frame_len], decoder, out)?;
                log::trace!("read raw chunk: {} elements, {} bytes", count, frame_len);
                (frame_len, count)
            }
        };
        self.consume(frame_len);
        Ok(Some(ChunkRead::Elements(count)))
    }

    /// Unwrap the underlying reader. Bytes already pulled from it but not yet returned as frames
    /// are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read from the stream until at least `want` bytes are pending, or the stream ends.
    ///
    /// The buffer only grows as data actually arrives, so a length taken from a corrupt header
    /// can't force a large allocation on its own.
    fn fill(&mut self, want: usize) -> Result<()> {
        if let Some(missing) = want.checked_sub(self.pending.len()) {
            (&mut self.reader)
                .take(missing as u64)
                .read_to_end(&mut self.pending)?;
        }
        Ok(())
    }

    /// Find the length of the uncompressed chunk at the start of the pending bytes, reading more
    /// of the stream as needed.
    fn measure_raw(&mut self) -> Result<usize> {
        loop {
            if let Some(len) = value_len(&self.pending)? {
                if len > self.max_chunk_size {
                    return Err(Error::LengthTooLong {
                        max: self.max_chunk_size,
                        actual: len,
                    });
                }
                return Ok(len);
            }
            let have = self.pending.len();
            if have > self.max_chunk_size {
                return Err(Error::LengthTooLong {
                    max: self.max_chunk_size,
                    actual: have,
                });
            }
            let want = have
                .saturating_mul(2)
                .max(MIN_RAW_READ)
                .min(self.max_chunk_size.saturating_add(1));
            self.fill(want)?;
            if self.pending.len() == have {
                return Err(Error::LengthTooShort {
                    step: "read raw chunk",
                    actual: have,
                    expected: want,
                });
            }
        }
    }

    fn consume(&mut self, len: usize) {
        self.pending.drain(..len);
    }
}
