//! Settings shared by the writers and readers.

use educe::Educe;
use serde::{Deserialize, Serialize};

use crate::{
    compress::Compress,
    element::ARRAY32_LEN,
    error::{Error, Result},
    DEFAULT_CUTOFF, MAX_CUTOFF, MIN_COMPRESS_SIZE,
};

/// Chunking and compression settings.
///
/// The defaults produce the standard layout: chunks close once they pass 1 GiB, and any chunk of
/// 64 bytes or more is LZ4-compressed. Readers only look at `max_chunk_size`; everything else
/// about a frame is described by the frame itself.
///
/// Options can be loaded with any serde format. Missing fields take their default value.
#[derive(Educe, Clone, Debug, Serialize, Deserialize)]
#[educe(PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct ChunkOptions {
    /// A chunk is closed as soon as its encoded size, counting its 5-byte array header, goes past
    /// this many bytes.
    #[educe(Default(expression = DEFAULT_CUTOFF))]
    pub cutoff: usize,
    /// Chunks smaller than this are always written uncompressed.
    #[educe(Default(expression = MIN_COMPRESS_SIZE))]
    pub min_compress_size: usize,
    /// How chunks at or above `min_compress_size` are compressed.
    pub compress: Compress,
    /// The largest chunk body a reader will accept, either raw or after decompression.
    #[educe(Default(expression = u32::MAX as usize))]
    pub max_chunk_size: usize,
}

impl ChunkOptions {
    /// Make a new set of options with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk cutoff, in bytes.
    pub fn with_cutoff(mut self, cutoff: usize) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Set the minimum chunk size that will be compressed.
    pub fn with_min_compress_size(mut self, min_compress_size: usize) -> Self {
        self.min_compress_size = min_compress_size;
        self
    }

    /// Set the compression used for chunks.
    pub fn with_compress(mut self, compress: Compress) -> Self {
        self.compress = compress;
        self
    }

    /// Set the largest chunk body a reader will accept.
    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    /// Check that the options can actually be used.
    ///
    /// The cutoff can't exceed [`MAX_CUTOFF`], so chunk lengths fit the compressed frame's
    /// length field. The maximum chunk size must leave room for at least an empty
    /// chunk.
    pub fn validate(&self) -> Result<()> {
        if self.cutoff > MAX_CUTOFF {
            return Err(Error::BadOptions(format!(
                "cutoff of {} bytes is larger than the maximum of {}",
                self.cutoff, MAX_CUTOFF
            )));
        }
        if self.max_chunk_size < ARRAY32_LEN {
            return Err(Error::BadOptions(format!(
                "max_chunk_size of {} bytes can't hold a chunk header",
                self.max_chunk_size
            )));
        }
        Ok(())
    }
}
