//! chunk-pack writes very large lists as a sequence of LZ4-compressed MessagePack chunks.
//!
//! A single MessagePack array can only describe so much data before its length fields run out,
//! and building one huge array means holding the whole encoding in memory. chunk-pack instead
//! splits a list into chunks: each chunk is a complete MessagePack array of consecutive elements,
//! closed once its encoding goes past a cutoff (1 GiB by default). Each chunk is then written as
//! a frame, LZ4-compressed if it's large enough to be worth it. Reading a list back means reading
//! frames until the stream ends and concatenating their elements.
//!
//! # Format
//!
//! All integers are big-endian. A list is one of:
//!
//! - The null list: a single MessagePack `nil` (`0xc0`), and nothing else.
//! - One or more chunk frames, one after another. A list with no elements is a single frame
//!     holding an empty chunk.
//!
//! Each chunk body is `[0xdd][u32 count][element]...`: an `array 32` header followed by each
//! element's MessagePack encoding. A chunk frame is either:
//!
//! - The chunk body as-is, if it's shorter than 64 bytes or compression is turned off.
//! - `[0xc9][u32 len][99][0xd2][i32 body length][LZ4 block]`: an `ext 32` of extension type 99,
//!     whose payload is the uncompressed length as an `int 32`, followed by the body compressed
//!     as a single LZ4 block. `len` counts the 5-byte length field plus the LZ4 block.
//!
//! Every frame can be decoded on its own, without the frames before it.
//!
//! # Elements
//!
//! The list codec never looks inside an element. It hands element encoding off to an
//! [`ElementEncoder`] and decoding to an [`ElementDecoder`]. [`SerdeFormatter`] implements both
//! for anything implementing serde's traits, and the [`to_writer`]/[`from_reader`] family of
//! functions use it automatically.
//!
//! ```
//! # use chunk_pack::*;
//! # fn main() -> Result<()> {
//! let list: Vec<u32> = (0..100_000).collect();
//! let encoded = to_vec(Some(&list[..]))?;
//! let decoded: Option<Vec<u32>> = from_slice(&encoded)?;
//! assert_eq!(decoded, Some(list));
//!
//! let encoded = to_vec::<u32>(None)?;
//! assert_eq!(encoded, vec![0xc0]);
//! # Ok(())
//! # }
//! ```
//!
//! For lists that don't exist all at once, elements can be pushed into a [`ChunkWriter`] one at a
//! time, or turned into frames on demand with a [`FrameBuilder`] or [`AsyncFrameBuilder`].

use std::io::{Read, Write};

use serde::{de::DeserializeOwned, Serialize};

mod builder;
mod chunk;
mod compress;
mod de;
mod depth_tracking;
mod error;
mod formatter;
mod frame;
mod options;
mod reader;
mod ser;
mod writer;

pub mod element;
pub mod marker;

pub use builder::{AsyncFrameBuilder, FrameBuilder};
pub use compress::Compress;
pub use de::decode_value;
pub use error::{Error, Result};
pub use formatter::{ElementDecoder, ElementEncoder, SerdeFormatter};
pub use frame::{FrameKind, FRAME_HEADER_LEN};
pub use options::ChunkOptions;
pub use reader::{ChunkRead, ChunkReader};
pub use ser::encode_value;
pub use writer::{ChunkWriter, WriteSummary};

/// The default chunk cutoff of 1 GiB.
pub const DEFAULT_CUTOFF: usize = 1usize << 30; // 1 GiB
/// The largest allowed chunk cutoff. A compressed frame records its chunk's length as an
/// `int 32`; only the element that carries a chunk past this can push it into `uint 32` range.
pub const MAX_CUTOFF: usize = i32::MAX as usize;
/// Chunk bodies smaller than this are never compressed.
pub const MIN_COMPRESS_SIZE: usize = 64;
/// The maximum nesting depth of a single serde-encoded element.
pub const MAX_DEPTH: usize = 100;

/// Write a list to `writer`, encoding each element with `encoder`.
pub fn serialize_list<W, T, E>(writer: W, list: Option<&[T]>, encoder: &E) -> Result<WriteSummary>
where
    W: Write,
    E: ElementEncoder<T> + ?Sized,
{
    ChunkWriter::new(writer).write_list(list, encoder)
}

/// Write a list to `writer` using the given options, encoding each element with `encoder`.
pub fn serialize_list_with_options<W, T, E>(
    writer: W,
    list: Option<&[T]>,
    encoder: &E,
    options: &ChunkOptions,
) -> Result<WriteSummary>
where
    W: Write,
    E: ElementEncoder<T> + ?Sized,
{
    ChunkWriter::with_options(writer, options)?.write_list(list, encoder)
}

/// Read a list from `reader` until it runs out, decoding each element with `decoder`.
pub fn deserialize_list<R, T, D>(reader: R, decoder: &D) -> Result<Option<Vec<T>>>
where
    R: Read,
    D: ElementDecoder<T> + ?Sized,
{
    ChunkReader::new(reader).read_list(decoder)
}

/// Read a list from `reader` until it runs out using the given options, decoding each element
/// with `decoder`.
pub fn deserialize_list_with_options<R, T, D>(
    reader: R,
    decoder: &D,
    options: &ChunkOptions,
) -> Result<Option<Vec<T>>>
where
    R: Read,
    D: ElementDecoder<T> + ?Sized,
{
    ChunkReader::with_options(reader, options)?.read_list(decoder)
}

/// Write a list of serializable elements to `writer`.
pub fn to_writer<W: Write, T: Serialize>(writer: W, list: Option<&[T]>) -> Result<WriteSummary> {
    serialize_list(writer, list, &SerdeFormatter)
}

/// Write a list of serializable elements to `writer` using the given options.
pub fn to_writer_with_options<W: Write, T: Serialize>(
    writer: W,
    list: Option<&[T]>,
    options: &ChunkOptions,
) -> Result<WriteSummary> {
    serialize_list_with_options(writer, list, &SerdeFormatter, options)
}

/// Read a list of deserializable elements from `reader`.
pub fn from_reader<R: Read, T: DeserializeOwned>(reader: R) -> Result<Option<Vec<T>>> {
    deserialize_list(reader, &SerdeFormatter)
}

/// Read a list of deserializable elements from `reader` using the given options.
pub fn from_reader_with_options<R: Read, T: DeserializeOwned>(
    reader: R,
    options: &ChunkOptions,
) -> Result<Option<Vec<T>>> {
    deserialize_list_with_options(reader, &SerdeFormatter, options)
}

/// Encode a list of serializable elements into a new byte vector.
pub fn to_vec<T: Serialize>(list: Option<&[T]>) -> Result<Vec<u8>> {
    to_vec_with_options(list, &ChunkOptions::default())
}

/// Encode a list of serializable elements into a new byte vector using the given options.
pub fn to_vec_with_options<T: Serialize>(
    list: Option<&[T]>,
    options: &ChunkOptions,
) -> Result<Vec<u8>> {
    let mut writer = ChunkWriter::with_options(Vec::new(), options)?;
    writer.write_list(list, &SerdeFormatter)?;
    Ok(writer.into_inner())
}

/// Decode a list of deserializable elements from a byte slice.
pub fn from_slice<T: DeserializeOwned>(data: &[u8]) -> Result<Option<Vec<T>>> {
    from_reader(data)
}

/// Decode a list of deserializable elements from a byte slice using the given options.
pub fn from_slice_with_options<T: DeserializeOwned>(
    data: &[u8],
    options: &ChunkOptions,
) -> Result<Option<Vec<T>>> {
    from_reader_with_options(data, options)
}
