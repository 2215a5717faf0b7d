use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Compression settings for chunk frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compress {
    /// Write every chunk as a plain MessagePack array.
    None,
    /// Compress chunks with the LZ4 block format, wrapped in an `ext 32` value of extension type
    /// 99.
    Lz4Block,
}

impl Compress {
    /// Attempt to compress the data, appending it onto `dst`. Returns `false` and leaves `dst`
    /// alone if this setting doesn't compress.
    pub(crate) fn compress(&self, dst: &mut Vec<u8>, src: &[u8]) -> Result<bool> {
        match self {
            Compress::None => Ok(false),
            Compress::Lz4Block => {
                lz4_compress(src, dst)?;
                Ok(true)
            }
        }
    }
}

impl std::default::Default for Compress {
    fn default() -> Self {
        Compress::Lz4Block
    }
}

/// Compress `input` as a single LZ4 block and append it to `output`. Returns the compressed size.
pub(crate) fn lz4_compress(input: &[u8], output: &mut Vec<u8>) -> Result<usize> {
    let start = output.len();
    output.resize(start + lz4_flex::block::get_maximum_output_size(input.len()), 0);
    let used_len = match lz4_flex::block::compress_into(input, &mut output[start..]) {
        Ok(len) => len,
        Err(e) => {
            output.truncate(start);
            return Err(Error::BadEncode(format!("lz4 compression failed: {}", e)));
        }
    };
    output.truncate(start + used_len);
    Ok(used_len)
}

/// Decompress a single LZ4 block, appending exactly `expected_len` bytes to `output`. Fails if
/// the block doesn't decode to precisely that many bytes.
pub(crate) fn lz4_decompress(input: &[u8], expected_len: usize, output: &mut Vec<u8>) -> Result<()> {
    let start = output.len();
    output.resize(start + expected_len, 0);
    let result = lz4_flex::block::decompress_into(input, &mut output[start..]);
    let used_len = match result {
        Ok(len) => len,
        Err(e) => {
            output.truncate(start);
            return Err(Error::FailDecompress(format!("{}", e)));
        }
    };
    if used_len != expected_len {
        output.truncate(start);
        return Err(Error::FailDecompress(format!(
            "Decompressed size {} doesn't match promised size {}",
            used_len, expected_len
        )));
    }
    Ok(())
}
