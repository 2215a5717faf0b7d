use std::fmt;

use serde::{de, ser};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    /// Reading from or writing to the underlying stream failed.
    Io(std::io::Error),
    /// Occurs when serde serialization or deserialization fails
    SerdeFail(String),
    /// Basic MessagePack encoding failure
    BadEncode(String),
    /// A frame didn't have a recognizable shape: unknown leading marker, unknown extension type,
    /// a chunk body that isn't an array, or leftover bytes after the last element of a chunk.
    BadFrame(String),
    /// Occurs when LZ4 decompression fails, or doesn't produce the promised number of bytes.
    FailDecompress(String),
    /// A chunk or value was larger than the maximum allowed size.
    LengthTooLong { max: usize, actual: usize },
    /// The data or stream ended too early.
    LengthTooShort {
        step: &'static str,
        actual: usize,
        expected: usize,
    },
    /// Encoding or decoding hit some parsing limit.
    ParseLimit(String),
    /// The provided [`ChunkOptions`][crate::ChunkOptions] can't be used.
    BadOptions(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => write!(f, "I/O failure: {}", err),
            Error::SerdeFail(ref msg) => f.write_str(msg),
            Error::BadEncode(ref err) => write!(f, "Basic data encoding failure: {}", err),
            Error::BadFrame(ref err) => write!(f, "Malformed frame: {}", err),
            Error::FailDecompress(ref err) => write!(f, "Failed decompression step: {}", err),
            Error::LengthTooLong { max, actual } => write!(
                f,
                "Data too long: was {} bytes, maximum allowed is {}",
                actual, max
            ),
            Error::LengthTooShort {
                step,
                actual,
                expected,
            } => write!(
                f,
                "Expected data length {}, but got {} on step [{}]",
                expected, actual, step
            ),
            Error::ParseLimit(ref err) => write!(f, "Hit parsing limit: {}", err),
            Error::BadOptions(ref err) => write!(f, "Invalid chunk options: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl std::convert::From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}
