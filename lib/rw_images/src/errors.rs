//! Runtime image errors definitions.

use std::io;
use thiserror::Error;

/// An alias for result that can be an [`ImageError`].
pub type ImageResult<T> = Result<T, ImageError>;

/// The runtime image error type.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Error that can be returned when doing [std::io](I/O) operations.
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// Error that can be returned at parsing.
    #[error("parsing error: {0:?}")]
    Parsing(nom::error::ErrorKind),

    /// The first four bytes do not hold the expected magic.
    #[error("bad {format} magic: {found:?}")]
    BadMagic { format: &'static str, found: String },

    /// The input ended before the header was complete.
    #[error("{0} header is truncated")]
    Truncated(&'static str),

    /// The header declares more data than the reader accepts to buffer.
    #[error("{0} header is larger than the read window")]
    TooLarge(&'static str),

    #[error("{0} structure is invalid: {1}")]
    Structure(&'static str, String),
}

impl nom::error::ParseError<&[u8]> for ImageError {
    fn from_error_kind(_input: &[u8], kind: nom::error::ErrorKind) -> Self {
        Self::Parsing(kind)
    }

    fn append(_: &[u8], _: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}
