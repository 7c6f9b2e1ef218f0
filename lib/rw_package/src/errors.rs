//! Package errors definitions.

use std::io;
use thiserror::Error;
use zip::result::ZipError;

/// An alias for result that can be a [`PackageError`].
pub type PackageResult<T> = Result<T, PackageError>;

/// The package error type.
#[derive(Debug, Error)]
pub enum PackageError {
    /// Error that can be returned when doing [std::io](I/O) operations.
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// Error that can be returned when opening or reading a zip file.
    #[error("zip error: {0}")]
    Zip(#[from] ZipError),
}
