//! Release errors definitions.

use rw_images::errors::ImageError;
use rw_native::errors::NativeError;
use rw_package::errors::PackageError;
use std::io;
use thiserror::Error;

/// An alias for result that can be a [`ReleaseError`].
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// The release error type.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// Error that can be returned when doing [std::io](I/O) operations.
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// Error that can be returned while enumerating the release tree.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Native(#[from] NativeError),

    #[error(transparent)]
    Package(#[from] PackageError),

    /// The release root does not exist or is not a directory.
    #[error("release root not found: {0}")]
    RootNotFound(String),

    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),
}
