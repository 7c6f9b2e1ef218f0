//! Global error handling.
//!
//! Each sub-crate of the project defines its own type error.
//! Their types can be unified, for example in a main function,
//! when winding results at the top-level.
//!
//! ```no_run
//! use relworks::prelude::*;
//!
//! fn main() -> RwResult<()> { // can return a RwError
//!    let _release = rw_release::build("out/sargo")?; // can return a ReleaseError
//!    Ok(())
//! }
//! ```

use rw_images::errors::ImageError;
use rw_native::errors::NativeError;
use rw_package::errors::PackageError;
use rw_release::errors::ReleaseError;
use std::io;
use thiserror::Error;

/// An alias for result that can be a [`RwError`].
pub type RwResult<T> = Result<T, RwError>;

/// The main error type for error winding at the top-level.
/// It mainly consists of transparent wrapper over error types that
/// are defined in dependencies.
#[derive(Debug, Error)]
pub enum RwError {
    /// Custom error for reporting bad command line arguments usage.
    #[error("bad arguments: {0}")]
    BadArguments(String),

    /// Error that can be returned from [I/O operations](std::io).
    #[error(transparent)]
    IO(#[from] io::Error),

    /// Error that can be returned when reading or writing saved releases.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Error that can be returned from [`rw_images`] functions.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error that can be returned from [`rw_native`] functions.
    #[error(transparent)]
    Native(#[from] NativeError),

    /// Error that can be returned from [`rw_package`] functions.
    #[error(transparent)]
    Package(#[from] PackageError),

    /// Error that can be returned from [`rw_release`] functions.
    #[error(transparent)]
    Release(#[from] ReleaseError),
}
