//! Native binaries errors definitions.

use thiserror::Error;

/// An alias for result that can be a [`NativeError`].
pub type NativeResult<T> = Result<T, NativeError>;

/// The native binary error type.
#[derive(Debug, Error)]
pub enum NativeError {
    /// Error that can be returned by the ELF reader.
    #[error("ELF error: {0}")]
    Elf(#[from] goblin::error::Error),

    /// No dynamic symbol with the given name.
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    /// A symbol address is not backed by any loadable segment.
    #[error("address {0:#x} is not mapped in file")]
    UnmappedAddress(u64),
}
