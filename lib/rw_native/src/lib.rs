//! Native binaries (shared libraries and executables) analysis.
//!
//! ELF decoding is delegated to `goblin`; this crate owns the policies built on
//! top of it: which libraries a binary links against, which ones it may load
//! at runtime, and where an OAT payload starts inside an ELF container.

mod dlopen;
mod elf;

pub mod errors;
#[cfg(any(test, feature = "fixtures"))]
#[doc(hidden)]
pub mod fixtures;

pub use crate::dlopen::{EGL_DRIVER_PATTERNS, EGL_LOADER, LIBRARY_SUFFIX};
pub use crate::elf::{architecture_name, printable_strings, ELF_MAGIC};

use crate::errors::{NativeError, NativeResult};
use goblin::elf::Elf;
use serde::{Deserialize, Serialize};

const OATDATA_SYMBOL: &str = "oatdata";

/// What a native binary needs to be loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeInfo {
    pub bits: u8,
    pub architecture: String,
    /// Libraries declared in the dynamic section.
    pub dependencies: Vec<String>,
    /// Libraries that may be loaded at runtime, guessed from the string pool.
    pub dynamic_loading_dependencies: Vec<String>,
}

/// Returns whether `bytes` starts with the ELF magic.
#[must_use]
pub fn is_elf(bytes: &[u8]) -> bool {
    bytes.starts_with(ELF_MAGIC)
}

/// Analyzes the binary `name` whose content is `bytes`.
pub fn analyze(name: &str, bytes: &[u8]) -> NativeResult<NativeInfo> {
    let elf = Elf::parse(bytes)?;
    let bits = elf::bits(&elf);
    let architecture = elf::architecture_name(elf.header.e_machine, elf.is_64);
    let dependencies: Vec<String> = elf.libraries.iter().map(|lib| (*lib).to_string()).collect();

    let mut dynamic_loading_dependencies = if elf::has_dynamic_symbol(&elf, dlopen::DLOPEN_SYMBOLS) {
        let strings = elf::printable_strings(elf::rodata(&elf, bytes), dlopen::MIN_STRING_LEN);
        dlopen::candidates(name, strings)
    } else {
        Vec::new()
    };
    dlopen::add_driver_patterns(name, &mut dynamic_loading_dependencies);

    log::debug!(
        "{name}: {bits}-bit {architecture}, {} needed, {} loaded at runtime",
        dependencies.len(),
        dynamic_loading_dependencies.len()
    );

    Ok(NativeInfo {
        bits,
        architecture,
        dependencies,
        dynamic_loading_dependencies,
    })
}

/// File offset of the OAT payload of an ELF container (`.oat`, `.odex`).
pub fn oatdata_offset(bytes: &[u8]) -> NativeResult<u64> {
    let elf = Elf::parse(bytes)?;
    let vaddr = elf::dynamic_symbol_value(&elf, OATDATA_SYMBOL)
        .ok_or_else(|| NativeError::SymbolNotFound(OATDATA_SYMBOL.to_string()))?;
    elf::file_offset(&elf, vaddr)
}
