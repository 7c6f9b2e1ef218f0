//! Thin layer over the ELF reader: the few facts the dependency policies need.

use crate::errors::{NativeError, NativeResult};
use goblin::elf::header::{EM_386, EM_AARCH64, EM_ARM, EM_MIPS, EM_RISCV, EM_X86_64};
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::Elf;

pub const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

const RODATA: &str = ".rodata";

/// Returns the architecture name of an ELF machine, the way Android names its ABIs.
#[must_use]
pub fn architecture_name(machine: u16, is_64: bool) -> String {
    match (machine, is_64) {
        (EM_ARM, _) => "arm".to_string(),
        (EM_AARCH64, _) => "arm64".to_string(),
        (EM_386, _) => "x86".to_string(),
        (EM_X86_64, _) => "x86_64".to_string(),
        (EM_MIPS, false) => "mips".to_string(),
        (EM_MIPS, true) => "mips64".to_string(),
        (EM_RISCV, true) => "riscv64".to_string(),
        (EM_RISCV, false) => "riscv32".to_string(),
        (other, _) => format!("unknown({other})"),
    }
}

pub(crate) fn bits(elf: &Elf) -> u8 {
    if elf.is_64 {
        64
    } else {
        32
    }
}

pub(crate) fn has_dynamic_symbol(elf: &Elf, names: &[&str]) -> bool {
    elf.dynsyms.iter().any(|sym| {
        elf.dynstrtab
            .get_at(sym.st_name)
            .map_or(false, |name| names.contains(&name))
    })
}

pub(crate) fn dynamic_symbol_value(elf: &Elf, name: &str) -> Option<u64> {
    elf.dynsyms
        .iter()
        .find(|sym| elf.dynstrtab.get_at(sym.st_name) == Some(name))
        .map(|sym| sym.st_value)
}

/// Bytes of the read-only data section, empty when there is none.
pub(crate) fn rodata<'a>(elf: &Elf, bytes: &'a [u8]) -> &'a [u8] {
    elf.section_headers
        .iter()
        .find(|sh| elf.shdr_strtab.get_at(sh.sh_name) == Some(RODATA))
        .and_then(|sh| {
            let start = usize::try_from(sh.sh_offset).ok()?;
            let end = start.checked_add(usize::try_from(sh.sh_size).ok()?)?;
            bytes.get(start..end)
        })
        .unwrap_or(&[])
}

/// Maps a virtual address to its offset in file through the loadable segments.
pub(crate) fn file_offset(elf: &Elf, vaddr: u64) -> NativeResult<u64> {
    elf.program_headers
        .iter()
        .filter(|ph| ph.p_type == PT_LOAD)
        .find(|ph| ph.p_vaddr <= vaddr && vaddr - ph.p_vaddr < ph.p_filesz)
        .map(|ph| vaddr - ph.p_vaddr + ph.p_offset)
        .ok_or(NativeError::UnmappedAddress(vaddr))
}

/// Printable ASCII strings of at least `min_len` characters, delimited by NUL
/// bytes. Only the printable tail of each delimited chunk is kept.
#[must_use]
pub fn printable_strings(data: &[u8], min_len: usize) -> Vec<&str> {
    data.split(|b| *b == 0)
        .filter_map(|chunk| {
            let start = chunk
                .iter()
                .rposition(|b| !(0x20..0x7f).contains(b))
                .map_or(0, |p| p + 1);
            let tail = &chunk[start..];
            if tail.len() >= min_len {
                std::str::from_utf8(tail).ok()
            } else {
                None
            }
        })
        .collect()
}
