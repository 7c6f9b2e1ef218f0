//! Hand-built ELF64 little-endian shared objects, for tests of this crate and
//! of the crates that embed native binaries.
//!
//! The whole file is mapped by a single loadable segment at address 0, so
//! virtual addresses and file offsets are the same. Dynamic symbols are
//! counted through a `DT_HASH` table.

use crate::OATDATA_SYMBOL;
use goblin::elf::dynamic::{DT_HASH, DT_NEEDED, DT_NULL, DT_STRSZ, DT_STRTAB, DT_SYMENT, DT_SYMTAB};
use goblin::elf::program_header::{PF_R, PT_DYNAMIC, PT_LOAD};
use goblin::elf::section_header::{SHT_PROGBITS, SHT_STRTAB};
use goblin::elf::sym::{STB_GLOBAL, STT_FUNC, STT_OBJECT};

pub use goblin::elf::header::{EM_AARCH64, EM_ARM, EM_X86_64};

const EHDR_SIZE: usize = 64;
const PHDR_SIZE: usize = 56;
const SHDR_SIZE: usize = 64;
const SYM_SIZE: usize = 24;
const DYN_SIZE: usize = 16;

#[derive(Debug, Clone, Default)]
pub struct ElfBuilder {
    machine: u16,
    needed: Vec<String>,
    symbols: Vec<String>,
    rodata: Vec<u8>,
    oatdata: Option<Vec<u8>>,
}

impl ElfBuilder {
    #[must_use]
    pub fn new(machine: u16) -> Self {
        Self {
            machine,
            ..Self::default()
        }
    }

    /// Adds a `DT_NEEDED` entry.
    #[must_use]
    pub fn needed(mut self, name: &str) -> Self {
        self.needed.push(name.to_string());
        self
    }

    /// Adds an undefined dynamic symbol, as an import.
    #[must_use]
    pub fn symbol(mut self, name: &str) -> Self {
        self.symbols.push(name.to_string());
        self
    }

    /// Content of the `.rodata` section.
    #[must_use]
    pub fn rodata(mut self, data: &[u8]) -> Self {
        self.rodata = data.to_vec();
        self
    }

    /// Appends `payload` at the end of the file, behind an `oatdata` symbol.
    #[must_use]
    pub fn oatdata(mut self, payload: &[u8]) -> Self {
        self.oatdata = Some(payload.to_vec());
        self
    }

    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        // header and program headers are written last
        let mut buf = vec![0; EHDR_SIZE + 2 * PHDR_SIZE];

        let dynstr_off = buf.len();
        let mut dynstr = vec![0];
        let needed: Vec<u32> = self
            .needed
            .iter()
            .map(|name| push_str(&mut dynstr, name))
            .collect();
        let mut symbols: Vec<(u32, bool)> = self
            .symbols
            .iter()
            .map(|name| (push_str(&mut dynstr, name), false))
            .collect();
        if self.oatdata.is_some() {
            symbols.push((push_str(&mut dynstr, OATDATA_SYMBOL), true));
        }
        buf.extend_from_slice(&dynstr);
        align(&mut buf, 8);

        // the null symbol comes first
        let dynsym_off = buf.len();
        let nb_syms = symbols.len() + 1;
        buf.resize(dynsym_off + nb_syms * SYM_SIZE, 0);

        // one bucket, chains all empty
        let hash_off = buf.len();
        push_u32(&mut buf, 1);
        push_u32(&mut buf, to_u32(nb_syms));
        for _ in 0..=nb_syms {
            push_u32(&mut buf, 0);
        }
        align(&mut buf, 8);

        let rodata_off = buf.len();
        buf.extend_from_slice(&self.rodata);

        let shstrtab_off = buf.len();
        let mut shstrtab = vec![0];
        let rodata_name = push_str(&mut shstrtab, ".rodata");
        let shstrtab_name = push_str(&mut shstrtab, ".shstrtab");
        buf.extend_from_slice(&shstrtab);
        align(&mut buf, 8);

        let dynamic_off = buf.len();
        let mut dynamic: Vec<(u64, u64)> = needed
            .iter()
            .map(|offset| (DT_NEEDED, u64::from(*offset)))
            .collect();
        dynamic.extend([
            (DT_HASH, to_u64(hash_off)),
            (DT_STRTAB, to_u64(dynstr_off)),
            (DT_STRSZ, to_u64(dynstr.len())),
            (DT_SYMTAB, to_u64(dynsym_off)),
            (DT_SYMENT, to_u64(SYM_SIZE)),
            (DT_NULL, 0),
        ]);
        for (tag, value) in &dynamic {
            push_u64(&mut buf, *tag);
            push_u64(&mut buf, *value);
        }
        let dynamic_size = dynamic.len() * DYN_SIZE;

        let shoff = buf.len();
        buf.resize(shoff + SHDR_SIZE, 0);
        push_section(&mut buf, rodata_name, SHT_PROGBITS, rodata_off, self.rodata.len());
        push_section(&mut buf, shstrtab_name, SHT_STRTAB, shstrtab_off, shstrtab.len());

        align(&mut buf, 16);
        let oatdata_off = buf.len();
        if let Some(payload) = &self.oatdata {
            buf.extend_from_slice(payload);
        }

        for (i, (name, is_oatdata)) in symbols.iter().enumerate() {
            let mut sym = Vec::with_capacity(SYM_SIZE);
            push_u32(&mut sym, *name);
            if *is_oatdata {
                sym.push((STB_GLOBAL << 4) | STT_OBJECT);
                sym.push(0);
                sym.extend_from_slice(&1u16.to_le_bytes()); // defined in .rodata
                push_u64(&mut sym, to_u64(oatdata_off));
                push_u64(&mut sym, to_u64(buf.len() - oatdata_off));
            } else {
                sym.push((STB_GLOBAL << 4) | STT_FUNC);
                sym.push(0);
                sym.extend_from_slice(&0u16.to_le_bytes()); // undefined
                push_u64(&mut sym, 0);
                push_u64(&mut sym, 0);
            }
            let at = dynsym_off + (i + 1) * SYM_SIZE;
            buf[at..at + SYM_SIZE].copy_from_slice(&sym);
        }

        let total = buf.len();
        let mut head = Vec::with_capacity(EHDR_SIZE + 2 * PHDR_SIZE);
        head.extend_from_slice(crate::ELF_MAGIC);
        head.extend_from_slice(&[2, 1, 1, 0]); // class 64, little-endian, version, abi
        head.resize(16, 0);
        head.extend_from_slice(&3u16.to_le_bytes()); // ET_DYN
        head.extend_from_slice(&self.machine.to_le_bytes());
        push_u32(&mut head, 1);
        push_u64(&mut head, 0); // entry
        push_u64(&mut head, to_u64(EHDR_SIZE));
        push_u64(&mut head, to_u64(shoff));
        push_u32(&mut head, 0); // flags
        for v in [EHDR_SIZE, PHDR_SIZE, 2, SHDR_SIZE, 3, 2] {
            head.extend_from_slice(&to_u16(v).to_le_bytes());
        }
        push_segment(&mut head, PT_LOAD, 0, total, 0x1000);
        push_segment(&mut head, PT_DYNAMIC, dynamic_off, dynamic_size, 8);
        buf[..head.len()].copy_from_slice(&head);
        buf
    }
}

fn push_str(table: &mut Vec<u8>, s: &str) -> u32 {
    let offset = to_u32(table.len());
    table.extend_from_slice(s.as_bytes());
    table.push(0);
    offset
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_segment(buf: &mut Vec<u8>, kind: u32, offset: usize, size: usize, alignment: u64) {
    push_u32(buf, kind);
    push_u32(buf, PF_R);
    push_u64(buf, to_u64(offset));
    push_u64(buf, to_u64(offset)); // vaddr
    push_u64(buf, to_u64(offset)); // paddr
    push_u64(buf, to_u64(size));
    push_u64(buf, to_u64(size));
    push_u64(buf, alignment);
}

fn push_section(buf: &mut Vec<u8>, name: u32, kind: u32, offset: usize, size: usize) {
    push_u32(buf, name);
    push_u32(buf, kind);
    push_u64(buf, 2); // SHF_ALLOC
    push_u64(buf, to_u64(offset)); // addr
    push_u64(buf, to_u64(offset));
    push_u64(buf, to_u64(size));
    push_u32(buf, 0); // link
    push_u32(buf, 0); // info
    push_u64(buf, 1);
    push_u64(buf, 0);
}

fn align(buf: &mut Vec<u8>, alignment: usize) {
    let len = buf.len().div_ceil(alignment) * alignment;
    buf.resize(len, 0);
}

fn to_u16(v: usize) -> u16 {
    u16::try_from(v).unwrap_or(u16::MAX)
}

fn to_u32(v: usize) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

fn to_u64(v: usize) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}
