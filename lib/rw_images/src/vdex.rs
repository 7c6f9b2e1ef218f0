//! VDEX header and per-dex tables.

use crate::errors::ImageError;
use crate::parsers::{magic, version, Version};
use nom::multi::count;
use nom::number::streaming::le_u32;
use nom::sequence::tuple;
use nom::IResult;
use rw_utils::hexlify::concat_checksums;
use serde::{Deserialize, Serialize};

pub const VDEX_MAGIC: &[u8; 4] = b"vdex";
pub const VDEX_HEADER_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdexDexSection {
    pub dex_size: u32,
    pub dex_shared_data_size: u32,
    pub quickening_info_size: u32,
}

/// Decoded VDEX header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdexInfo {
    pub verifier_deps_version: Version,
    pub dex_section_version: Version,
    pub number_of_dex_files: u32,
    pub verifier_deps_size: u32,
    pub dex_checksums: Vec<u32>,
    pub dex_sections: Vec<VdexDexSection>,
    pub quicken_table_offsets: Vec<u32>,
}

impl VdexInfo {
    #[must_use]
    pub fn code_id(&self) -> String {
        concat_checksums(self.dex_checksums.iter().copied())
    }
}

pub(crate) fn vdex_header_parser(input: &[u8]) -> IResult<&[u8], VdexInfo, ImageError> {
    let (input, _) = magic("vdex", VDEX_MAGIC)(input)?;
    let (input, verifier_deps_version) = version(input)?;
    let (input, dex_section_version) = version(input)?;
    let (input, number_of_dex_files) = le_u32(input)?;
    let (input, verifier_deps_size) = le_u32(input)?;
    let n = number_of_dex_files as usize;
    let (input, dex_checksums) = count(le_u32, n)(input)?;
    let (input, dex_sections) = count(dex_section_parser, n)(input)?;
    // quicken table offsets are only consumed
    let (input, quicken_table_offsets) = count(le_u32, n)(input)?;

    log::trace!(
        "vdex verifier deps {verifier_deps_version}, dex section {dex_section_version}, {n} dex file(s)"
    );

    Ok((
        input,
        VdexInfo {
            verifier_deps_version,
            dex_section_version,
            number_of_dex_files,
            verifier_deps_size,
            dex_checksums,
            dex_sections,
            quicken_table_offsets,
        },
    ))
}

fn dex_section_parser(input: &[u8]) -> IResult<&[u8], VdexDexSection, ImageError> {
    let (input, (dex_size, dex_shared_data_size, quickening_info_size)) =
        tuple((le_u32, le_u32, le_u32))(input)?;
    Ok((
        input,
        VdexDexSection {
            dex_size,
            dex_shared_data_size,
            quickening_info_size,
        },
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::parsers::run_complete;

    pub(crate) fn vdex_header(checksums: &[u32]) -> Vec<u8> {
        let mut buf = VDEX_MAGIC.to_vec();
        buf.extend_from_slice(b"019\0");
        buf.extend_from_slice(b"002\0");
        buf.extend_from_slice(&(checksums.len() as u32).to_le_bytes());
        buf.extend_from_slice(&0x80u32.to_le_bytes());
        for c in checksums {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        for i in 0..checksums.len() as u32 {
            buf.extend_from_slice(&(0x1000 * (i + 1)).to_le_bytes());
            buf.extend_from_slice(&0u32.to_le_bytes());
            buf.extend_from_slice(&0x10u32.to_le_bytes());
        }
        for _ in checksums {
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
        buf
    }

    #[test]
    fn decode_vdex_header() {
        let buf = vdex_header(&[0xcafe, 0x1]);
        let info = run_complete(&buf, "vdex", vdex_header_parser).unwrap();
        assert_eq!(info.verifier_deps_version.to_string(), "019");
        assert_eq!(info.dex_section_version.to_string(), "002");
        assert_eq!(info.number_of_dex_files, 2);
        assert_eq!(info.verifier_deps_size, 0x80);
        assert_eq!(info.dex_sections[1].dex_size, 0x2000);
        assert_eq!(info.quicken_table_offsets.len(), 2);
        assert_eq!(info.code_id(), "cafe1");
    }

    #[test]
    fn corrupted_magic_is_rejected() {
        let mut buf = vdex_header(&[1]);
        buf[3] = b'!';
        let res = run_complete(&buf, "vdex", vdex_header_parser);
        assert!(matches!(res, Err(ImageError::BadMagic { format: "vdex", .. })));
    }

    #[test]
    fn missing_tables_are_truncated() {
        let buf = vdex_header(&[1, 2, 3]);
        let res = run_complete(&buf[..30], "vdex", vdex_header_parser);
        assert!(matches!(res, Err(ImageError::Truncated("vdex"))));
    }
}
