//! ART boot image header.

use crate::errors::ImageError;
use crate::parsers::{magic, version, Version};
use nom::bytes::streaming::take;
use nom::number::streaming::le_u32;
use nom::IResult;
use rw_utils::hexlify::hex_u32;
use serde::{Deserialize, Serialize};

pub const ART_MAGIC: &[u8; 4] = b"art\n";
pub const ART_HEADER_SIZE: usize = 512;

/// Decoded ART image header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtInfo {
    pub version: Version,
    pub image_begin: u32,
    pub image_size: u32,
    pub oat_checksum: u32,
    pub oat_file_begin: u32,
    pub oat_data_begin: u32,
    pub oat_data_end: u32,
    pub oat_file_end: u32,
    pub boot_image_begin: u32,
    pub boot_image_size: u32,
    pub boot_oat_begin: u32,
    pub boot_oat_size: u32,
    pub patch_delta: u32,
    pub image_roots: u32,
    pub pointer_size: u32,
    pub compile_pic: u32,
    pub is_pic: u32,
    pub storage_mode: u32,
    pub data_size: u32,
}

impl ArtInfo {
    /// An image is paired with the OAT file whose checksum it records.
    #[must_use]
    pub fn code_id(&self) -> String {
        hex_u32(self.oat_checksum)
    }
}

pub(crate) fn art_header_parser(input: &[u8]) -> IResult<&[u8], ArtInfo, ImageError> {
    let (input, _) = magic("art", ART_MAGIC)(input)?;
    // the whole header must be present even if only its head is decoded
    let (rest, header) = take(ART_HEADER_SIZE - ART_MAGIC.len())(input)?;

    let (header, version) = version(header)?;
    let (header, image_begin) = le_u32(header)?;
    let (header, image_size) = le_u32(header)?;
    let (header, oat_checksum) = le_u32(header)?;
    let (header, oat_file_begin) = le_u32(header)?;
    let (header, oat_data_begin) = le_u32(header)?;
    let (header, oat_data_end) = le_u32(header)?;
    let (header, oat_file_end) = le_u32(header)?;
    let (header, boot_image_begin) = le_u32(header)?;
    let (header, boot_image_size) = le_u32(header)?;
    let (header, boot_oat_begin) = le_u32(header)?;
    let (header, boot_oat_size) = le_u32(header)?;
    let (header, patch_delta) = le_u32(header)?;
    let (header, image_roots) = le_u32(header)?;
    let (header, pointer_size) = le_u32(header)?;
    let (header, compile_pic) = le_u32(header)?;
    let (header, is_pic) = le_u32(header)?;
    let (header, storage_mode) = le_u32(header)?;
    let (_, data_size) = le_u32(header)?;

    log::trace!("art version {version}, oat checksum {oat_checksum:#x}");

    Ok((
        rest,
        ArtInfo {
            version,
            image_begin,
            image_size,
            oat_checksum,
            oat_file_begin,
            oat_data_begin,
            oat_data_end,
            oat_file_end,
            boot_image_begin,
            boot_image_size,
            boot_oat_begin,
            boot_oat_size,
            patch_delta,
            image_roots,
            pointer_size,
            compile_pic,
            is_pic,
            storage_mode,
            data_size,
        },
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::errors::ImageError;
    use crate::parsers::run_complete;

    /// Builds a 512-byte header whose fields after the version are 1, 2, 3...
    pub(crate) fn art_header(version: &[u8; 4], oat_checksum: u32) -> Vec<u8> {
        let mut buf = ART_MAGIC.to_vec();
        buf.extend_from_slice(version);
        for i in 1..=18u32 {
            let v = if i == 3 { oat_checksum } else { i };
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf.resize(ART_HEADER_SIZE, 0);
        buf
    }

    #[test]
    fn decode_art_header() {
        let buf = art_header(b"074\0", 0x1234_abcd);
        let info = run_complete(&buf, "art", art_header_parser).unwrap();
        assert_eq!(info.version.to_string(), "074");
        assert_eq!(info.image_begin, 1);
        assert_eq!(info.image_size, 2);
        assert_eq!(info.oat_checksum, 0x1234_abcd);
        assert_eq!(info.pointer_size, 14);
        assert_eq!(info.data_size, 18);
        assert_eq!(info.code_id(), "1234abcd");
    }

    #[test]
    fn corrupted_magic_is_rejected() {
        let mut buf = art_header(b"074\0", 1);
        buf[0] = b'x';
        let res = run_complete(&buf, "art", art_header_parser);
        assert!(matches!(res, Err(ImageError::BadMagic { format: "art", .. })));
    }

    #[test]
    fn short_header_is_truncated() {
        let buf = art_header(b"074\0", 1);
        let res = run_complete(&buf[..200], "art", art_header_parser);
        assert!(matches!(res, Err(ImageError::Truncated("art"))));
    }
}
