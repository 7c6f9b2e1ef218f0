//! Android runtime images headers: ART boot images, OAT compiled code and
//! VDEX verified dex containers.
//!
//! Each format is decoded from its fixed-layout header only. Decoding reads
//! the header, checks its magic, reads its version token and then a sequence
//! of little-endian fields. Every decoded value exposes a `code_id` built from
//! the checksums it embeds, which stays stable across rebuilds that only
//! change timestamps or padding.
//!
//! ```rust
//! let res = rw_images::parse_vdex(b"not a vdex file");
//! assert!(res.is_err());
//! ```

mod parsers;

pub mod art;
pub mod errors;
pub mod oat;
pub mod reader;
pub mod vdex;

pub use crate::art::ArtInfo;
pub use crate::oat::{OatDexFile, OatInfo};
pub use crate::parsers::Version;
pub use crate::vdex::{VdexDexSection, VdexInfo};

use crate::errors::ImageResult;
use crate::parsers::run_complete;
use crate::reader::parse_from_reader;
use std::io::Read;

/// Decodes an ART header from a complete buffer.
pub fn parse_art(input: &[u8]) -> ImageResult<ArtInfo> {
    run_complete(input, "art", art::art_header_parser)
}

/// Decodes an OAT header from a complete buffer starting at the OAT magic.
pub fn parse_oat(input: &[u8]) -> ImageResult<OatInfo> {
    run_complete(input, "oat", oat::oat_header_parser)
}

/// Decodes a VDEX header from a complete buffer.
pub fn parse_vdex(input: &[u8]) -> ImageResult<VdexInfo> {
    run_complete(input, "vdex", vdex::vdex_header_parser)
}

/// Decodes an ART header, reading no more than the header from `reader`.
pub fn read_art<R: Read>(reader: R) -> ImageResult<ArtInfo> {
    parse_from_reader(reader, art::ART_HEADER_SIZE, "art", art::art_header_parser)
}

/// Decodes an OAT header and its tables, reading only as much of `reader` as
/// they span.
pub fn read_oat<R: Read>(reader: R) -> ImageResult<OatInfo> {
    parse_from_reader(reader, oat::OAT_HEADER_SIZE, "oat", oat::oat_header_parser)
}

/// Decodes a VDEX header and its per-dex tables.
pub fn read_vdex<R: Read>(reader: R) -> ImageResult<VdexInfo> {
    parse_from_reader(reader, vdex::VDEX_HEADER_SIZE, "vdex", vdex::vdex_header_parser)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ImageError;
    use std::io::Cursor;

    #[test]
    fn read_art_from_longer_file() {
        let mut buf = art::tests::art_header(b"085\0", 0x77);
        buf.extend(std::iter::repeat(0xffu8).take(4096));
        let info = read_art(Cursor::new(buf)).unwrap();
        assert_eq!(info.code_id(), "77");
    }

    #[test]
    fn read_oat_grows_past_fixed_header() {
        let long_path = format!("/system/framework/{}.jar", "x".repeat(300));
        let buf = oat::tests::oat_header(
            b"183\0",
            false,
            &[("bootclasspath", long_path.as_str())],
            &[("/system/framework/a.jar", 0x5), ("/system/framework/b.jar", 0x6)],
        );
        assert!(buf.len() > oat::OAT_HEADER_SIZE * 4);
        let info = read_oat(Cursor::new(buf)).unwrap();
        assert_eq!(info.dependencies(), vec![long_path]);
        assert_eq!(info.code_id(), "56");
    }

    #[test]
    fn read_vdex_truncated_file() {
        let buf = vdex::tests::vdex_header(&[1, 2]);
        let res = read_vdex(Cursor::new(&buf[..buf.len() - 1]));
        assert!(matches!(res, Err(ImageError::Truncated("vdex"))));
    }

    #[test]
    fn garbage_is_never_a_panic() {
        for len in 0..80 {
            let data: Vec<u8> = (0..len).map(|i| (i * 37 % 256) as u8).collect();
            assert!(parse_art(&data).is_err());
            assert!(parse_oat(&data).is_err());
            assert!(parse_vdex(&data).is_err());
        }
    }
}
