use lazy_static::lazy_static;
use regex::Regex;

const BINARY_XML_MAGIC: &[u8] = &[0x03, 0x00, 0x08, 0x00];

pub(crate) fn is_dex(filename: &str) -> bool {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"^(dex/)?classes[0-9]*\.dex$")
            .expect("failed to compile dex filename regex");
    }
    RE.is_match(filename)
}

pub(crate) fn is_manifest(filename: &str) -> bool {
    filename == "AndroidManifest.xml" || filename == "manifest/AndroidManifest.xml"
}

pub(crate) fn is_native_library(filename: &str) -> bool {
    filename.ends_with(rw_native::LIBRARY_SUFFIX)
}

/// Entries whose checksum contributes to the container code id.
pub(crate) fn is_code_entry(filename: &str) -> bool {
    is_native_library(filename) || filename.ends_with(".dex") || filename.ends_with("AndroidManifest.xml")
}

pub(crate) fn is_binary_xml(data: &[u8]) -> bool {
    data.starts_with(BINARY_XML_MAGIC)
}

pub(crate) fn base_name(entry_name: &str) -> &str {
    entry_name.rsplit('/').next().unwrap_or(entry_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_classification() {
        assert!(is_dex("classes.dex"));
        assert!(is_dex("classes12.dex"));
        assert!(!is_dex("assets/classes.dex"));
        assert!(is_manifest("AndroidManifest.xml"));
        assert!(is_code_entry("lib/arm64-v8a/libfoo.so"));
        assert!(is_code_entry("assets/extra.dex"));
        assert!(!is_code_entry("META-INF/MANIFEST.MF"));
        assert!(!is_code_entry("res/layout/main.xml"));
        assert_eq!(base_name("lib/arm64-v8a/libfoo.so"), "libfoo.so");
        assert_eq!(base_name("libfoo.so"), "libfoo.so");
    }
}
