//! File type detection, from the file name first and from its first bytes
//! when the name says nothing.

use crate::artifact::ArtifactKind;
use rw_native::is_elf;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Ordered name patterns: `-tradefed.jar` must be tried before `.jar`.
/// Patterns starting with `.` or `-` are suffixes, others whole names.
const PATTERNS: &[(&str, ArtifactKind)] = &[
    (".apk", ArtifactKind::Apk),
    (".config", ArtifactKind::TestModuleConfig),
    ("-tradefed.jar", ArtifactKind::TestSuiteManifest),
    (".jar", ArtifactKind::Jar),
    (".so", ArtifactKind::So),
    (".art", ArtifactKind::Art),
    (".oat", ArtifactKind::Oat),
    (".odex", ArtifactKind::Odex),
    (".vdex", ArtifactKind::Vdex),
    ("build.prop", ArtifactKind::BuildProp),
    (".rc", ArtifactKind::Rc),
    (".xml", ArtifactKind::Xml),
    (".img", ArtifactKind::Img),
];

/// Classification from the name and length only. `None` means the content
/// must be looked at.
#[must_use]
pub fn classify_by_name(name: &str, len: u64) -> Option<ArtifactKind> {
    // symbolic links of materialized releases are empty files
    if len == 0 {
        return Some(ArtifactKind::SymbolicLink);
    }
    PATTERNS
        .iter()
        .find(|(pattern, _)| matches_pattern(name, pattern))
        .map(|(_, kind)| *kind)
}

fn matches_pattern(name: &str, pattern: &str) -> bool {
    if pattern.starts_with('.') || pattern.starts_with('-') {
        name.ends_with(pattern)
    } else {
        name == pattern
    }
}

/// Classification from the first bytes of an unnamed file.
#[must_use]
pub fn classify_by_magic(magic: &[u8]) -> ArtifactKind {
    if is_elf(magic) {
        ArtifactKind::Exe
    } else {
        ArtifactKind::File
    }
}

/// Classifies the file at `path`, `len` bytes long. At most four bytes are
/// read.
pub fn classify<P: AsRef<Path>>(path: P, len: u64) -> io::Result<ArtifactKind> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    if let Some(kind) = classify_by_name(&name, len) {
        return Ok(kind);
    }
    let mut magic = Vec::with_capacity(4);
    File::open(path)?.take(4).read_to_end(&mut magic)?;
    Ok(classify_by_magic(&magic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn suffix_order() {
        assert_eq!(
            classify_by_name("android-cts-tradefed.jar", 10),
            Some(ArtifactKind::TestSuiteManifest)
        );
        assert_eq!(classify_by_name("framework.jar", 10), Some(ArtifactKind::Jar));
        assert_eq!(classify_by_name("boot.art", 10), Some(ArtifactKind::Art));
        assert_eq!(classify_by_name("services.odex", 10), Some(ArtifactKind::Odex));
        assert_eq!(classify_by_name("build.prop", 10), Some(ArtifactKind::BuildProp));
        assert_eq!(classify_by_name("default_build.prop", 10), None);
        assert_eq!(classify_by_name("init.zygote64.rc", 10), Some(ArtifactKind::Rc));
        assert_eq!(classify_by_name("CtsModule.config", 10), Some(ArtifactKind::TestModuleConfig));
        assert_eq!(classify_by_name("app_process64", 10), None);
    }

    #[test]
    fn empty_files_are_links() {
        assert_eq!(classify_by_name("libGLES_android.so", 0), Some(ArtifactKind::SymbolicLink));
    }

    #[test]
    fn content_sniffing() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("app_process64");
        fs::write(&exe, b"\x7fELF\x02\x01\x01\0").unwrap();
        let text = dir.path().join("README");
        fs::write(&text, b"hello").unwrap();
        let short = dir.path().join("x");
        fs::write(&short, b"\x7f").unwrap();

        assert_eq!(classify(&exe, 8).unwrap(), ArtifactKind::Exe);
        assert_eq!(classify(&text, 5).unwrap(), ArtifactKind::File);
        assert_eq!(classify(&short, 1).unwrap(), ArtifactKind::File);
    }
}
