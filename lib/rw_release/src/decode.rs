//! Per-kind decoding of a release file into an [`Artifact`].
//!
//! Decoding never fails past this module: a file that cannot be read is
//! reported to the caller, a file whose content does not decode yields an
//! artifact marked invalid.

use crate::artifact::{Artifact, ArtifactKind, Payload};
use crate::errors::ReleaseResult;
use crate::initrc;
use crate::sniffer;
use rw_utils::digest::file_digest;
use rw_utils::properties;
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::PathBuf;

/// Name of the metadata entry of a test suite manifest.
pub const TEST_SUITE_INFO: &str = "test-suite-info.properties";

/// A release file found by the tree walk.
#[derive(Debug, Clone)]
pub(crate) struct FileEntry {
    pub(crate) path: PathBuf,
    pub(crate) name: String,
    pub(crate) relative_path: String,
    pub(crate) parent_folder: String,
    pub(crate) size: u64,
    pub(crate) is_symlink: bool,
}

/// What a format decoder adds to the generic artifact fields.
#[derive(Debug, Default)]
struct Decoded {
    code_id: String,
    abi_bits: u8,
    abi_architecture: String,
    dependencies: Vec<String>,
    dynamic_loading_dependencies: Vec<String>,
    payload: Option<Payload>,
}

/// Sniffs, hashes and decodes `entry`. Errors are I/O failures only.
pub(crate) fn decode(entry: &FileEntry, package: &rw_package::Options) -> ReleaseResult<Artifact> {
    let kind = if entry.is_symlink {
        ArtifactKind::SymbolicLink
    } else {
        sniffer::classify(&entry.path, entry.size)?
    };
    log::debug!("{}: {kind}", entry.relative_path);

    let mut artifact = Artifact::new(&entry.name, &entry.relative_path, &entry.parent_folder, kind);
    if kind == ArtifactKind::SymbolicLink {
        // the link target is looked up by name at resolution time
        artifact.dependencies.push(entry.name.clone());
        return Ok(artifact);
    }

    artifact.size = entry.size;
    artifact.content_id = file_digest(&entry.path)?;

    match decode_format(entry, kind, package) {
        Ok(decoded) => {
            artifact.code_id = decoded.code_id;
            artifact.abi_bits = decoded.abi_bits;
            artifact.abi_architecture = decoded.abi_architecture;
            artifact.dependencies = decoded.dependencies;
            artifact.dynamic_loading_dependencies = decoded.dynamic_loading_dependencies;
            artifact.payload = decoded.payload;
        }
        Err(e) => {
            log::warn!("{}: invalid {kind}: {e}", entry.relative_path);
            artifact.valid = false;
        }
    }
    Ok(artifact)
}

fn decode_format(
    entry: &FileEntry,
    kind: ArtifactKind,
    package: &rw_package::Options,
) -> ReleaseResult<Decoded> {
    match kind {
        ArtifactKind::Art => {
            let info = rw_images::read_art(BufReader::new(File::open(&entry.path)?))?;
            Ok(Decoded {
                code_id: info.code_id(),
                payload: Some(Payload::Art(info)),
                ..Decoded::default()
            })
        }
        ArtifactKind::Oat | ArtifactKind::Odex => decode_oat(entry),
        ArtifactKind::Vdex => {
            let info = rw_images::read_vdex(BufReader::new(File::open(&entry.path)?))?;
            Ok(Decoded {
                code_id: info.code_id(),
                payload: Some(Payload::Vdex(info)),
                ..Decoded::default()
            })
        }
        ArtifactKind::Apk | ArtifactKind::Jar => {
            let info = package.walk(&entry.path, kind == ArtifactKind::Apk)?;
            Ok(Decoded {
                code_id: info.code_id.clone(),
                abi_bits: info.abi_bits,
                abi_architecture: info.abi_architecture.clone(),
                dependencies: info.dependencies.clone(),
                dynamic_loading_dependencies: info.dynamic_loading_dependencies.clone(),
                payload: Some(Payload::Archive(info)),
            })
        }
        ArtifactKind::So | ArtifactKind::Exe => {
            let bytes = fs::read(&entry.path)?;
            let info = rw_native::analyze(&entry.name, &bytes)?;
            Ok(Decoded {
                abi_bits: info.bits,
                abi_architecture: info.architecture,
                dependencies: info.dependencies,
                dynamic_loading_dependencies: info.dynamic_loading_dependencies,
                ..Decoded::default()
            })
        }
        ArtifactKind::Rc => {
            let script = initrc::parse(&fs::read_to_string(&entry.path)?);
            Ok(Decoded {
                dependencies: script.dependencies(),
                payload: Some(Payload::InitScript(script)),
                ..Decoded::default()
            })
        }
        ArtifactKind::BuildProp => {
            let props = properties::parse_bytes(&fs::read(&entry.path)?);
            Ok(Decoded {
                payload: Some(Payload::Properties(props)),
                ..Decoded::default()
            })
        }
        ArtifactKind::TestSuiteManifest => {
            let props = properties::parse_bytes(&rw_package::read_entry(&entry.path, TEST_SUITE_INFO)?);
            Ok(Decoded {
                payload: Some(Payload::Properties(props)),
                ..Decoded::default()
            })
        }
        ArtifactKind::File
        | ArtifactKind::Folder
        | ArtifactKind::SymbolicLink
        | ArtifactKind::Xml
        | ArtifactKind::Img
        | ArtifactKind::TestModuleConfig => Ok(Decoded::default()),
    }
}

/// OAT data is either raw, or wrapped in an ELF container where it starts at
/// the `oatdata` symbol.
fn decode_oat(entry: &FileEntry) -> ReleaseResult<Decoded> {
    let mut file = File::open(&entry.path)?;
    let mut magic = Vec::with_capacity(4);
    (&mut file).take(4).read_to_end(&mut magic)?;

    let info = if rw_native::is_elf(&magic) {
        let bytes = fs::read(&entry.path)?;
        let offset = rw_native::oatdata_offset(&bytes)?;
        log::trace!("{}: oatdata at {offset:#x}", entry.relative_path);
        file.seek(SeekFrom::Start(offset))?;
        rw_images::read_oat(BufReader::new(file))?
    } else {
        file.seek(SeekFrom::Start(0))?;
        rw_images::read_oat(BufReader::new(file))?
    };

    Ok(Decoded {
        code_id: info.code_id(),
        dependencies: info.dependencies(),
        payload: Some(Payload::Oat(info)),
        ..Decoded::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_native::fixtures::{ElfBuilder, EM_AARCH64};
    use std::path::Path;

    fn push(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    /// A version 183 OAT header (no PIC fields) with two dex files.
    fn oat_payload() -> Vec<u8> {
        let mut buf = b"oat\n183\0".to_vec();
        push(&mut buf, 0xdead_beef); // adler32
        push(&mut buf, 2); // arm64
        push(&mut buf, 0);
        push(&mut buf, 2); // dex files
        for v in 0..7 {
            push(&mut buf, 0x100 + v);
        }
        push(&mut buf, 0x33);
        let store = b"bootclasspath\0/system/framework/core-oj.jar:/system/framework/ext.jar\0";
        push(&mut buf, store.len() as u32);
        buf.extend_from_slice(store);
        let dex_files = [
            ("/system/framework/services.jar", 0x12),
            ("/system/framework/services.jar!classes2.dex", 0xab),
        ];
        for (location, checksum) in dex_files {
            push(&mut buf, location.len() as u32);
            buf.extend_from_slice(location.as_bytes());
            push(&mut buf, checksum);
            for v in 0..6 {
                push(&mut buf, v);
            }
        }
        buf
    }

    fn entry(dir: &Path, name: &str, content: &[u8]) -> FileEntry {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        FileEntry {
            path,
            name: name.to_string(),
            relative_path: format!("SYSTEM/{name}"),
            parent_folder: "SYSTEM".to_string(),
            size: content.len() as u64,
            is_symlink: false,
        }
    }

    #[test]
    fn empty_file_is_a_link_to_itself() {
        let dir = tempfile::tempdir().unwrap();
        let link = entry(dir.path(), "libGLES_android.so", b"");
        let artifact = decode(&link, &rw_package::Options::default()).unwrap();
        assert_eq!(artifact.kind, ArtifactKind::SymbolicLink);
        assert_eq!(artifact.dependencies, vec!["libGLES_android.so"]);
        assert!(artifact.content_id.is_empty());
        assert!(artifact.valid);
    }

    #[test]
    fn bad_magic_marks_artifact_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let options = rw_package::Options::default();
        for name in ["boot.art", "boot.oat", "boot.vdex", "libfoo.so", "app.apk"] {
            let bad = entry(dir.path(), name, b"this is not what it claims to be");
            let artifact = decode(&bad, &options).unwrap();
            assert!(!artifact.valid, "{name}");
            assert!(!artifact.content_id.is_empty());
            assert!(artifact.code_id.is_empty());
            assert!(artifact.payload.is_none());
        }
    }

    #[test]
    fn oat_wrapped_in_elf() {
        let dir = tempfile::tempdir().unwrap();
        let options = rw_package::Options::default();
        let wrapped = ElfBuilder::new(EM_AARCH64).oatdata(&oat_payload()).build();
        let odex = entry(dir.path(), "services.odex", &wrapped);
        let artifact = decode(&odex, &options).unwrap();

        assert_eq!(artifact.kind, ArtifactKind::Odex);
        assert!(artifact.valid);
        assert_eq!(artifact.code_id, "12ab");
        assert_eq!(
            artifact.dependencies,
            vec!["/system/framework/core-oj.jar", "/system/framework/ext.jar"]
        );
        assert!(matches!(artifact.payload, Some(Payload::Oat(ref info)) if info.dex_file_count == 2));

        // raw and wrapped payloads share their code identity
        let raw = entry(dir.path(), "services.oat", &oat_payload());
        let raw = decode(&raw, &options).unwrap();
        assert!(raw.valid);
        assert_eq!(raw.code_id, artifact.code_id);
        assert_ne!(raw.content_id, artifact.content_id);
    }

    #[test]
    fn elf_without_oatdata_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = ElfBuilder::new(EM_AARCH64).needed("libc.so").build();
        let oat = entry(dir.path(), "boot.oat", &bytes);
        let artifact = decode(&oat, &rw_package::Options::default()).unwrap();
        assert!(!artifact.valid);
        assert!(artifact.code_id.is_empty());
    }

    #[test]
    fn shared_library_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = ElfBuilder::new(EM_AARCH64)
            .needed("libc.so")
            .symbol("dlopen")
            .rodata(b"libplugin.so\0")
            .build();
        let so = entry(dir.path(), "libfoo.so", &bytes);
        let artifact = decode(&so, &rw_package::Options::default()).unwrap();
        assert_eq!(artifact.kind, ArtifactKind::So);
        assert_eq!(artifact.abi_bits, 64);
        assert_eq!(artifact.abi_architecture, "arm64");
        assert_eq!(artifact.dependencies, vec!["libc.so"]);
        assert_eq!(artifact.dynamic_loading_dependencies, vec!["libplugin.so"]);
    }

    #[test]
    fn init_script_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let rc = entry(
            dir.path(),
            "surfaceflinger.rc",
            b"service surfaceflinger /system/bin/surfaceflinger\n    class core\n",
        );
        let artifact = decode(&rc, &rw_package::Options::default()).unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Rc);
        assert_eq!(artifact.dependencies, vec!["/system/bin/surfaceflinger"]);
        assert!(matches!(artifact.payload, Some(Payload::InitScript(_))));
    }

    #[test]
    fn build_properties_payload() {
        let dir = tempfile::tempdir().unwrap();
        let prop = entry(dir.path(), "build.prop", b"ro.product.device=sargo\n");
        let artifact = decode(&prop, &rw_package::Options::default()).unwrap();
        match artifact.payload {
            Some(Payload::Properties(props)) => assert_eq!(props["ro.product.device"], "sargo"),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = FileEntry {
            path: dir.path().join("missing.bin"),
            name: "missing.bin".to_string(),
            relative_path: "missing.bin".to_string(),
            parent_folder: "/".to_string(),
            size: 4,
            is_symlink: false,
        };
        assert!(decode(&missing, &rw_package::Options::default()).is_err());
    }
}
