//! `ReleaseWorks` sub-crate to walk zip containers (Android applications and
//! jars) found in a release, and summarize what they embed.

mod collaborators;
mod helpers;

pub mod errors;

pub use crate::collaborators::{
    ApiSurface, AppManifest, BytecodeIntrospector, ManifestDecoder, TextManifestDecoder,
};

use crate::errors::PackageResult;
use rw_native::NativeInfo;
use rw_utils::hexlify::{concat_checksums, hex_u32};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use zip::ZipArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Folder,
    File,
}

/// Lightweight description of a container entry. Its identity is the entry
/// CRC-32 as recorded by the container, not a hash of its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    pub name: String,
    pub size: u64,
    pub content_id: String,
    pub kind: EntryKind,
    pub native: Option<NativeInfo>,
}

/// Application specific data, decoded by the configured collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub manifest: Option<AppManifest>,
    pub api: Option<ApiSurface>,
}

/// Summary of a zip container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveInfo {
    pub entries: Vec<EntryInfo>,
    pub code_id: String,
    /// Bits and architecture of the first embedded native library.
    pub abi_bits: u8,
    pub abi_architecture: String,
    pub dependencies: Vec<String>,
    pub dynamic_loading_dependencies: Vec<String>,
    pub app: Option<AppInfo>,
}

impl ArchiveInfo {
    /// Returns an iterator over entries that are embedded native libraries.
    pub fn iter_native_libraries(&self) -> impl Iterator<Item = (&str, &NativeInfo)> {
        self.entries
            .iter()
            .filter_map(|e| e.native.as_ref().map(|n| (e.name.as_str(), n)))
    }

    fn merge_native(&mut self, native: &NativeInfo) {
        if self.abi_bits == 0 {
            self.abi_bits = native.bits;
            self.abi_architecture = native.architecture.clone();
        }
        push_unique(&mut self.dependencies, &native.dependencies);
        push_unique(
            &mut self.dynamic_loading_dependencies,
            &native.dynamic_loading_dependencies,
        );
    }
}

impl fmt::Display for ArchiveInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} entries (code id {:?}):", self.entries.len(), self.code_id)?;
        for entry in &self.entries {
            writeln!(f, "  - {} ({} bytes)", entry.name, entry.size)?;
        }
        Ok(())
    }
}

fn push_unique(into: &mut Vec<String>, from: &[String]) {
    for dep in from {
        if !into.contains(dep) {
            into.push(dep.clone());
        }
    }
}

/// Options to select what is decoded when walking a container.
#[derive(Clone, Copy)]
pub struct Options<'a> {
    analyze_native: bool,
    include_internal_symbols: bool,
    manifest_decoder: Option<&'a (dyn ManifestDecoder + Sync)>,
    bytecode_introspector: Option<&'a (dyn BytecodeIntrospector + Sync)>,
}

/// Default values analyze embedded native libraries and run no collaborator.
impl<'a> Default for Options<'a> {
    fn default() -> Self {
        Self {
            analyze_native: true,
            include_internal_symbols: false,
            manifest_decoder: None,
            bytecode_introspector: None,
        }
    }
}

impl<'a> fmt::Debug for Options<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Options")
            .field("analyze_native", &self.analyze_native)
            .field("include_internal_symbols", &self.include_internal_symbols)
            .field("manifest_decoder", &self.manifest_decoder.is_some())
            .field("bytecode_introspector", &self.bytecode_introspector.is_some())
            .finish()
    }
}

impl<'a> Options<'a> {
    #[must_use]
    pub fn dont_analyze_native(self) -> Self {
        Self {
            analyze_native: false,
            ..self
        }
    }

    #[must_use]
    pub fn include_internal_symbols(self) -> Self {
        Self {
            include_internal_symbols: true,
            ..self
        }
    }

    #[must_use]
    pub fn with_manifest_decoder(self, decoder: &'a (dyn ManifestDecoder + Sync)) -> Self {
        Self {
            manifest_decoder: Some(decoder),
            ..self
        }
    }

    #[must_use]
    pub fn with_bytecode_introspector(
        self,
        introspector: &'a (dyn BytecodeIntrospector + Sync),
    ) -> Self {
        Self {
            bytecode_introspector: Some(introspector),
            ..self
        }
    }

    /// Walks the container at `path`. Application specific collaborators run
    /// only when `is_app` is set.
    pub fn walk<P: AsRef<Path>>(&self, path: P, is_app: bool) -> PackageResult<ArchiveInfo> {
        let path = path.as_ref();
        let container = path.display().to_string();
        let file = File::open(path)?;
        let mut zip = ZipArchive::new(BufReader::new(file))?;

        let mut info = ArchiveInfo::default();
        let mut code_checksums = BTreeMap::new();
        let mut manifest_raw = None;
        let mut dexs = Vec::new();

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            let name = entry.name().to_string();
            if entry.is_dir() {
                info.entries.push(EntryInfo {
                    name,
                    size: 0,
                    content_id: String::new(),
                    kind: EntryKind::Folder,
                    native: None,
                });
                continue;
            }

            let crc = entry.crc32();
            if helpers::is_code_entry(&name) {
                code_checksums.insert(name.clone(), crc);
            }

            let mut native = None;
            if self.analyze_native && helpers::is_native_library(&name) {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf)?;
                match rw_native::analyze(helpers::base_name(&name), &buf) {
                    Ok(n) => native = Some(n),
                    Err(e) => log::warn!("{container}!{name}: {e}"),
                }
            } else if is_app && self.manifest_decoder.is_some() && helpers::is_manifest(&name) {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf)?;
                manifest_raw = Some(buf);
            } else if is_app && self.bytecode_introspector.is_some() && helpers::is_dex(&name) {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf)?;
                dexs.push(buf);
            }

            info.entries.push(EntryInfo {
                name,
                size: entry.size(),
                content_id: hex_u32(crc),
                kind: EntryKind::File,
                native,
            });
        }

        let natives: Vec<NativeInfo> = info
            .iter_native_libraries()
            .map(|(_, n)| n.clone())
            .collect();
        for native in &natives {
            info.merge_native(native);
        }
        info.code_id = concat_checksums(code_checksums.into_values());

        if is_app {
            info.app = Some(AppInfo {
                manifest: manifest_raw.and_then(|raw| self.decode_manifest(&container, &raw)),
                api: self.introspect(&dexs),
            });
        }

        log::debug!(
            "{container}: {} entries, {} dependencies, {} runtime dependencies",
            info.entries.len(),
            info.dependencies.len(),
            info.dynamic_loading_dependencies.len()
        );
        Ok(info)
    }

    fn decode_manifest(&self, container: &str, raw: &[u8]) -> Option<AppManifest> {
        let decoder = self.manifest_decoder?;
        if helpers::is_binary_xml(raw) {
            log::debug!("{container}: binary manifest, not decoded");
            return None;
        }
        let manifest = decoder.decode(&String::from_utf8_lossy(raw));
        if manifest.is_none() {
            log::warn!("{container}: manifest could not be decoded");
        }
        manifest
    }

    fn introspect(&self, dexs: &[Vec<u8>]) -> Option<ApiSurface> {
        let introspector = self.bytecode_introspector?;
        let mut api: Option<ApiSurface> = None;
        for dex in dexs {
            if let Some(surface) = introspector.introspect(dex, self.include_internal_symbols) {
                api.get_or_insert_with(ApiSurface::default).merge(surface);
            }
        }
        api
    }
}

/// Walks the container at `path` with default options.
pub fn walk<P: AsRef<Path>>(path: P, is_app: bool) -> PackageResult<ArchiveInfo> {
    Options::default().walk(path, is_app)
}

/// Reads a single entry of the container at `path`.
pub fn read_entry<P: AsRef<Path>>(path: P, name: &str) -> PackageResult<Vec<u8>> {
    let file = File::open(path)?;
    let mut zip = ZipArchive::new(BufReader::new(file))?;
    let mut entry = zip.by_name(name)?;
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PackageError;
    use rw_native::fixtures::{ElfBuilder, EM_AARCH64};
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let entries: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|(name, content)| (*name, content.as_bytes()))
            .collect();
        write_zip_bytes(path, &entries);
    }

    fn write_zip_bytes(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, content) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, FileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, FileOptions::default()).unwrap();
                zip.write_all(content).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    const MANIFEST: &str = r#"<manifest package="com.example.app"><uses-permission android:name="android.permission.INTERNET"/></manifest>"#;

    struct CountingIntrospector;

    impl BytecodeIntrospector for CountingIntrospector {
        fn introspect(&self, module: &[u8], include_internal: bool) -> Option<ApiSurface> {
            let mut api = ApiSurface::default();
            api.classes.insert(format!("module of {} bytes", module.len()));
            if include_internal {
                api.methods.insert("internal".to_string());
            }
            Some(api)
        }
    }

    #[test]
    fn walk_application() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("App.apk");
        write_zip(
            &apk,
            &[
                ("AndroidManifest.xml", MANIFEST),
                ("classes.dex", "dex\n035\0"),
                ("lib/", ""),
                ("res/raw/data.bin", "0123456789"),
            ],
        );

        let decoder = TextManifestDecoder;
        let introspector = CountingIntrospector;
        let info = Options::default()
            .with_manifest_decoder(&decoder)
            .with_bytecode_introspector(&introspector)
            .walk(&apk, true)
            .unwrap();

        assert_eq!(info.entries.len(), 4);
        assert_eq!(info.entries[2].kind, EntryKind::Folder);
        assert_eq!(info.entries[3].size, 10);
        assert!(!info.entries[3].content_id.is_empty());

        let app = info.app.unwrap();
        let manifest = app.manifest.unwrap();
        assert_eq!(manifest.package_name, "com.example.app");
        assert_eq!(manifest.permissions, vec!["android.permission.INTERNET"]);
        let api = app.api.unwrap();
        assert!(api.classes.contains("module of 8 bytes"));
        assert!(api.methods.is_empty());
    }

    #[test]
    fn code_id_ignores_resources_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.jar");
        let second = dir.path().join("second.jar");
        write_zip(
            &first,
            &[("classes.dex", "code"), ("res/a.txt", "one"), ("classes2.dex", "more")],
        );
        write_zip(
            &second,
            &[("classes2.dex", "more"), ("res/a.txt", "two"), ("classes.dex", "code")],
        );
        let a = walk(&first, false).unwrap();
        let b = walk(&second, false).unwrap();
        assert!(!a.code_id.is_empty());
        assert_eq!(a.code_id, b.code_id);
        assert!(a.app.is_none());
    }

    #[test]
    fn invalid_native_library_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("Native.apk");
        write_zip(&apk, &[("lib/arm64-v8a/libbroken.so", "not an elf")]);
        let info = walk(&apk, true).unwrap();
        assert_eq!(info.entries.len(), 1);
        assert!(info.entries[0].native.is_none());
        assert_eq!(info.abi_bits, 0);
        assert!(info.dependencies.is_empty());
        assert!(!info.code_id.is_empty());
    }

    #[test]
    fn embedded_native_libraries_are_merged() {
        let main = ElfBuilder::new(EM_AARCH64)
            .needed("libc.so")
            .needed("liblog.so")
            .symbol("dlopen")
            .rodata(b"libplugin.so\0libnative.so\0")
            .build();
        let other = ElfBuilder::new(EM_AARCH64)
            .needed("libc.so")
            .needed("libm.so")
            .build();
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("Native.apk");
        write_zip_bytes(
            &apk,
            &[
                ("classes.dex", b"dex\n035\0".as_slice()),
                ("lib/arm64-v8a/libnative.so", main.as_slice()),
                ("lib/arm64-v8a/libother.so", other.as_slice()),
            ],
        );

        let info = walk(&apk, true).unwrap();
        assert_eq!(info.iter_native_libraries().count(), 2);
        assert_eq!(info.abi_bits, 64);
        assert_eq!(info.abi_architecture, "arm64");
        assert_eq!(info.dependencies, vec!["libc.so", "liblog.so", "libm.so"]);
        assert_eq!(info.dynamic_loading_dependencies, vec!["libplugin.so"]);

        let skipped = Options::default().dont_analyze_native().walk(&apk, true).unwrap();
        assert_eq!(skipped.abi_bits, 0);
        assert!(skipped.dependencies.is_empty());
        assert_eq!(skipped.code_id, info.code_id);
    }

    #[test]
    fn read_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("suite-tradefed.jar");
        write_zip(&jar, &[("test-suite-info.properties", "name=CTS\n")]);
        assert_eq!(read_entry(&jar, "test-suite-info.properties").unwrap(), b"name=CTS\n");
        assert!(matches!(
            read_entry(&jar, "missing"),
            Err(PackageError::Zip(_))
        ));
    }

    #[test]
    fn not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("Broken.apk");
        File::create(&apk).unwrap().write_all(b"garbage").unwrap();
        assert!(walk(&apk, true).is_err());
    }
}
