//! Release tree building.
//!
//! Files are decoded in parallel, then folders are aggregated bottom-up in a
//! single sequential pass: the walk yields every folder after its contents,
//! so a folder's children are all known when it is reached.

use crate::artifact::{Artifact, ArtifactKind, Payload};
use crate::decode::{self, FileEntry};
use crate::errors::{ReleaseError, ReleaseResult};
use crate::release::{ReleaseContent, ReleaseInfo};
use rayon::prelude::*;
use rw_package::{BytecodeIntrospector, ManifestDecoder};
use rw_utils::digest::folder_digest;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use walkdir::WalkDir;

/// Sentinel of the root folder's parent.
const ROOT_PARENT: &str = "/";

/// Options to select how a release tree is built.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions<'a> {
    parallel: bool,
    package: rw_package::Options<'a>,
}

/// Default values decode files in parallel, with default container options.
impl<'a> Default for BuildOptions<'a> {
    fn default() -> Self {
        Self {
            parallel: true,
            package: rw_package::Options::default(),
        }
    }
}

impl<'a> BuildOptions<'a> {
    #[must_use]
    pub fn sequential(self) -> Self {
        Self {
            parallel: false,
            ..self
        }
    }

    /// Skips native libraries embedded in containers.
    #[must_use]
    pub fn dont_analyze_native(self) -> Self {
        Self {
            package: self.package.dont_analyze_native(),
            ..self
        }
    }

    #[must_use]
    pub fn include_internal_symbols(self) -> Self {
        Self {
            package: self.package.include_internal_symbols(),
            ..self
        }
    }

    #[must_use]
    pub fn with_manifest_decoder(self, decoder: &'a (dyn ManifestDecoder + Sync)) -> Self {
        Self {
            package: self.package.with_manifest_decoder(decoder),
            ..self
        }
    }

    #[must_use]
    pub fn with_bytecode_introspector(
        self,
        introspector: &'a (dyn BytecodeIntrospector + Sync),
    ) -> Self {
        Self {
            package: self.package.with_bytecode_introspector(introspector),
            ..self
        }
    }

    /// Builds the content of the release rooted at `root`.
    pub fn build<P: AsRef<Path>>(&self, root: P) -> ReleaseResult<ReleaseContent> {
        let root = root.as_ref();
        let root_str = root.display().to_string();
        if !root.is_dir() {
            return Err(ReleaseError::RootNotFound(root_str));
        }

        let nodes = list(root);
        let files: Vec<&FileEntry> = nodes
            .iter()
            .filter_map(|node| match node {
                Node::File(entry) => Some(entry),
                Node::Folder { .. } => None,
            })
            .collect();
        log::info!("{root_str}: decoding {} files", files.len());

        let decode_one = |entry: &FileEntry| match decode::decode(entry, &self.package) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                log::error!("{}: skipped: {e}", entry.relative_path);
                None
            }
        };
        let decoded: Vec<Option<Artifact>> = if self.parallel {
            files.par_iter().map(|entry| decode_one(entry)).collect()
        } else {
            files.iter().map(|entry| decode_one(entry)).collect()
        };

        let mut decoded = decoded.into_iter();
        let mut info: Option<ReleaseInfo> = None;
        let mut folders: HashMap<String, FolderContent> = HashMap::new();
        let mut entries = BTreeMap::new();
        for node in nodes {
            let artifact = match node {
                Node::File(_) => match decoded.next().flatten() {
                    Some(artifact) => artifact,
                    None => continue,
                },
                Node::Folder {
                    name,
                    relative_path,
                    parent_folder,
                } => {
                    let content = folders.remove(&relative_path).unwrap_or_default();
                    content.into_folder(&name, &relative_path, &parent_folder)
                }
            };

            if let Some(sentinel) = sentinel(&artifact) {
                if info.is_some() {
                    log::warn!("{}: overrides previous release sentinel", artifact.relative_path);
                }
                info = Some(sentinel);
            }

            folders
                .entry(artifact.parent_folder.clone())
                .or_default()
                .add(&artifact);
            entries.insert(artifact.relative_path.clone(), artifact);
        }

        let mut info = info.unwrap_or_else(|| {
            log::warn!("{root_str}: no release sentinel, named after its root");
            ReleaseInfo::unknown(&root_str)
        });
        if info.name.is_empty() {
            log::warn!("{root_str}: release sentinel without name");
            info.name = root_str.clone();
        }

        let root_name = root
            .file_name()
            .map_or_else(|| root_str.clone(), |name| name.to_string_lossy().into_owned());
        let root_key = root_key(&info.identity(), &entries);
        let root_artifact = folders
            .remove(ROOT_PARENT)
            .unwrap_or_default()
            .into_folder(&root_name, &root_key, "");

        let release = ReleaseContent::new(info, root_artifact, entries);
        log::info!(
            "{}: {}, {} artifacts, {} invalid",
            release.identity(),
            release.release_kind,
            release.entries.len(),
            release.nb_invalid()
        );
        Ok(release)
    }
}

/// Builds the content of the release rooted at `root` with default options.
pub fn build<P: AsRef<Path>>(root: P) -> ReleaseResult<ReleaseContent> {
    BuildOptions::default().build(root)
}

/// The identity, suffixed while it names an artifact of the release.
fn root_key(identity: &str, entries: &BTreeMap<String, Artifact>) -> String {
    if !entries.contains_key(identity) {
        return identity.to_string();
    }
    log::warn!("{identity}: release identity is also an artifact path, root key suffixed");
    (1..)
        .map(|n| format!("{identity}#root{n}"))
        .find(|key| !entries.contains_key(key))
        .unwrap_or_default()
}

enum Node {
    File(FileEntry),
    Folder {
        name: String,
        relative_path: String,
        parent_folder: String,
    },
}

/// Direct children of a folder, as far as its identity is concerned.
#[derive(Debug, Default)]
struct FolderContent {
    size: u64,
    children: BTreeMap<String, String>,
}

impl FolderContent {
    fn add(&mut self, artifact: &Artifact) {
        self.size += artifact.size;
        self.children
            .insert(artifact.name.clone(), artifact.content_id.clone());
    }

    fn into_folder(self, name: &str, relative_path: &str, parent_folder: &str) -> Artifact {
        let mut folder = Artifact::new(name, relative_path, parent_folder, ArtifactKind::Folder);
        folder.size = self.size;
        folder.content_id = folder_digest(&self.children);
        folder
    }
}

fn sentinel(artifact: &Artifact) -> Option<ReleaseInfo> {
    match (artifact.kind, &artifact.payload) {
        (ArtifactKind::TestSuiteManifest, Some(Payload::Properties(props))) => {
            Some(ReleaseInfo::from_test_suite(props))
        }
        (ArtifactKind::BuildProp, Some(Payload::Properties(props))) => {
            Some(ReleaseInfo::from_build_prop(props))
        }
        _ => None,
    }
}

/// Lists the release tree in file name order, every folder after its
/// contents. Links are not followed. Unreadable entries are logged and left
/// out.
fn list(root: &Path) -> Vec<Node> {
    let mut nodes = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .contents_first(true)
        .sort_by_file_name()
        .min_depth(1);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::error!("{}: {e}", root.display());
                continue;
            }
        };
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let parent_folder = relative_path
            .rsplit_once('/')
            .map_or(ROOT_PARENT, |(parent, _)| parent)
            .to_string();
        let name = entry.file_name().to_string_lossy().into_owned();

        let file_type = entry.file_type();
        if file_type.is_dir() {
            nodes.push(Node::Folder {
                name,
                relative_path,
                parent_folder,
            });
            continue;
        }
        let is_symlink = file_type.is_symlink();
        let size = if is_symlink {
            0
        } else {
            match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    log::error!("{relative_path}: skipped: {e}");
                    continue;
                }
            }
        };
        nodes.push(Node::File(FileEntry {
            path: entry.into_path(),
            name,
            relative_path,
            parent_folder,
            size,
            is_symlink,
        }));
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseKind;
    use std::fs;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn write(root: &Path, relative_path: &str, content: &[u8]) {
        let path = root.join(relative_path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn art_header(oat_checksum: u32) -> Vec<u8> {
        let mut buf = b"art\n074\0".to_vec();
        for i in 1..=18u32 {
            let v = if i == 3 { oat_checksum } else { i };
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf.resize(512, 0);
        buf
    }

    fn device_tree(root: &Path) {
        write(
            root,
            "SYSTEM/build.prop",
            b"ro.product.device=sargo\nro.build.version.release=11\nro.build.version.incremental=42\n",
        );
        write(root, "SYSTEM/framework/arm64/boot.art", &art_header(0xcafe));
        write(root, "SYSTEM/framework/arm64/broken.art", b"art\n074\0");
        write(root, "SYSTEM/lib64/libGLES_android.so", b"");
        write(root, "SYSTEM/etc/hosts", b"127.0.0.1 localhost\n");
        write(root, "VENDOR/etc/readme.txt", b"vendor");
    }

    #[test]
    fn device_build() {
        let dir = tempfile::tempdir().unwrap();
        device_tree(dir.path());
        let release = build(dir.path()).unwrap();

        assert_eq!(release.release_kind, ReleaseKind::DeviceBuild);
        assert_eq!(release.identity(), "sargo1142");
        let root = release.root().unwrap();
        assert_eq!(root.kind, ArtifactKind::Folder);
        assert_eq!(root.relative_path, "sargo1142");
        assert_eq!(release.size, root.size);
        assert_eq!(release.content_id, root.content_id);

        let system = release.get("SYSTEM").unwrap();
        assert_eq!(system.parent_folder, "/");
        assert_eq!(system.kind, ArtifactKind::Folder);
        assert_eq!(release.get("SYSTEM/etc").unwrap().parent_folder, "SYSTEM");

        let art = release.get("SYSTEM/framework/arm64/boot.art").unwrap();
        assert!(art.valid);
        assert_eq!(art.code_id, "cafe");
        let broken = release.get("SYSTEM/framework/arm64/broken.art").unwrap();
        assert!(!broken.valid);

        let link = release.get("SYSTEM/lib64/libGLES_android.so").unwrap();
        assert_eq!(link.kind, ArtifactKind::SymbolicLink);
        assert_eq!(link.dependencies, vec!["libGLES_android.so"]);

        let files_size: u64 = release
            .entries
            .values()
            .filter(|a| !a.is_folder())
            .map(|a| a.size)
            .sum();
        assert_eq!(root.size, files_size);
    }

    #[test]
    fn building_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        device_tree(dir.path());
        let first = build(dir.path()).unwrap();
        let second = BuildOptions::default().sequential().build(dir.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn folder_identity_ignores_creation_order() {
        let a = tempfile::tempdir().unwrap();
        for name in ["c", "a", "b"] {
            write(a.path(), &format!("data/{name}"), name.as_bytes());
        }
        let b = tempfile::tempdir().unwrap();
        for name in ["a", "b", "c"] {
            write(b.path(), &format!("data/{name}"), name.as_bytes());
        }
        let ra = build(a.path()).unwrap();
        let rb = build(b.path()).unwrap();
        assert_eq!(ra.get("data").unwrap().content_id, rb.get("data").unwrap().content_id);
        // no sentinel: names differ, content does not
        assert_ne!(ra.identity(), rb.identity());
        assert_eq!(ra.content_id, rb.content_id);
    }

    #[test]
    fn folder_identity_changes_with_content() {
        let a = tempfile::tempdir().unwrap();
        write(a.path(), "data/a", b"one");
        let b = tempfile::tempdir().unwrap();
        write(b.path(), "data/a", b"two");
        let ra = build(a.path()).unwrap();
        let rb = build(b.path()).unwrap();
        assert_ne!(ra.get("data").unwrap().content_id, rb.get("data").unwrap().content_id);
    }

    #[test]
    fn application_package_by_default() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "README", b"hello");
        let release = build(dir.path()).unwrap();
        assert_eq!(release.release_kind, ReleaseKind::AppDistributionPackage);
        assert_eq!(release.name, dir.path().display().to_string());
        assert_eq!(release.full_name, release.name);
        assert_eq!(release.entries.len(), 2);
    }

    #[test]
    fn test_suite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("android-cts/tools/cts-tradefed.jar");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut zip = ZipWriter::new(fs::File::create(&path).unwrap());
        zip.start_file(decode::TEST_SUITE_INFO, FileOptions::default())
            .unwrap();
        zip.write_all(b"name=CTS\nversion=11_r3\nbuild_number=68\nfullname=Compatibility Test Suite\ntarget_arch=arm64\n")
            .unwrap();
        zip.finish().unwrap();

        let release = build(dir.path()).unwrap();
        assert_eq!(release.release_kind, ReleaseKind::TestSuite);
        assert_eq!(release.identity(), "CTS11_r368");
        assert_eq!(release.target_arch, "arm64");
        assert!(release.root().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn links_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lib64/egl/libGLES_android.so", b"\x7fELF");
        std::os::unix::fs::symlink(
            "egl/libGLES_android.so",
            dir.path().join("lib64/libGLES_android.so"),
        )
        .unwrap();
        let release = build(dir.path()).unwrap();
        let link = release.get("lib64/libGLES_android.so").unwrap();
        assert_eq!(link.kind, ArtifactKind::SymbolicLink);
        assert_eq!(link.size, 0);
        assert!(link.content_id.is_empty());
    }

    #[test]
    fn identity_clashing_with_a_folder() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "SYSTEM/build.prop", b"ro.product.name=SYSTEM\n");
        write(dir.path(), "SYSTEM/etc/hosts", b"127.0.0.1 localhost\n");
        let release = build(dir.path()).unwrap();

        assert_eq!(release.identity(), "SYSTEM");
        let system = release.get("SYSTEM").unwrap();
        assert_eq!(system.kind, ArtifactKind::Folder);
        assert_eq!(system.parent_folder, "/");

        let root = release.root().unwrap();
        assert_eq!(root.relative_path, "SYSTEM#root1");
        assert_eq!(root.parent_folder, "");
        assert_eq!(release.root_key, root.relative_path);
        assert!(release.iter_artifacts().any(|a| a.relative_path == "SYSTEM"));
        assert!(release.iter_artifacts().all(|a| a.relative_path != release.root_key));
    }

    #[test]
    fn missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let res = build(dir.path().join("nope"));
        assert!(matches!(res, Err(ReleaseError::RootNotFound(_))));
    }
}
