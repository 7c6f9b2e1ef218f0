//! Release artifacts: one record per file or folder of a release tree.

use crate::initrc::InitScript;
use rw_images::{ArtInfo, OatInfo, VdexInfo};
use rw_package::ArchiveInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What an artifact is, as decided by the format sniffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactKind {
    File,
    Folder,
    SymbolicLink,
    Apk,
    Jar,
    Art,
    Oat,
    Odex,
    Vdex,
    So,
    Exe,
    Xml,
    Rc,
    BuildProp,
    Img,
    TestModuleConfig,
    TestSuiteManifest,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::File => "FILE",
            Self::Folder => "FOLDER",
            Self::SymbolicLink => "SYMBOLIC_LINK",
            Self::Apk => "APK",
            Self::Jar => "JAR",
            Self::Art => "ART",
            Self::Oat => "OAT",
            Self::Odex => "ODEX",
            Self::Vdex => "VDEX",
            Self::So => "SO",
            Self::Exe => "EXE",
            Self::Xml => "XML",
            Self::Rc => "RC",
            Self::BuildProp => "BUILD_PROP",
            Self::Img => "IMG",
            Self::TestModuleConfig => "TEST_MODULE_CONFIG",
            Self::TestSuiteManifest => "TEST_SUITE_MANIFEST",
        };
        f.write_str(s)
    }
}

impl ArtifactKind {
    #[must_use]
    pub fn is_native(self) -> bool {
        matches!(self, Self::So | Self::Exe)
    }

    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, Self::Apk | Self::Jar)
    }
}

/// Format specific data attached to an artifact, its variant always matches
/// the artifact kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Art(ArtInfo),
    Oat(OatInfo),
    Vdex(VdexInfo),
    Archive(ArchiveInfo),
    InitScript(InitScript),
    Properties(BTreeMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub relative_path: String,
    pub kind: ArtifactKind,
    pub size: u64,
    pub content_id: String,
    pub code_id: String,
    pub abi_bits: u8,
    pub abi_architecture: String,
    pub parent_folder: String,
    pub dependencies: Vec<String>,
    pub dynamic_loading_dependencies: Vec<String>,
    pub valid: bool,
    pub payload: Option<Payload>,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}] {} bytes", self.relative_path, self.kind, self.size)?;
        if self.abi_bits != 0 {
            write!(f, ", {}-bit {}", self.abi_bits, self.abi_architecture)?;
        }
        if !self.code_id.is_empty() {
            write!(f, ", code {}", self.code_id)?;
        }
        if !self.valid {
            write!(f, " (invalid)")?;
        }
        Ok(())
    }
}

impl Artifact {
    /// A bare artifact: no identity, no dependency, no payload.
    #[must_use]
    pub fn new(name: &str, relative_path: &str, parent_folder: &str, kind: ArtifactKind) -> Self {
        Self {
            name: name.to_string(),
            relative_path: relative_path.to_string(),
            kind,
            size: 0,
            content_id: String::new(),
            code_id: String::new(),
            abi_bits: 0,
            abi_architecture: String::new(),
            parent_folder: parent_folder.to_string(),
            dependencies: Vec::new(),
            dynamic_loading_dependencies: Vec::new(),
            valid: true,
            payload: None,
        }
    }

    #[must_use]
    pub fn is_symbolic_link(&self) -> bool {
        self.kind == ArtifactKind::SymbolicLink
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == ArtifactKind::Folder
    }

    /// Static dependencies followed by dynamic loading ones.
    pub fn iter_dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .chain(&self.dynamic_loading_dependencies)
            .map(String::as_str)
    }

    /// Whether both artifacts carry the same non-empty code identity.
    #[must_use]
    pub fn same_code(&self, other: &Self) -> bool {
        !self.code_id.is_empty() && self.code_id == other.code_id
    }
}
