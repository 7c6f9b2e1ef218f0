//! Release level model: metadata taken from sentinel files, and the flat map
//! of every artifact.

use crate::artifact::Artifact;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseKind {
    DeviceBuild,
    TestSuite,
    #[default]
    AppDistributionPackage,
}

impl fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DeviceBuild => write!(f, "device build"),
            Self::TestSuite => write!(f, "test suite"),
            Self::AppDistributionPackage => write!(f, "application distribution package"),
        }
    }
}

/// Release metadata, as read from a sentinel file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub kind: ReleaseKind,
    pub name: String,
    pub version: String,
    pub build_number: String,
    pub full_name: String,
    pub target_arch: String,
}

fn property(props: &BTreeMap<String, String>, key: &str) -> String {
    props.get(key).cloned().unwrap_or_default()
}

impl ReleaseInfo {
    /// Metadata of a test suite, from its `test-suite-info.properties`.
    #[must_use]
    pub fn from_test_suite(props: &BTreeMap<String, String>) -> Self {
        Self {
            kind: ReleaseKind::TestSuite,
            name: property(props, "name"),
            version: property(props, "version"),
            build_number: property(props, "build_number"),
            full_name: property(props, "fullname"),
            target_arch: property(props, "target_arch"),
        }
    }

    /// Metadata of a device build, from its `build.prop`.
    #[must_use]
    pub fn from_build_prop(props: &BTreeMap<String, String>) -> Self {
        let name = props
            .get("ro.product.device")
            .or_else(|| props.get("ro.product.name"))
            .cloned()
            .unwrap_or_default();
        Self {
            kind: ReleaseKind::DeviceBuild,
            name,
            version: property(props, "ro.build.version.release"),
            build_number: property(props, "ro.build.version.incremental"),
            full_name: property(props, "ro.build.fingerprint"),
            target_arch: property(props, "ro.product.cpu.abi"),
        }
    }

    /// Metadata of a release without sentinel, named after its root.
    #[must_use]
    pub fn unknown(root: &str) -> Self {
        Self {
            name: root.to_string(),
            full_name: root.to_string(),
            ..Self::default()
        }
    }

    /// `name + version + build_number`.
    #[must_use]
    pub fn identity(&self) -> String {
        format!("{}{}{}", self.name, self.version, self.build_number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseContent {
    pub name: String,
    pub version: String,
    pub build_number: String,
    pub full_name: String,
    pub target_arch: String,
    pub release_kind: ReleaseKind,
    pub size: u64,
    pub content_id: String,
    /// Key of the root folder in `entries`, the identity unless a file of
    /// the release already has that path.
    pub root_key: String,
    pub entries: BTreeMap<String, Artifact>,
}

impl fmt::Display for ReleaseContent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} ({})", self.full_name, self.release_kind)?;
        writeln!(f, " - identity: {}", self.identity())?;
        if !self.target_arch.is_empty() {
            writeln!(f, " - target: {}", self.target_arch)?;
        }
        writeln!(f, " - artifacts: {}", self.entries.len())?;
        writeln!(f, " - size: {} bytes", self.size)?;
        write!(f, " - content id: {}", self.content_id)
    }
}

impl ReleaseContent {
    pub(crate) fn new(info: ReleaseInfo, root: Artifact, mut entries: BTreeMap<String, Artifact>) -> Self {
        let size = root.size;
        let content_id = root.content_id.clone();
        let root_key = root.relative_path.clone();
        entries.insert(root_key.clone(), root);
        Self {
            name: info.name,
            version: info.version,
            build_number: info.build_number,
            full_name: info.full_name,
            target_arch: info.target_arch,
            release_kind: info.kind,
            size,
            content_id,
            root_key,
            entries,
        }
    }

    /// `name + version + build_number`.
    #[must_use]
    pub fn identity(&self) -> String {
        format!("{}{}{}", self.name, self.version, self.build_number)
    }

    #[must_use]
    pub fn get(&self, relative_path: &str) -> Option<&Artifact> {
        self.entries.get(relative_path)
    }

    #[must_use]
    pub fn root(&self) -> Option<&Artifact> {
        self.entries.get(&self.root_key)
    }

    /// Artifacts in path order, root folder excluded.
    pub fn iter_artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.entries
            .iter()
            .filter(move |(path, _)| **path != self.root_key)
            .map(|(_, artifact)| artifact)
    }

    #[must_use]
    pub fn nb_invalid(&self) -> usize {
        self.entries.values().filter(|artifact| !artifact.valid).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn device_build_metadata() {
        let info = ReleaseInfo::from_build_prop(&props(&[
            ("ro.product.name", "sargo_eea"),
            ("ro.build.version.release", "11"),
            ("ro.build.version.incremental", "7011969"),
            ("ro.build.fingerprint", "google/sargo/sargo:11/RQ3A/7011969:user/release-keys"),
            ("ro.product.cpu.abi", "arm64-v8a"),
        ]));
        assert_eq!(info.kind, ReleaseKind::DeviceBuild);
        assert_eq!(info.name, "sargo_eea");
        assert_eq!(info.identity(), "sargo_eea117011969");
        assert_eq!(info.target_arch, "arm64-v8a");

        let info = ReleaseInfo::from_build_prop(&props(&[
            ("ro.product.device", "sargo"),
            ("ro.product.name", "sargo_eea"),
        ]));
        assert_eq!(info.name, "sargo");
    }

    #[test]
    fn test_suite_metadata() {
        let info = ReleaseInfo::from_test_suite(&props(&[
            ("name", "CTS"),
            ("version", "11_r3"),
            ("build_number", "6853682"),
            ("fullname", "Compatibility Test Suite"),
            ("target_arch", "arm64"),
        ]));
        assert_eq!(info.kind, ReleaseKind::TestSuite);
        assert_eq!(info.identity(), "CTS11_r36853682");
        assert_eq!(info.full_name, "Compatibility Test Suite");
    }

    #[test]
    fn default_kind() {
        let info = ReleaseInfo::unknown("/tmp/apps");
        assert_eq!(info.kind, ReleaseKind::AppDistributionPackage);
        assert_eq!(info.identity(), "/tmp/apps");
    }
}
