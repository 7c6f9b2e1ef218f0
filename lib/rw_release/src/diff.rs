//! Comparison of two releases, artifact by artifact.

use crate::artifact::ArtifactKind;
use crate::release::ReleaseContent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedArtifact {
    pub path: String,
    pub kind: ArtifactKind,
    pub old_content_id: String,
    pub new_content_id: String,
    /// Bytes differ but the format-derived identity is the same.
    pub same_code: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<ChangedArtifact>,
}

impl ReleaseDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Compares `old` and `new` by relative path. Root folders never match each
/// other's key and are left out. Folders are only reported when added or
/// removed, their identity changes with any of their files.
#[must_use]
pub fn diff(old: &ReleaseContent, new: &ReleaseContent) -> ReleaseDiff {
    let mut res = ReleaseDiff::default();

    for artifact in old.iter_artifacts() {
        match new.get(&artifact.relative_path) {
            None => res.removed.push(artifact.relative_path.clone()),
            Some(other) if other.is_folder() || artifact.is_folder() => (),
            Some(other) if other.content_id != artifact.content_id => {
                res.changed.push(ChangedArtifact {
                    path: artifact.relative_path.clone(),
                    kind: other.kind,
                    old_content_id: artifact.content_id.clone(),
                    new_content_id: other.content_id.clone(),
                    same_code: artifact.same_code(other),
                });
            }
            Some(_) => (),
        }
    }
    res.added = new
        .iter_artifacts()
        .filter(|artifact| old.get(&artifact.relative_path).is_none())
        .map(|artifact| artifact.relative_path.clone())
        .collect();

    log::info!(
        "{} -> {}: {} added, {} removed, {} changed",
        old.identity(),
        new.identity(),
        res.added.len(),
        res.removed.len(),
        res.changed.len()
    );
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;
    use crate::release::ReleaseKind;

    fn file(path: &str, content_id: &str, code_id: &str) -> Artifact {
        let mut a = Artifact::new(path, path, "/", ArtifactKind::File);
        a.content_id = content_id.to_string();
        a.code_id = code_id.to_string();
        a
    }

    fn release(build: &str, artifacts: Vec<Artifact>) -> ReleaseContent {
        let mut root = Artifact::new("root", &format!("dev11{build}"), "", ArtifactKind::Folder);
        root.content_id = build.to_string();
        let mut entries: std::collections::BTreeMap<String, Artifact> = artifacts
            .into_iter()
            .map(|a| (a.relative_path.clone(), a))
            .collect();
        entries.insert(root.relative_path.clone(), root);
        ReleaseContent {
            name: "dev".to_string(),
            version: "11".to_string(),
            build_number: build.to_string(),
            full_name: "dev".to_string(),
            target_arch: String::new(),
            release_kind: ReleaseKind::DeviceBuild,
            size: 0,
            content_id: build.to_string(),
            root_key: format!("dev11{build}"),
            entries,
        }
    }

    #[test]
    fn added_removed_changed() {
        let old = release(
            "1",
            vec![
                file("a", "A", ""),
                file("b", "B", "c1"),
                file("c", "C", "c2"),
                file("gone", "G", ""),
            ],
        );
        let new = release(
            "2",
            vec![
                file("a", "A", ""),
                file("b", "B2", "c1"),
                file("c", "C2", "c3"),
                file("new", "N", ""),
            ],
        );
        let d = diff(&old, &new);
        assert_eq!(d.added, vec!["new"]);
        assert_eq!(d.removed, vec!["gone"]);
        assert_eq!(d.changed.len(), 2);
        assert_eq!(d.changed[0].path, "b");
        assert!(d.changed[0].same_code);
        assert_eq!(d.changed[1].path, "c");
        assert!(!d.changed[1].same_code);
    }

    #[test]
    fn identical_releases() {
        let old = release("1", vec![file("a", "A", "")]);
        let new = release("1", vec![file("a", "A", "")]);
        assert!(diff(&old, &new).is_empty());
    }
}
