//! Dependency resolution.
//!
//! Raw dependency strings (library names, absolute device paths, driver name
//! patterns) are mapped to artifacts of the release the way the device
//! loader would find them, then followed transitively.

use crate::artifact::{Artifact, ArtifactKind};
use crate::errors::{ReleaseError, ReleaseResult};
use crate::release::ReleaseContent;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{EdgeRef, NodeRef};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};
use std::ops::Bound;

const WILDCARD: char = '*';
const EGL_FOLDER: &str = "egl";

/// Where partitions live in the release, and which library is only found in
/// the graphics driver folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub system: String,
    pub vendor: String,
    pub graphics_shim: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            system: "SYSTEM".to_string(),
            vendor: "VENDOR".to_string(),
            graphics_shim: "libGLES_android.so".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub path: String,
    pub kind: ArtifactKind,
    pub valid: bool,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.path.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub kind: EdgeKind,
    /// The dependency string, or the matched name for patterns.
    pub label: String,
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.label.fmt(f)
    }
}

/// Flat view of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Unresolved {
    pub source: String,
    pub dependency: String,
}

/// Transitive dependencies of a root artifact.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    root: String,
    inner: DiGraph<Node, Link>,
    nodes_map: BTreeMap<String, NodeIndex>,
    unresolved: Vec<Unresolved>,
}

/// Serializable form of a [`DependencyGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub root: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub unresolved: Vec<Unresolved>,
}

impl DependencyGraph {
    fn new(root: &Artifact) -> Self {
        let mut graph = Self {
            root: root.relative_path.clone(),
            inner: DiGraph::new(),
            nodes_map: BTreeMap::new(),
            unresolved: Vec::new(),
        };
        graph.add_node(root);
        graph
    }

    fn add_node(&mut self, artifact: &Artifact) -> NodeIndex {
        if let Some(id) = self.nodes_map.get(&artifact.relative_path) {
            return *id;
        }
        let id = self.inner.add_node(Node {
            path: artifact.relative_path.clone(),
            kind: artifact.kind,
            valid: artifact.valid,
        });
        self.nodes_map.insert(artifact.relative_path.clone(), id);
        id
    }

    /// Adds an edge unless one already links `source` to `target`. Returns
    /// whether it was added.
    fn add_edge(&mut self, source: &Artifact, target: &Artifact, link: Link) -> bool {
        let from = self.add_node(source);
        let to = self.add_node(target);
        if self.inner.find_edge(from, to).is_some() {
            return false;
        }
        self.inner.add_edge(from, to, link);
        true
    }

    fn add_unresolved(&mut self, source: &str, dependency: &str) {
        let unresolved = Unresolved {
            source: source.to_string(),
            dependency: dependency.to_string(),
        };
        if !self.unresolved.contains(&unresolved) {
            self.unresolved.push(unresolved);
        }
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    #[must_use]
    pub fn nb_nodes(&self) -> usize {
        self.inner.node_count()
    }

    #[must_use]
    pub fn nb_edges(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.inner.node_weights()
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.nodes_map.contains_key(path)
    }

    /// Edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        self.inner
            .edge_references()
            .map(|edge| Edge {
                source: self.inner[edge.source()].path.clone(),
                target: self.inner[edge.target()].path.clone(),
                kind: edge.weight().kind,
                label: edge.weight().label.clone(),
            })
            .collect()
    }

    /// Kind of the edge from `source` to `target`, if any.
    #[must_use]
    pub fn edge_kind(&self, source: &str, target: &str) -> Option<EdgeKind> {
        let from = self.nodes_map.get(source)?;
        let to = self.nodes_map.get(target)?;
        let edge = self.inner.find_edge(*from, *to)?;
        Some(self.inner[edge].kind)
    }

    #[must_use]
    pub fn unresolved(&self) -> &[Unresolved] {
        &self.unresolved
    }

    #[must_use]
    pub fn to_record(&self) -> GraphRecord {
        GraphRecord {
            root: self.root.clone(),
            nodes: self.iter_nodes().cloned().collect(),
            edges: self.edges(),
            unresolved: self.unresolved.clone(),
        }
    }

    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut res = String::new();
        res.push_str("digraph {\n");
        res.push_str("  rankdir=LR;\n");
        // writing into a String cannot fail
        let _ = write!(
            res,
            "{}",
            Dot::with_attr_getters(
                &self.inner,
                &[Config::GraphContentOnly],
                &|_, edge| match edge.weight().kind {
                    EdgeKind::Static => "color=black".to_string(),
                    EdgeKind::Dynamic => "color=blue,style=dashed".to_string(),
                },
                &|_, node| {
                    let n = node.weight();
                    let color = if !n.valid {
                        "red"
                    } else if n.path == self.root {
                        "green"
                    } else {
                        "black"
                    };
                    format!("color={color},shape=box")
                },
            )
        );
        res.push('}');
        res
    }
}

/// Resolves dependencies against the artifacts of a release.
#[derive(Debug, Clone)]
pub struct DependencyResolver<'r> {
    release: &'r ReleaseContent,
    config: ResolverConfig,
}

impl<'r> DependencyResolver<'r> {
    #[must_use]
    pub fn new(release: &'r ReleaseContent) -> Self {
        Self::with_config(release, ResolverConfig::default())
    }

    #[must_use]
    pub fn with_config(release: &'r ReleaseContent, config: ResolverConfig) -> Self {
        Self { release, config }
    }

    /// Transitive dependency graph of the artifact at `root`.
    pub fn resolve(&self, root: &str) -> ReleaseResult<DependencyGraph> {
        let root = self
            .release
            .get(root)
            .ok_or_else(|| ReleaseError::ArtifactNotFound(root.to_string()))?;
        let mut graph = DependencyGraph::new(root);
        let mut visited = BTreeSet::new();
        visited.insert(root.relative_path.as_str());
        let mut stack = vec![root];

        while let Some(source) = stack.pop() {
            let nb_static = source.dependencies.len();
            let mut targets = Vec::new();
            for (i, dep) in source.iter_dependencies().enumerate() {
                let kind = if i < nb_static {
                    EdgeKind::Static
                } else {
                    EdgeKind::Dynamic
                };
                let Some((target, label)) = self.resolve_dependency(source, dep) else {
                    log::error!("{}: unresolved dependency {dep}", source.relative_path);
                    graph.add_unresolved(&source.relative_path, dep);
                    continue;
                };
                if target.relative_path == source.relative_path {
                    continue;
                }
                log::trace!("{} -> {} ({kind:?})", source.relative_path, target.relative_path);
                graph.add_edge(source, target, Link { kind, label });
                if visited.insert(target.relative_path.as_str()) {
                    targets.push(target);
                }
            }
            // first dependency explored first
            stack.extend(targets.into_iter().rev());
        }

        log::debug!(
            "{}: {} nodes, {} edges, {} unresolved",
            graph.root,
            graph.nb_nodes(),
            graph.nb_edges(),
            graph.unresolved.len()
        );
        Ok(graph)
    }

    /// Resolves several roots in parallel.
    #[must_use]
    pub fn resolve_all(&self, roots: &[&str]) -> Vec<ReleaseResult<DependencyGraph>> {
        roots.par_iter().map(|root| self.resolve(root)).collect()
    }

    /// Maps one raw dependency of `source` to an artifact, and the label of
    /// the edge leading to it.
    fn resolve_dependency(&self, source: &Artifact, dep: &str) -> Option<(&'r Artifact, String)> {
        let lib_dirs = lib_dirs(source.abi_bits);
        if dep.contains(WILDCARD) {
            return self
                .resolve_driver(dep, lib_dirs)
                .map(|target| (self.follow_link(target), target.name.clone()));
        }
        let target = match self.partition_path(dep) {
            Some(path) => self.release.get(&path),
            None => self.resolve_library(dep, lib_dirs),
        }?;
        Some((self.follow_link(target), dep.to_string()))
    }

    /// Driver patterns match the first vendor driver named after the
    /// pattern prefix.
    fn resolve_driver(&self, pattern: &str, lib_dirs: &[&str]) -> Option<&'r Artifact> {
        let (prefix, suffix) = pattern.split_once(WILDCARD)?;
        lib_dirs.iter().find_map(|dir| {
            let key = format!("{}/{dir}/{EGL_FOLDER}/{prefix}", self.config.vendor);
            let (path, artifact) = self
                .release
                .entries
                .range::<str, _>((Bound::Excluded(key.as_str()), Bound::Unbounded))
                .next()?;
            (path.starts_with(&key) && path.ends_with(suffix)).then_some(artifact)
        })
    }

    /// Maps absolute device paths to partition folders of the release.
    fn partition_path(&self, dep: &str) -> Option<String> {
        if let Some(rest) = dep.strip_prefix("/system/") {
            Some(format!("{}/{rest}", self.config.system))
        } else {
            dep.strip_prefix("/vendor/")
                .map(|rest| format!("{}/{rest}", self.config.vendor))
        }
    }

    fn resolve_library(&self, dep: &str, lib_dirs: &[&str]) -> Option<&'r Artifact> {
        let candidates = [&self.config.system, &self.config.vendor]
            .into_iter()
            .flat_map(|partition| lib_dirs.iter().map(move |dir| format!("{partition}/{dir}/{dep}")));
        for path in candidates {
            if let Some(artifact) = self.release.get(&path) {
                return Some(artifact);
            }
        }
        if dep.ends_with(&self.config.graphics_shim) {
            return lib_dirs.iter().find_map(|dir| {
                self.release
                    .get(&format!("{}/{dir}/{EGL_FOLDER}/{dep}", self.config.system))
            });
        }
        None
    }

    /// Links are looked up in the graphics driver folder next to them.
    fn follow_link(&self, artifact: &'r Artifact) -> &'r Artifact {
        if artifact.kind != ArtifactKind::SymbolicLink {
            return artifact;
        }
        let path = format!("{}/{EGL_FOLDER}/{}", artifact.parent_folder, artifact.name);
        match self.release.get(&path) {
            Some(target) => target,
            None => {
                log::warn!("{}: unresolved symbolic link", artifact.relative_path);
                artifact
            }
        }
    }
}

fn lib_dirs(bits: u8) -> &'static [&'static str] {
    match bits {
        64 => &["lib64"],
        32 => &["lib"],
        _ => &["lib64", "lib"],
    }
}
