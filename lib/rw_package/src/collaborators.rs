//! Interfaces to the decoders that run on application contents: the manifest
//! decoder and the bytecode introspector.
//!
//! The walker only extracts the bytes these decoders need and stores what
//! they return.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What an application declares in its manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppManifest {
    pub package_name: String,
    pub permissions: Vec<String>,
    pub activities: Vec<String>,
    pub services: Vec<String>,
    pub providers: Vec<String>,
    pub features: Vec<String>,
    pub libraries: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

/// Classes, fields and methods of a bytecode module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSurface {
    pub classes: BTreeSet<String>,
    pub fields: BTreeSet<String>,
    pub methods: BTreeSet<String>,
}

impl ApiSurface {
    pub fn merge(&mut self, other: Self) {
        self.classes.extend(other.classes);
        self.fields.extend(other.fields);
        self.methods.extend(other.methods);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.fields.is_empty() && self.methods.is_empty()
    }
}

/// Decodes a textual manifest.
pub trait ManifestDecoder {
    fn decode(&self, text: &str) -> Option<AppManifest>;
}

/// Extracts the API surface of a bytecode module. With `include_internal`
/// unset, only symbols referenced but not defined by the module are returned.
pub trait BytecodeIntrospector {
    fn introspect(&self, module: &[u8], include_internal: bool) -> Option<ApiSurface>;
}

/// Manifest decoder for plain-text XML manifests, as found in unpacked
/// sources or test bundles.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextManifestDecoder;

lazy_static! {
    static ref MANIFEST_TAG: Regex =
        Regex::new(r"<manifest\s[^>]*>").expect("failed to compile manifest tag regex");
    static ref PACKAGE_ATTR: Regex =
        Regex::new(r#"\spackage\s*=\s*"([^"]+)""#).expect("failed to compile package regex");
    static ref VERSION_ATTR: Regex = Regex::new(r#"android:(versionCode|versionName)\s*=\s*"([^"]*)""#)
        .expect("failed to compile version regex");
    static ref PROPERTY_TAG: Regex = Regex::new(r"<(?:property|meta-data)\s[^>]*>")
        .expect("failed to compile property regex");
    static ref NAME_ATTR: Regex =
        Regex::new(r#"android:name\s*=\s*"([^"]+)""#).expect("failed to compile name regex");
    static ref VALUE_ATTR: Regex =
        Regex::new(r#"android:value\s*=\s*"([^"]*)""#).expect("failed to compile value regex");
}

fn tag_names(text: &str, tag: &str) -> Vec<String> {
    // \s after the tag name keeps <activity> apart from <activity-alias>
    let re = match Regex::new(&format!(r"<{tag}\s[^>]*>")) {
        Ok(re) => re,
        Err(e) => {
            log::error!("bad tag pattern {tag:?}: {e}");
            return Vec::new();
        }
    };
    re.find_iter(text)
        .filter_map(|m| NAME_ATTR.captures(m.as_str()))
        .map(|caps| caps[1].to_string())
        .collect()
}

impl ManifestDecoder for TextManifestDecoder {
    fn decode(&self, text: &str) -> Option<AppManifest> {
        let manifest_tag = MANIFEST_TAG.find(text)?.as_str();
        let package_name = PACKAGE_ATTR.captures(manifest_tag)?[1].to_string();

        let mut properties = BTreeMap::new();
        for caps in VERSION_ATTR.captures_iter(manifest_tag) {
            properties.insert(caps[1].to_string(), caps[2].to_string());
        }
        for m in PROPERTY_TAG.find_iter(text) {
            if let (Some(name), Some(value)) = (NAME_ATTR.captures(m.as_str()), VALUE_ATTR.captures(m.as_str())) {
                properties.insert(name[1].to_string(), value[1].to_string());
            }
        }

        Some(AppManifest {
            package_name,
            permissions: tag_names(text, "uses-permission"),
            activities: tag_names(text, "activity"),
            services: tag_names(text, "service"),
            providers: tag_names(text, "provider"),
            features: tag_names(text, "uses-feature"),
            libraries: tag_names(text, "uses-library"),
            properties,
        })
    }
}
