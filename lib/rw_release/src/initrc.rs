//! Init scripts (`.rc` files) reader.
//!
//! Only the statements that bind a script to other artifacts are kept:
//! `service` declarations, whose executable is a dependency, and `import`
//! statements of other scripts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitService {
    pub name: String,
    pub path: String,
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitScript {
    pub services: Vec<InitService>,
    pub imports: Vec<String>,
}

impl InitScript {
    /// Service executables, then imported scripts, without duplicates.
    /// Imports that depend on runtime properties (`${...}`) cannot be mapped
    /// to a file and are left out.
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        let paths = self
            .services
            .iter()
            .map(|service| &service.path)
            .chain(self.imports.iter().filter(|import| !import.contains('$')));
        for path in paths {
            if !deps.contains(path) {
                deps.push(path.clone());
            }
        }
        deps
    }
}

/// Joins continued lines (trailing `\`) into logical lines.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        let line = line.trim();
        if let Some(head) = line.strip_suffix('\\') {
            current.push_str(head);
            current.push(' ');
        } else {
            current.push_str(line);
            lines.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[must_use]
pub fn parse(text: &str) -> InitScript {
    let mut script = InitScript::default();
    for line in logical_lines(text) {
        if line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("service") => match (tokens.next(), tokens.next()) {
                (Some(name), Some(path)) => script.services.push(InitService {
                    name: name.to_string(),
                    path: path.to_string(),
                    arguments: tokens.map(str::to_string).collect(),
                }),
                _ => log::warn!("incomplete service statement: {line:?}"),
            },
            Some("import") => {
                if let Some(path) = tokens.next() {
                    script.imports.push(path.to_string());
                }
            }
            _ => (),
        }
    }
    log::trace!(
        "init script: {} services, {} imports",
        script.services.len(),
        script.imports.len()
    );
    script
}
