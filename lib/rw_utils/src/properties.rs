//! Reader for `key=value` property files such as `build.prop` or
//! `test-suite-info.properties`.

use std::collections::BTreeMap;

/// Parses properties from text. Comment lines (`#` or `!`), blank lines and
/// lines without `=` (e.g. `import` directives) are ignored. When a key is
/// repeated, the last value wins.
#[must_use]
pub fn parse(text: &str) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => {
                props.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => log::trace!("ignoring property line {line:?}"),
        }
    }
    props
}

/// Same as [`parse`] for raw bytes; invalid UTF-8 is replaced.
#[must_use]
pub fn parse_bytes(data: &[u8]) -> BTreeMap<String, String> {
    parse(&String::from_utf8_lossy(data))
}
