//! Heuristic detection of libraries loaded at runtime by name.
//!
//! A binary that imports a dynamic loading function may pass any library name
//! found in its read-only strings. Such strings are kept as candidates unless
//! they obviously are not library names.

pub const DLOPEN_SYMBOLS: &[&str] = &["dlopen", "android_dlopen_ext"];

pub const LIBRARY_SUFFIX: &str = ".so";

/// Minimal length of a string pool entry to be considered.
pub const MIN_STRING_LEN: usize = 4;

/// The graphics loader picks its vendor drivers at runtime.
pub const EGL_LOADER: &str = "libEGL.so";
pub const EGL_DRIVER_PATTERNS: &[&str] = &["libEGL*.so", "libGLESv1_CM*.so", "GLESv2*.so"];

/// Filters string pool entries of binary `own_name` into dynamic loading
/// candidates, keeping their first occurrence order.
pub fn candidates<'a, I>(own_name: &str, strings: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut deps: Vec<String> = Vec::new();
    for s in strings {
        if !s.ends_with(LIBRARY_SUFFIX) {
            continue;
        }
        if s.contains(own_name) || s.contains(' ') || s.contains('?') {
            continue;
        }
        if s.starts_with('_') || s.contains('%') {
            log::warn!("{own_name}: unhandled dynamic loading candidate {s:?}, skipped");
            continue;
        }
        if !deps.iter().any(|d| d == s) {
            deps.push(s.to_string());
        }
    }
    deps
}

/// Adds the loader's driver families, if `own_name` is the graphics loader.
pub fn add_driver_patterns(own_name: &str, deps: &mut Vec<String>) {
    if own_name != EGL_LOADER {
        return;
    }
    for pattern in EGL_DRIVER_PATTERNS {
        if !deps.iter().any(|d| d == pattern) {
            deps.push((*pattern).to_string());
        }
    }
}
