//! Config file discovery under resource roots.
//!
//! A root is scanned for `application.{yml,yaml,properties}` (the base
//! files) and `application-<profile>.{yml,yaml,properties}` (profile
//! files). Missing roots and missing files are silently skipped — listing a
//! root is a suggestion, not a requirement. Directory listings are sorted
//! lexicographically so two equivalent filesystems produce identical
//! output.

use std::path::{Path, PathBuf};

/// Extension precedence for the merge: later entries override earlier ones.
pub const EXTENSIONS: [&str; 3] = ["yml", "yaml", "properties"];

const BASE_STEM: &str = "application";
const PROFILE_PREFIX: &str = "application-";

/// Extract the profile suffix from a config file name.
///
/// `application-prod.yml` → `Some("prod")`; `application.yml` → `None`;
/// anything else → `None`.
pub fn profile_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if stem == BASE_STEM {
        return None;
    }
    stem.strip_prefix(PROFILE_PREFIX)
        .filter(|suffix| !suffix.is_empty())
        .map(|suffix| suffix.to_string())
}

/// Whether a file path names a config file at all (base or profile).
pub fn is_config_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !EXTENSIONS.contains(&ext) {
        return false;
    }
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => stem == BASE_STEM || stem.starts_with(PROFILE_PREFIX),
        None => false,
    }
}

/// Base config files present in a root, in extension precedence order.
pub fn base_files(root: &Path) -> Vec<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| root.join(format!("{BASE_STEM}.{ext}")))
        .filter(|p| p.is_file())
        .collect()
}

/// Profile-specific config files for one profile in a root, in extension
/// precedence order.
pub fn profile_files(root: &Path, profile: &str) -> Vec<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| root.join(format!("{PROFILE_PREFIX}{profile}.{ext}")))
        .filter(|p| p.is_file())
        .collect()
}

/// All config files in a root, sorted lexicographically by file name.
///
/// This is the deterministic enumeration used to answer "which profile
/// suffixes exist at all" (for the unknown-profile warning); the merge
/// order is built from [`base_files`] / [`profile_files`] instead.
pub fn list_config_files(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_config_file(p))
        .collect();
    files.sort();
    files
}

/// Profile suffixes for which any root carries a config file.
pub fn available_profile_suffixes(roots: &[PathBuf]) -> Vec<String> {
    let mut suffixes: Vec<String> = roots
        .iter()
        .flat_map(|root| list_config_files(root))
        .filter_map(|path| profile_from_filename(&path))
        .collect();
    suffixes.sort();
    suffixes.dedup();
    suffixes
}
