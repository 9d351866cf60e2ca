//! The environment overlay consulted during placeholder resolution.
//!
//! Built once at startup from, in order of increasing precedence: env
//! files, the process environment (unless disabled), and explicit
//! `KEY=VAL` overrides. Lookups use relaxed binding: the property path has
//! dots and hyphens translated to underscores and the comparison is
//! case-insensitive, so `database.host` matches `DATABASE_HOST`.
//!
//! Takes plain pair iterators so tests can pass synthetic data instead of
//! `std::env::vars()`.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::ResolverError;

/// An immutable set of environment entries with relaxed-binding lookup.
#[derive(Debug, Clone, Default)]
pub struct EnvOverlay {
    // keyed by normalized name; later inserts win
    entries: IndexMap<String, String>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        EnvOverlay::default()
    }

    /// Assemble the overlay from its three layers.
    pub fn build(
        env_files: &[PathBuf],
        system_vars: impl IntoIterator<Item = (String, String)>,
        overrides: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ResolverError> {
        let mut overlay = EnvOverlay::new();
        for file in env_files {
            for (key, value) in load_env_file(file)? {
                overlay.insert(&key, value);
            }
        }
        for (key, value) in system_vars {
            overlay.insert(&key, value);
        }
        for (key, value) in overrides {
            overlay.insert(&key, value);
        }
        Ok(overlay)
    }

    pub fn insert(&mut self, key: &str, value: String) {
        self.entries.insert(normalize(key), value);
    }

    /// Look up a property path (`database.host` → `DATABASE_HOST`).
    pub fn lookup(&self, property_path: &str) -> Option<&str> {
        self.entries
            .get(&normalize(property_path))
            .map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build an overlay from literal pairs; handy for tests and embedders.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut overlay = EnvOverlay::new();
        for (key, value) in pairs {
            overlay.insert(key, value.to_string());
        }
        overlay
    }
}

/// Translate a name to its canonical env form: dots and hyphens become
/// underscores, everything uppercased.
fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Load a `KEY=VAL` env file. Supports quoted values, `#` comments, and
/// blank lines.
pub fn load_env_file(path: &Path) -> Result<Vec<(String, String)>, ResolverError> {
    let content = std::fs::read_to_string(path).map_err(|e| ResolverError::EnvFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_string();
        let mut value = value.trim();
        if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
            || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
        {
            value = &value[1..value.len() - 1];
        }
        pairs.push((key, value.to_string()));
    }

    Ok(pairs)
}

/// Parse `--env KEY=VAL` arguments; a pair without `=` is a user error.
pub fn parse_env_pairs(pairs: &[String]) -> Result<Vec<(String, String)>, ResolverError> {
    pairs
        .iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| ResolverError::InvalidEnvOverride {
                    entry: entry.clone(),
                })
        })
        .collect()
}
