//! Ordered deep merge with per-leaf source attribution.
//!
//! Documents fold left-to-right onto an accumulator. Mappings merge
//! key-wise; anything else — scalar over scalar, sequence over anything,
//! mapping over scalar — replaces wholesale. Sequences are never
//! concatenated or index-merged: the entire sequence path is attributed to
//! the replacing document as a single entry.
//!
//! The source map is flat (dot-path → source). When a subtree is replaced,
//! every stale entry beneath the path is removed before the replacement's
//! leaves are recorded, so the map never points into displaced values.

use std::collections::BTreeSet;

use crate::model::{join_path, ConfigDocument, ConfigSource, ConfigValue, Mapping, SourceMap};

/// Fold applicable documents into a merged tree, a source map, and the set
/// of paths that were replaced at least once.
pub fn merge_documents(documents: &[ConfigDocument]) -> (Mapping, SourceMap, BTreeSet<String>) {
    let mut merged = Mapping::new();
    let mut sources = SourceMap::new();
    let mut overridden = BTreeSet::new();

    for doc in documents {
        let source = doc.source();
        deep_merge(
            &mut merged,
            doc.content.clone(),
            "",
            &source,
            &mut sources,
            &mut overridden,
        );
    }

    (merged, sources, overridden)
}

/// Merge `overlay` into `base`, recursing where both sides are mappings and
/// replacing otherwise. `prefix` is the dot-path of `base` within the full
/// tree.
pub fn deep_merge(
    base: &mut Mapping,
    overlay: Mapping,
    prefix: &str,
    source: &ConfigSource,
    sources: &mut SourceMap,
    overridden: &mut BTreeSet<String>,
) {
    for (key, overlay_value) in overlay {
        let path = join_path(prefix, &key);
        match (base.get_mut(&key), overlay_value) {
            (Some(ConfigValue::Map(base_map)), ConfigValue::Map(overlay_map)) => {
                // An empty overlay mapping means "path exists, no children";
                // it must not blank out the existing subtree — and key-wise
                // recursion does exactly that.
                deep_merge(base_map, overlay_map, &path, source, sources, overridden);
            }
            (Some(existing), value) => {
                remove_sources_under(&path, sources);
                overridden.insert(path.clone());
                record_sources(&value, &path, source, sources);
                *existing = value;
            }
            (None, value) => {
                record_sources(&value, &path, source, sources);
                base.insert(key, value);
            }
        }
    }
}

/// Record the source for a value and all its leaves. Sequences are
/// attributed as a whole; mappings recurse.
fn record_sources(value: &ConfigValue, path: &str, source: &ConfigSource, sources: &mut SourceMap) {
    match value {
        ConfigValue::Map(map) => {
            for (key, child) in map {
                let child_path = join_path(path, key);
                record_sources(child, &child_path, source, sources);
            }
        }
        _ => {
            sources.insert(path.to_string(), source.clone());
        }
    }
}

/// Remove all source entries at or under a path.
fn remove_sources_under(path: &str, sources: &mut SourceMap) {
    let prefix = format!("{path}.");
    let stale: Vec<String> = sources
        .keys()
        .filter(|k| *k == path || k.starts_with(&prefix))
        .cloned()
        .collect();
    for key in stale {
        sources.remove(&key);
    }
}
