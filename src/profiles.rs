//! Profile group expansion and document applicability.
//!
//! Group tables (`spring.profiles.group.*`) are collected from the
//! unconditional documents of base (non-profile-suffixed) files in the main
//! resource roots; tables from later documents override earlier entries
//! key-wise. A group directive anywhere else — an activated document or a
//! profile-suffixed file — is a restriction violation: it is reported and
//! stripped.
//!
//! Expansion is depth-first with the parent emitted before its members,
//! duplicates suppressed at their first occurrence, and cycles reported as
//! a hard error naming the offending chain.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::discover;
use crate::error::ResolverError;
use crate::model::{ConfigDocument, ConfigValue, Mapping, Warning, WarningCategory};

/// Group name → member profiles, in declaration order.
pub type ProfileGroups = IndexMap<String, Vec<String>>;

/// Collect group definitions from eligible documents and strip them from
/// ineligible ones.
///
/// `documents` are the base-file documents loaded from main roots. Only
/// unconditional documents contribute; an activated document declaring
/// groups gets a warning and the directive removed.
pub fn collect_groups(
    documents: &mut [ConfigDocument],
    warnings: &mut Vec<Warning>,
) -> ProfileGroups {
    let mut groups = ProfileGroups::new();
    for doc in documents.iter_mut() {
        let profile_suffix = discover::profile_from_filename(&doc.source_file);
        if doc.activation.is_none() && profile_suffix.is_none() {
            for (name, members) in parse_group_table(&doc.content) {
                groups.insert(name, members);
            }
        } else {
            strip_group_directive(doc, warnings);
        }
    }
    groups
}

/// Remove `spring.profiles.group` from profile-specific documents, warning
/// when one was present. Unconditional documents of base-named files are
/// left alone.
pub fn strip_group_directives(documents: &mut [ConfigDocument], warnings: &mut Vec<Warning>) {
    for doc in documents.iter_mut() {
        if doc.activation.is_some() || discover::profile_from_filename(&doc.source_file).is_some() {
            strip_group_directive(doc, warnings);
        }
    }
}

fn strip_group_directive(doc: &mut ConfigDocument, warnings: &mut Vec<Warning>) {
    let Some(profiles) = doc
        .content
        .get_mut("spring")
        .and_then(|v| v.as_map_mut())
        .and_then(|m| m.get_mut("profiles"))
        .and_then(|v| v.as_map_mut())
    else {
        return;
    };
    if profiles.shift_remove("group").is_some() {
        warnings.push(Warning::new(
            WarningCategory::Restriction,
            format!(
                "{} (document {}): spring.profiles.group is not allowed in a \
                 profile-specific document; directive dropped",
                doc.source_file.display(),
                doc.document_index
            ),
        ));
    }
}

/// Read `spring.profiles.group.*` from a document tree. Members may be a
/// comma-separated string or a sequence of names.
fn parse_group_table(content: &Mapping) -> ProfileGroups {
    let mut groups = ProfileGroups::new();
    let Some(table) = content
        .get("spring")
        .and_then(|v| v.as_map())
        .and_then(|m| m.get("profiles"))
        .and_then(|v| v.as_map())
        .and_then(|m| m.get("group"))
        .and_then(|v| v.as_map())
    else {
        return groups;
    };

    for (name, members) in table {
        let parsed = match members {
            ConfigValue::Str(s) => s
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            ConfigValue::Seq(items) => items
                .iter()
                .filter_map(|item| item.substitution_text())
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            _ => continue,
        };
        groups.insert(name.clone(), parsed);
    }

    groups
}

/// Expand the requested profile list into the active list.
///
/// Depth-first, parent before members, first occurrence wins. A profile
/// re-entered while it is still being expanded is a cycle and aborts the
/// run.
pub fn expand_profiles(
    requested: &[String],
    groups: &ProfileGroups,
) -> Result<Vec<String>, ResolverError> {
    let mut emitted: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut visiting: Vec<String> = Vec::new();

    for profile in requested {
        expand_single(profile, groups, &mut emitted, &mut seen, &mut visiting)?;
    }

    Ok(emitted)
}

fn expand_single(
    profile: &str,
    groups: &ProfileGroups,
    emitted: &mut Vec<String>,
    seen: &mut HashSet<String>,
    visiting: &mut Vec<String>,
) -> Result<(), ResolverError> {
    if visiting.iter().any(|p| p == profile) {
        let mut chain = visiting.clone();
        chain.push(profile.to_string());
        return Err(ResolverError::CircularProfileGroup { chain });
    }
    if seen.contains(profile) {
        return Ok(());
    }

    seen.insert(profile.to_string());
    emitted.push(profile.to_string());

    if let Some(members) = groups.get(profile) {
        visiting.push(profile.to_string());
        for member in members {
            expand_single(member, groups, emitted, seen, visiting)?;
        }
        visiting.pop();
    }

    Ok(())
}

/// Keep the documents that apply under the active profiles, preserving
/// order. Documents gated on a cloud platform are treated as
/// unconditionally active, with a warning, since no platform context is
/// available.
pub fn applicable_documents(
    documents: Vec<ConfigDocument>,
    active: &[String],
    warnings: &mut Vec<Warning>,
) -> Vec<ConfigDocument> {
    let active_set: HashSet<String> = active.iter().cloned().collect();
    let mut applicable = Vec::new();

    for doc in documents {
        if !doc.is_applicable(&active_set) {
            continue;
        }
        if let Some(platform) = &doc.on_cloud_platform {
            warnings.push(Warning::new(
                WarningCategory::CloudPlatform,
                format!(
                    "{} (document {}): on-cloud-platform '{platform}' cannot be matched \
                     without a platform context; document treated as active",
                    doc.source_file.display(),
                    doc.document_index
                ),
            ));
        }
        applicable.push(doc);
    }

    applicable
}
