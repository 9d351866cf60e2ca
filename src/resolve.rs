//! The resolution pipeline: merge all configuration layers and produce the
//! effective tree.
//!
//! Operates on a pre-built [`ResolveOptions`] so the full pipeline is
//! drivable from tests with synthetic inputs. Steps:
//!
//! 1. Load base `application.*` files from the main roots (imports splice
//!    in as they are found)
//! 2. Collect profile groups from their unconditional documents
//! 3. Expand the requested profiles into the active list
//! 4. Load profile-specific files for the active profiles, then test
//!    resources last
//! 5. Filter documents against the active profiles and merge in order
//! 6. Resolve placeholders against the merged tree, the VCAP namespace,
//!    and the environment overlay

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::discover;
use crate::env::EnvOverlay;
use crate::error::ResolverError;
use crate::imports;
use crate::merge;
use crate::model::{ConfigDocument, ResolverResult, Warning, WarningCategory};
use crate::placeholder;
use crate::profiles;
use crate::vcap;

/// Everything a resolver run needs. The environment overlay and VCAP
/// payloads are ingested by the caller (the CLI reads them once at
/// startup), keeping the pipeline itself deterministic.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub project_path: PathBuf,
    /// Requested profiles, order significant.
    pub profiles: Vec<String>,
    /// Extra main resource roots, relative to the project.
    pub resource_dirs: Vec<String>,
    /// Also load `src/test/resources`, applied last.
    pub include_test: bool,
    pub env: EnvOverlay,
    pub vcap_services_json: Option<String>,
    pub vcap_application_json: Option<String>,
    pub ignore_vcap_warnings: bool,
    /// Placeholder pass limit; `None` means the default of 10.
    pub max_placeholder_iterations: Option<usize>,
}

impl ResolveOptions {
    pub fn new(project_path: impl Into<PathBuf>, profiles: Vec<String>) -> Self {
        ResolveOptions {
            project_path: project_path.into(),
            profiles,
            resource_dirs: Vec::new(),
            include_test: false,
            env: EnvOverlay::new(),
            vcap_services_json: None,
            vcap_application_json: None,
            ignore_vcap_warnings: false,
            max_placeholder_iterations: None,
        }
    }
}

/// Run the pipeline and produce the effective configuration.
pub fn resolve(options: &ResolveOptions) -> Result<ResolverResult, ResolverError> {
    if !options.project_path.is_dir() {
        return Err(ResolverError::ProjectNotFound {
            path: options.project_path.clone(),
        });
    }
    if options.profiles.is_empty() {
        return Err(ResolverError::NoProfiles);
    }

    let mut warnings: Vec<Warning> = Vec::new();

    let main_roots = main_roots(options);
    let test_roots = if options.include_test {
        vec![options.project_path.join("src").join("test").join("resources")]
    } else {
        Vec::new()
    };

    // `classpath:` imports resolve against every configured root.
    let mut classpath_roots = main_roots.clone();
    classpath_roots.extend(test_roots.iter().cloned());

    // Step 1: base files from main roots, imports spliced inline.
    let mut import_stack: Vec<PathBuf> = Vec::new();
    let mut loaded: HashSet<PathBuf> = HashSet::new();
    let mut base_docs: Vec<ConfigDocument> = Vec::new();
    for root in &main_roots {
        for file in discover::base_files(root) {
            base_docs.extend(imports::load_file_with_imports(
                &file,
                &classpath_roots,
                &mut import_stack,
                &mut loaded,
                &mut warnings,
            )?);
        }
    }
    if base_docs.is_empty() {
        warnings.push(Warning::new(
            WarningCategory::Parse,
            format!(
                "no application config found under {}",
                main_roots
                    .iter()
                    .map(|r| r.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ));
    }
    tracing::debug!(documents = base_docs.len(), "base documents loaded");

    // Step 2: groups come only from base documents of main roots.
    let groups = profiles::collect_groups(&mut base_docs, &mut warnings);

    // Step 3: expand the requested list.
    let active = profiles::expand_profiles(&options.profiles, &groups)?;
    tracing::debug!(?active, "profiles expanded");

    // Step 4: profile-specific files (active-list order), then test roots.
    let mut all_docs = base_docs;
    let base_len = all_docs.len();
    for profile in &active {
        for root in &main_roots {
            for file in discover::profile_files(root, profile) {
                let docs = imports::load_file_with_imports(
                    &file,
                    &classpath_roots,
                    &mut import_stack,
                    &mut loaded,
                    &mut warnings,
                )?;
                all_docs.extend(docs);
            }
        }
    }
    for root in &test_roots {
        for file in discover::base_files(root) {
            all_docs.extend(imports::load_file_with_imports(
                &file,
                &classpath_roots,
                &mut import_stack,
                &mut loaded,
                &mut warnings,
            )?);
        }
    }
    for profile in &active {
        for root in &test_roots {
            for file in discover::profile_files(root, profile) {
                all_docs.extend(imports::load_file_with_imports(
                    &file,
                    &classpath_roots,
                    &mut import_stack,
                    &mut loaded,
                    &mut warnings,
                )?);
            }
        }
    }

    // Group directives in anything loaded after the base pass are
    // restriction violations.
    profiles::strip_group_directives(&mut all_docs[base_len..], &mut warnings);

    unknown_profile_warnings(
        &options.profiles,
        &groups,
        &all_docs,
        &main_roots,
        &test_roots,
        &mut warnings,
    );

    // Step 5: filter and merge.
    let applicable = profiles::applicable_documents(all_docs, &active, &mut warnings);
    tracing::debug!(documents = applicable.len(), "documents applicable");
    let (mut config, sources, overridden) = merge::merge_documents(&applicable);

    // Step 6: placeholders.
    let vcap_namespace = vcap::vcap_namespace(
        options.vcap_services_json.as_deref(),
        options.vcap_application_json.as_deref(),
        &mut warnings,
    );
    if !options.ignore_vcap_warnings {
        warnings.extend(vcap::availability_warnings(
            &config,
            vcap_namespace.is_some(),
        ));
    }
    warnings.extend(placeholder::resolve_placeholders(
        &mut config,
        vcap_namespace.as_ref(),
        &options.env,
        options.max_placeholder_iterations,
    ));

    Ok(ResolverResult {
        config,
        sources,
        overridden,
        warnings,
        active_profiles: active,
    })
}

fn main_roots(options: &ResolveOptions) -> Vec<PathBuf> {
    let mut roots = vec![options
        .project_path
        .join("src")
        .join("main")
        .join("resources")];
    for dir in &options.resource_dirs {
        roots.push(options.project_path.join(dir));
    }
    roots
}

/// A requested profile that matches no file suffix, no group, and no
/// activation expression probably names nothing at all.
fn unknown_profile_warnings(
    requested: &[String],
    groups: &profiles::ProfileGroups,
    documents: &[ConfigDocument],
    main_roots: &[PathBuf],
    test_roots: &[PathBuf],
    warnings: &mut Vec<Warning>,
) {
    let mut roots: Vec<PathBuf> = main_roots.to_vec();
    roots.extend(test_roots.iter().cloned());
    let suffixes = discover::available_profile_suffixes(&roots);

    let mut referenced: HashSet<&str> = HashSet::new();
    for doc in documents {
        if let Some(expr) = &doc.activation {
            referenced.extend(expr.profiles());
        }
    }

    for profile in requested {
        let known = groups.contains_key(profile)
            || suffixes.contains(profile)
            || referenced.contains(profile.as_str());
        if !known {
            warnings.push(Warning::new(
                WarningCategory::UnknownProfile,
                format!("requested profile '{profile}' matches no config file, group, or activation"),
            ));
        }
    }
}

/// Compute the path of a source file relative to the project, for
/// attribution comments.
pub fn relative_to_project(path: &Path, project: &Path) -> String {
    let canonical_project = project.canonicalize().unwrap_or_else(|_| project.to_path_buf());
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    canonical
        .strip_prefix(&canonical_project)
        .unwrap_or(&canonical)
        .display()
        .to_string()
}
