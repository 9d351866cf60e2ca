//! `spring.config.import` directives.
//!
//! An import string is `[optional:][file:|classpath:]<path>`; a bare path
//! behaves like `classpath:`. `file:` resolves relative to the importing
//! file's directory, `classpath:` against the configured resource roots.
//! Imported documents splice into the stream immediately after the
//! importing document and are themselves scanned for imports; the same
//! absolute path appearing twice on the import stack is a cycle and aborts
//! the run, as does a missing target without the `optional:` prefix.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::ResolverError;
use crate::model::{ConfigDocument, ConfigValue, Mapping, Warning, WarningCategory};
use crate::parser;

/// One parsed import directive.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportLocation {
    /// The directive as written, for messages.
    pub raw: String,
    pub path: String,
    pub optional: bool,
    pub scheme: ImportScheme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportScheme {
    File,
    Classpath,
    Unknown,
}

/// Parse an import value: a scalar (possibly a comma-separated list) or a
/// sequence of strings.
pub fn parse_import_value(value: &ConfigValue) -> Vec<ImportLocation> {
    match value {
        ConfigValue::Seq(items) => items
            .iter()
            .filter_map(|item| item.substitution_text())
            .flat_map(|text| parse_import_string(&text))
            .collect(),
        other => match other.substitution_text() {
            Some(text) => parse_import_string(&text),
            None => Vec::new(),
        },
    }
}

fn parse_import_string(value: &str) -> Vec<ImportLocation> {
    value
        .split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(parse_single)
        .collect()
}

fn parse_single(value: &str) -> ImportLocation {
    let raw = value.to_string();
    let mut rest = value;

    let optional = match rest.strip_prefix("optional:") {
        Some(stripped) => {
            rest = stripped;
            true
        }
        None => false,
    };

    let (scheme, path) = if let Some(stripped) = rest.strip_prefix("file:") {
        (ImportScheme::File, stripped)
    } else if let Some(stripped) = rest.strip_prefix("classpath:") {
        (ImportScheme::Classpath, stripped)
    } else if has_scheme_prefix(rest) {
        (ImportScheme::Unknown, rest)
    } else {
        (ImportScheme::Classpath, rest)
    };

    ImportLocation {
        raw,
        path: path.to_string(),
        optional,
        scheme,
    }
}

/// A `:` before any path separator marks a scheme prefix (but a leading `/`
/// is already a path).
fn has_scheme_prefix(value: &str) -> bool {
    if value.starts_with('/') || value.starts_with('.') {
        return false;
    }
    match value.find(':') {
        Some(idx) => !value[..idx].contains('/'),
        None => false,
    }
}

/// Resolve a location to an existing file, if any.
pub fn resolve_location(
    location: &ImportLocation,
    importing_dir: &Path,
    roots: &[PathBuf],
) -> Option<PathBuf> {
    match location.scheme {
        ImportScheme::File => {
            let candidate = if Path::new(&location.path).is_absolute() {
                PathBuf::from(&location.path)
            } else {
                importing_dir.join(&location.path)
            };
            candidate.is_file().then_some(candidate)
        }
        ImportScheme::Classpath => roots
            .iter()
            .map(|root| root.join(&location.path))
            .find(|candidate| candidate.is_file()),
        ImportScheme::Unknown => None,
    }
}

/// Take `spring.config.import` out of a document tree, pruning emptied
/// parents.
pub fn extract_import_value(content: &mut Mapping) -> Option<ConfigValue> {
    let spring = content.get_mut("spring").and_then(|v| v.as_map_mut())?;
    let config = spring.get_mut("config").and_then(|v| v.as_map_mut())?;
    let value = config.shift_remove("import");
    if config.is_empty() {
        spring.shift_remove("config");
    }
    if spring.is_empty() {
        content.shift_remove("spring");
    }
    value
}

/// Parse a file and splice its imports, transitively, into the returned
/// document list.
///
/// `stack` is the chain of files currently being imported (cycle
/// detection); `loaded` records every file read so far in this run so a
/// diamond import is read once.
pub fn load_file_with_imports(
    path: &Path,
    roots: &[PathBuf],
    stack: &mut Vec<PathBuf>,
    loaded: &mut HashSet<PathBuf>,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<ConfigDocument>, ResolverError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if stack.contains(&canonical) {
        let mut chain = stack.clone();
        chain.push(canonical.clone());
        return Err(ResolverError::CircularImport {
            path: canonical,
            chain,
        });
    }
    loaded.insert(canonical.clone());
    stack.push(canonical);

    let parsed = parser::parse_config_file(path)?;
    warnings.extend(parsed.warnings);

    let mut out = Vec::new();
    for mut doc in parsed.documents {
        let import_value = extract_import_value(&mut doc.content);
        let activated = doc.activation.is_some();
        let source_file = doc.source_file.clone();
        let document_index = doc.document_index;
        out.push(doc);

        let Some(import_value) = import_value else {
            continue;
        };
        if activated {
            // Spring forbids imports in profile-specific documents.
            warnings.push(Warning::new(
                WarningCategory::Restriction,
                format!(
                    "{} (document {document_index}): spring.config.import is not allowed in a \
                     profile-activated document; directive dropped",
                    source_file.display()
                ),
            ));
            continue;
        }

        let importing_dir = path.parent().unwrap_or_else(|| Path::new("."));
        for location in parse_import_value(&import_value) {
            if location.scheme == ImportScheme::Unknown {
                warnings.push(Warning::new(
                    WarningCategory::Import,
                    format!(
                        "unsupported import scheme in '{}' (from {}); skipped",
                        location.raw,
                        source_file.display()
                    ),
                ));
                continue;
            }
            match resolve_location(&location, importing_dir, roots) {
                Some(target) => {
                    let target_canonical =
                        target.canonicalize().unwrap_or_else(|_| target.clone());
                    if loaded.contains(&target_canonical) && !stack.contains(&target_canonical) {
                        // diamond: already spliced elsewhere
                        continue;
                    }
                    let imported =
                        load_file_with_imports(&target, roots, stack, loaded, warnings)?;
                    out.extend(imported);
                }
                None if location.optional => {
                    warnings.push(Warning::new(
                        WarningCategory::Import,
                        format!(
                            "optional import '{}' not found (from {})",
                            location.raw,
                            source_file.display()
                        ),
                    ));
                }
                None => {
                    return Err(ResolverError::ImportNotFound {
                        location: location.raw,
                        from: source_file,
                    });
                }
            }
        }
    }

    stack.pop();
    Ok(out)
}
