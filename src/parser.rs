//! Configuration file parsing.
//!
//! The entry point [`parse_config_file`] dispatches on extension: YAML files
//! are handled here, `.properties` files by the [`properties`](crate::properties)
//! module. Both produce the same output shape — an ordered list of
//! [`ConfigDocument`]s plus any non-fatal warnings — so the rest of the
//! pipeline never cares which format a document came from.
//!
//! Activation metadata (`spring.config.activate.on-profile` and
//! `on-cloud-platform`) is extracted and stripped from document content
//! during parsing. Two restrictions are enforced at this stage:
//!
//! - `on-profile` combined with `spring.profiles.active`/`include` in the
//!   same document drops the document with a warning.
//! - A malformed activation expression drops the document with a warning.

use std::fs;
use std::path::Path;

use yaml_rust2::{Yaml, YamlLoader};

use crate::error::ResolverError;
use crate::expr::ProfileExpr;
use crate::model::{ConfigDocument, ConfigValue, Mapping, Warning, WarningCategory};
use crate::properties;

/// The outcome of parsing one file: its documents in declaration order and
/// any warnings raised while reading them.
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub documents: Vec<ConfigDocument>,
    pub warnings: Vec<Warning>,
}

/// Parse a configuration file, dispatching on its extension.
pub fn parse_config_file(path: &Path) -> Result<ParsedFile, ResolverError> {
    let content = fs::read_to_string(path).map_err(|e| ResolverError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("yml") | Some("yaml") => parse_yaml(&content, path),
        Some("properties") => properties::parse_properties(&content, path),
        _ => Ok(ParsedFile {
            documents: Vec::new(),
            warnings: vec![Warning::new(
                WarningCategory::Parse,
                format!("Unsupported config file type: {}", path.display()),
            )],
        }),
    }
}

/// Parse a (possibly multi-document) YAML string.
///
/// Documents keep declaration order. An empty document between separators is
/// kept with empty content; a trailing empty document (a trailing `---`) is
/// skipped. Malformed YAML is a hard error carrying file and line.
pub fn parse_yaml(content: &str, source: &Path) -> Result<ParsedFile, ResolverError> {
    let raw_docs = YamlLoader::load_from_str(content).map_err(|e| ResolverError::Parse {
        path: source.to_path_buf(),
        line: e.marker().line(),
        message: e.to_string(),
    })?;

    let total = raw_docs.len();
    let mut parsed = ParsedFile::default();

    for (index, raw) in raw_docs.into_iter().enumerate() {
        let is_empty = matches!(raw, Yaml::Null | Yaml::BadValue);
        if is_empty && index + 1 == total {
            // trailing separator
            continue;
        }

        let mut content = match yaml_to_value(raw) {
            ConfigValue::Map(map) => map,
            ConfigValue::Null => Mapping::new(),
            _ => {
                parsed.warnings.push(Warning::new(
                    WarningCategory::Parse,
                    format!(
                        "{}: document {index} is not a mapping; document dropped",
                        source.display()
                    ),
                ));
                continue;
            }
        };

        match extract_activation(&mut content, source, index) {
            Ok((activation, on_cloud_platform)) => {
                let mut doc = ConfigDocument::new(content, source, index);
                doc.activation = activation;
                doc.on_cloud_platform = on_cloud_platform;
                parsed.documents.push(doc);
            }
            Err(warning) => parsed.warnings.push(warning),
        }
    }

    Ok(parsed)
}

/// Pull `spring.config.activate.on-profile` / `on-cloud-platform` out of a
/// document's content, pruning the emptied parents.
///
/// Returns a [`Warning`] (meaning: drop the document) when the activation
/// expression is malformed or combined with `spring.profiles.active`/
/// `include` in the same document.
pub(crate) fn extract_activation(
    content: &mut Mapping,
    source: &Path,
    document_index: usize,
) -> Result<(Option<ProfileExpr>, Option<String>), Warning> {
    let mut on_profile: Option<ConfigValue> = None;
    let mut on_cloud_platform: Option<String> = None;

    if let Some(spring) = content.get_mut("spring").and_then(|v| v.as_map_mut()) {
        if let Some(config) = spring.get_mut("config").and_then(|v| v.as_map_mut()) {
            if let Some(activate) = config.get_mut("activate").and_then(|v| v.as_map_mut()) {
                on_profile = activate.shift_remove("on-profile");
                on_cloud_platform = activate
                    .shift_remove("on-cloud-platform")
                    .and_then(|v| v.substitution_text());
            }
            prune_empty_map(config, "activate");
        }
        prune_empty_map(spring, "config");
    }
    prune_empty_map(content, "spring");

    let activation = match on_profile {
        None => None,
        Some(value) => Some(parse_on_profile(value).map_err(|message| {
            Warning::new(
                WarningCategory::Parse,
                format!(
                    "{} (document {document_index}): {message}; document dropped",
                    source.display()
                ),
            )
        })?),
    };

    if activation.is_some() && declares_active_profiles(content) {
        return Err(Warning::new(
            WarningCategory::Restriction,
            format!(
                "{} (document {document_index}): spring.profiles.active/include cannot be \
                 combined with spring.config.activate.on-profile; document dropped",
                source.display()
            ),
        ));
    }

    Ok((activation, on_cloud_platform))
}

fn prune_empty_map(map: &mut Mapping, key: &str) {
    let empty = map
        .get(key)
        .and_then(|v| v.as_map())
        .is_some_and(|m| m.is_empty());
    if empty {
        map.shift_remove(key);
    }
}

fn declares_active_profiles(content: &Mapping) -> bool {
    content
        .get("spring")
        .and_then(|v| v.as_map())
        .and_then(|m| m.get("profiles"))
        .and_then(|v| v.as_map())
        .is_some_and(|m| m.contains_key("active") || m.contains_key("include"))
}

/// Turn an `on-profile` value into a compiled expression.
///
/// A sequence or comma-separated list is the legacy OR form; anything else
/// is parsed with the expression grammar.
fn parse_on_profile(value: ConfigValue) -> Result<ProfileExpr, String> {
    match value {
        ConfigValue::Seq(items) => {
            let names: Vec<String> = items
                .iter()
                .filter_map(|item| item.substitution_text())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            ProfileExpr::any_of(names).ok_or_else(|| "empty on-profile list".to_string())
        }
        other => {
            let text = other
                .substitution_text()
                .ok_or_else(|| "on-profile must be a string or a list of names".to_string())?;
            if text.contains(',') {
                let names: Vec<String> = text
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                ProfileExpr::any_of(names).ok_or_else(|| "empty on-profile list".to_string())
            } else {
                ProfileExpr::parse(text.trim())
                    .map_err(|e| format!("invalid profile expression '{text}': {e}"))
            }
        }
    }
}

fn yaml_to_value(yaml: Yaml) -> ConfigValue {
    match yaml {
        Yaml::Real(s) => s
            .parse::<f64>()
            .map(ConfigValue::Float)
            .unwrap_or(ConfigValue::Str(s)),
        Yaml::Integer(i) => ConfigValue::Int(i),
        Yaml::String(s) => ConfigValue::Str(s),
        Yaml::Boolean(b) => ConfigValue::Bool(b),
        Yaml::Array(items) => ConfigValue::Seq(items.into_iter().map(yaml_to_value).collect()),
        Yaml::Hash(hash) => {
            let mut map = Mapping::new();
            for (key, value) in hash {
                map.insert(yaml_key(&key), yaml_to_value(value));
            }
            ConfigValue::Map(map)
        }
        Yaml::Null | Yaml::BadValue | Yaml::Alias(_) => ConfigValue::Null,
    }
}

fn yaml_key(yaml: &Yaml) -> String {
    match yaml {
        Yaml::String(s) => s.clone(),
        Yaml::Integer(i) => i.to_string(),
        Yaml::Boolean(b) => b.to_string(),
        Yaml::Real(s) => s.clone(),
        other => format!("{other:?}"),
    }
}
