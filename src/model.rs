//! Core data types for the resolver pipeline.
//!
//! A configuration tree is an ordered mapping of string keys to
//! [`ConfigValue`] nodes. Documents carry such a tree plus the activation
//! condition that gates them; the merger folds applicable documents into a
//! single tree while maintaining a flat dot-path → [`ConfigSource`] map so
//! the output formatter can say which file contributed each value.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::expr::ProfileExpr;

/// An ordered string-keyed mapping of configuration nodes.
pub type Mapping = IndexMap<String, ConfigValue>;

/// Flat dot-path → origin map for the merged tree's leaves.
///
/// `BTreeMap` keeps iteration order deterministic, which the output
/// formatter and the warning report rely on.
pub type SourceMap = BTreeMap<String, ConfigSource>;

/// A node in a configuration tree: a scalar, a sequence, or a nested
/// mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<ConfigValue>),
    Map(Mapping),
}

impl ConfigValue {
    pub fn is_map(&self) -> bool {
        matches!(self, ConfigValue::Map(_))
    }

    pub fn is_seq(&self) -> bool {
        matches!(self, ConfigValue::Seq(_))
    }

    pub fn is_scalar(&self) -> bool {
        !self.is_map() && !self.is_seq()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Parse a raw string into a typed scalar.
    ///
    /// Tries: bool → integer → float → string. Floats are only accepted when
    /// the text contains a dot, so `NaN`/`inf` stay strings.
    pub fn from_scalar_str(s: &str) -> ConfigValue {
        if s.eq_ignore_ascii_case("true") {
            return ConfigValue::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return ConfigValue::Bool(false);
        }
        if let Ok(i) = s.parse::<i64>() {
            return ConfigValue::Int(i);
        }
        if s.contains('.') {
            if let Ok(f) = s.parse::<f64>() {
                return ConfigValue::Float(f);
            }
        }
        ConfigValue::Str(s.to_string())
    }

    /// Render a scalar as the text a placeholder substitution would produce.
    ///
    /// Returns `None` for sequences, mappings, and null — those are not
    /// substitutable values.
    pub fn substitution_text(&self) -> Option<String> {
        match self {
            ConfigValue::Bool(b) => Some(b.to_string()),
            ConfigValue::Int(i) => Some(i.to_string()),
            ConfigValue::Float(f) => Some(format_float(*f)),
            ConfigValue::Str(s) => Some(s.clone()),
            ConfigValue::Null | ConfigValue::Seq(_) | ConfigValue::Map(_) => None,
        }
    }
}

/// Format a float so it round-trips as a float (`5.0`, not `5`).
pub fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

/// Navigate a mapping by dot-path (`"server.ssl.enabled"`).
pub fn get_path<'a>(map: &'a Mapping, dotted: &str) -> Option<&'a ConfigValue> {
    let mut segments = dotted.split('.');
    let first = segments.next()?;
    let mut current = map.get(first)?;
    for segment in segments {
        current = current.as_map()?.get(segment)?;
    }
    Some(current)
}

/// Join a path prefix and a key into a dot-path.
pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Where a configuration value came from: the file and the document within
/// it that last set the value.
#[derive(Debug, Clone, Eq)]
pub struct ConfigSource {
    pub file: PathBuf,
    pub document_index: usize,
    pub line: Option<u64>,
}

impl ConfigSource {
    pub fn new(file: impl Into<PathBuf>, document_index: usize) -> Self {
        ConfigSource {
            file: file.into(),
            document_index,
            line: None,
        }
    }
}

// Sources are value objects identified by file + document position; the
// line number is advisory and excluded from equality.
impl PartialEq for ConfigSource {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file && self.document_index == other.document_index
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.display().to_string());
        match self.line {
            Some(line) => write!(f, "{name}:{line}"),
            None => write!(f, "{name}"),
        }
    }
}

/// One logical document: a YAML sub-document or a properties section
/// between `#---` markers.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    pub content: Mapping,
    /// Activation condition; `None` means unconditionally active.
    pub activation: Option<ProfileExpr>,
    /// `spring.config.activate.on-cloud-platform`, parsed but not matched
    /// unless the caller supplies a platform context.
    pub on_cloud_platform: Option<String>,
    pub source_file: PathBuf,
    /// 0-based position within the source file.
    pub document_index: usize,
}

impl ConfigDocument {
    pub fn new(content: Mapping, source_file: impl Into<PathBuf>, document_index: usize) -> Self {
        ConfigDocument {
            content,
            activation: None,
            on_cloud_platform: None,
            source_file: source_file.into(),
            document_index,
        }
    }

    pub fn source(&self) -> ConfigSource {
        ConfigSource::new(self.source_file.clone(), self.document_index)
    }

    /// Whether this document applies under the given active-profile set.
    pub fn is_applicable(&self, active: &HashSet<String>) -> bool {
        match &self.activation {
            None => true,
            Some(expr) => expr.evaluate(active),
        }
    }
}

/// A non-fatal finding accumulated during resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub category: WarningCategory,
    pub message: String,
}

impl Warning {
    pub fn new(category: WarningCategory, message: impl Into<String>) -> Self {
        Warning {
            category,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category.label(), self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WarningCategory {
    Parse,
    Restriction,
    UnknownProfile,
    Import,
    Placeholder,
    CloudPlatform,
    Vcap,
}

impl WarningCategory {
    pub fn label(&self) -> &'static str {
        match self {
            WarningCategory::Parse => "parse",
            WarningCategory::Restriction => "restriction",
            WarningCategory::UnknownProfile => "unknown-profile",
            WarningCategory::Import => "import",
            WarningCategory::Placeholder => "placeholder",
            WarningCategory::CloudPlatform => "cloud-platform",
            WarningCategory::Vcap => "vcap",
        }
    }
}

/// The resolver's output: the merged tree, per-leaf attribution, and
/// everything worth telling the user about.
#[derive(Debug, Clone)]
pub struct ResolverResult {
    pub config: Mapping,
    pub sources: SourceMap,
    /// Dot-paths whose value was replaced at least once during the merge.
    pub overridden: BTreeSet<String>,
    pub warnings: Vec<Warning>,
    /// The expanded active list, in precedence order.
    pub active_profiles: Vec<String>,
}
