//! Annotated YAML output.
//!
//! The merged tree is serialised with source attribution as comments:
//! when every leaf beneath a mapping shares one source file, a block
//! comment (`# From: <relative-path>`) precedes the mapping; where leaves
//! diverge, each leaf carries an inline comment. Values that were replaced
//! during the merge get an `(overridden)` marker for readability.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ResolverError;
use crate::model::{format_float, join_path, ConfigValue, Mapping, ResolverResult};
use crate::resolve::relative_to_project;

const INDENT: &str = "  ";

/// Output file name for a profile set:
/// `application-<p1>-<p2>-…-computed.yml`.
pub fn output_filename(profiles: &[String]) -> String {
    if profiles.is_empty() {
        "application-computed.yml".to_string()
    } else {
        format!("application-{}-computed.yml", profiles.join("-"))
    }
}

/// Render the merged tree as annotated YAML.
pub fn render(result: &ResolverResult, project_root: &Path) -> String {
    let rel_sources: BTreeMap<&str, String> = result
        .sources
        .iter()
        .map(|(path, source)| {
            (
                path.as_str(),
                relative_to_project(&source.file, project_root),
            )
        })
        .collect();

    let renderer = Renderer {
        sources: rel_sources,
        overridden: &result.overridden,
    };
    let mut out = String::new();
    renderer.render_map(&result.config, "", 0, false, &mut out);
    out
}

/// Render and write to `<output_dir>/<filename>`, creating the directory
/// if missing. Returns the written path.
pub fn write_output(
    result: &ResolverResult,
    project_root: &Path,
    output_dir: &Path,
    profiles: &[String],
) -> Result<PathBuf, ResolverError> {
    std::fs::create_dir_all(output_dir).map_err(|e| ResolverError::Io {
        path: output_dir.to_path_buf(),
        source: e,
    })?;
    let path = output_dir.join(output_filename(profiles));
    let rendered = render(result, project_root);
    std::fs::write(&path, rendered).map_err(|e| ResolverError::Io {
        path: path.clone(),
        source: e,
    })?;
    Ok(path)
}

struct Renderer<'a> {
    sources: BTreeMap<&'a str, String>,
    overridden: &'a std::collections::BTreeSet<String>,
}

impl Renderer<'_> {
    fn render_map(
        &self,
        map: &Mapping,
        prefix: &str,
        indent: usize,
        suppress_comments: bool,
        out: &mut String,
    ) {
        let pad = INDENT.repeat(indent);
        for (key, value) in map {
            let path = join_path(prefix, key);
            match value {
                ConfigValue::Map(nested) if !nested.is_empty() => {
                    let uniform = self.uniform_source(&path);
                    if !suppress_comments {
                        if let Some(source) = &uniform {
                            out.push_str(&format!("{pad}# From: {source}\n"));
                        }
                    }
                    out.push_str(&format!("{pad}{}:\n", render_key(key)));
                    self.render_map(
                        nested,
                        &path,
                        indent + 1,
                        suppress_comments || uniform.is_some(),
                        out,
                    );
                }
                ConfigValue::Map(_) => {
                    out.push_str(&format!("{pad}{}: {{}}\n", render_key(key)));
                }
                ConfigValue::Seq(items) => {
                    out.push_str(&format!(
                        "{pad}{}:{}\n",
                        render_key(key),
                        self.comment_for(&path, suppress_comments)
                    ));
                    self.render_seq(items, indent + 1, out);
                }
                scalar => {
                    out.push_str(&format!(
                        "{pad}{}: {}{}\n",
                        render_key(key),
                        render_scalar(scalar),
                        self.comment_for(&path, suppress_comments)
                    ));
                }
            }
        }
    }

    fn render_seq(&self, items: &[ConfigValue], indent: usize, out: &mut String) {
        let pad = INDENT.repeat(indent);
        for item in items {
            match item {
                ConfigValue::Map(map) if !map.is_empty() => {
                    out.push_str(&format!("{pad}-\n"));
                    // sequence contents are attributed as a whole
                    self.render_map(map, "", indent + 1, true, out);
                }
                ConfigValue::Map(_) => out.push_str(&format!("{pad}- {{}}\n")),
                ConfigValue::Seq(nested) => {
                    out.push_str(&format!("{pad}-\n"));
                    self.render_seq(nested, indent + 1, out);
                }
                scalar => out.push_str(&format!("{pad}- {}\n", render_scalar(scalar))),
            }
        }
    }

    fn comment_for(&self, path: &str, suppress: bool) -> String {
        if suppress {
            return String::new();
        }
        let Some(source) = self.sources.get(path) else {
            return String::new();
        };
        if self.overridden.contains(path) {
            format!("  # {source} (overridden)")
        } else {
            format!("  # {source}")
        }
    }

    /// The single source shared by every leaf at or under `path`, if there
    /// is exactly one.
    fn uniform_source(&self, path: &str) -> Option<String> {
        let prefix = format!("{path}.");
        let mut found: Option<&str> = None;
        for (entry, source) in &self.sources {
            if *entry == path || entry.starts_with(&prefix) {
                match found {
                    None => found = Some(source),
                    Some(existing) if existing == source => {}
                    Some(_) => return None,
                }
            }
        }
        found.map(|s| s.to_string())
    }
}

fn render_key(key: &str) -> String {
    if key.is_empty() || needs_quotes(key) {
        quote(key)
    } else {
        key.to_string()
    }
}

fn render_scalar(value: &ConfigValue) -> String {
    match value {
        ConfigValue::Null => "null".to_string(),
        ConfigValue::Bool(b) => b.to_string(),
        ConfigValue::Int(i) => i.to_string(),
        ConfigValue::Float(f) => format_float(*f),
        ConfigValue::Str(s) => {
            if needs_quotes(s) {
                quote(s)
            } else {
                s.clone()
            }
        }
        ConfigValue::Seq(_) | ConfigValue::Map(_) => String::new(),
    }
}

/// Whether a plain YAML scalar would be misread without quoting.
fn needs_quotes(s: &str) -> bool {
    if s.is_empty() || s != s.trim() || s.contains('\n') {
        return true;
    }
    // would parse as a non-string scalar
    if !matches!(ConfigValue::from_scalar_str(s), ConfigValue::Str(_)) {
        return true;
    }
    let lowered = s.to_ascii_lowercase();
    if matches!(lowered.as_str(), "null" | "~" | "yes" | "no" | "on" | "off") {
        return true;
    }
    if s.starts_with(|c: char| "-?:,[]{}#&*!|>'\"%@`".contains(c)) {
        return true;
    }
    s.contains(": ") || s.ends_with(':') || s.contains(" #")
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfigSource, SourceMap};
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn result_from(
        yaml: &str,
        sources: Vec<(&str, &str)>,
        overridden: Vec<&str>,
    ) -> ResolverResult {
        let config = crate::parser::parse_yaml(yaml, Path::new("application.yml"))
            .unwrap()
            .documents
            .remove(0)
            .content;
        let mut source_map = SourceMap::new();
        for (path, file) in sources {
            source_map.insert(path.to_string(), ConfigSource::new(file, 0));
        }
        ResolverResult {
            config,
            sources: source_map,
            overridden: overridden.into_iter().map(|s| s.to_string()).collect(),
            warnings: Vec::new(),
            active_profiles: vec!["prod".to_string()],
        }
    }

    fn render_at_root(result: &ResolverResult) -> String {
        render(result, Path::new("/definitely/not/a/prefix"))
    }

    #[test]
    fn filename_joins_profiles() {
        assert_eq!(
            output_filename(&["prod".to_string(), "aws".to_string()]),
            "application-prod-aws-computed.yml"
        );
        assert_eq!(output_filename(&[]), "application-computed.yml");
    }

    #[test]
    fn uniform_section_gets_block_comment() {
        let result = result_from(
            "server:\n  port: 80\n  host: web\n",
            vec![
                ("server.port", "application-prod.yml"),
                ("server.host", "application-prod.yml"),
            ],
            vec![],
        );
        let out = render_at_root(&result);
        assert!(out.contains("# From: application-prod.yml\nserver:\n"));
        // leaves under a uniform section carry no inline comments
        assert!(out.contains("  port: 80\n"));
        assert!(!out.contains("port: 80  #"));
    }

    #[test]
    fn divergent_leaves_get_inline_comments() {
        let result = result_from(
            "server:\n  port: 80\n  host: web\n",
            vec![
                ("server.port", "application-prod.yml"),
                ("server.host", "application.yml"),
            ],
            vec![],
        );
        let out = render_at_root(&result);
        assert!(!out.contains("# From:"));
        assert!(out.contains("port: 80  # application-prod.yml"));
        assert!(out.contains("host: web  # application.yml"));
    }

    #[test]
    fn overridden_marker_appended() {
        let result = result_from(
            "port: 80\nname: x\n",
            vec![("port", "application-prod.yml"), ("name", "application.yml")],
            vec!["port"],
        );
        let out = render_at_root(&result);
        assert!(out.contains("port: 80  # application-prod.yml (overridden)"));
        assert!(out.contains("name: x  # application.yml\n"));
    }

    #[test]
    fn sequences_render_block_style() {
        let result = result_from(
            "hosts:\n  - a\n  - b\n",
            vec![("hosts", "application.yml")],
            vec![],
        );
        let out = render_at_root(&result);
        assert!(out.contains("hosts:  # application.yml\n  - a\n  - b\n"));
    }

    #[test]
    fn mapping_items_inside_sequences() {
        let result = result_from(
            "servers:\n  - name: a\n    port: 1\n",
            vec![("servers", "application.yml")],
            vec![],
        );
        let out = render_at_root(&result);
        assert!(out.contains("servers:  # application.yml\n  -\n    name: a\n    port: 1\n"));
    }

    #[test]
    fn strings_quoted_when_ambiguous() {
        assert_eq!(render_scalar(&ConfigValue::Str("plain".into())), "plain");
        assert_eq!(
            render_scalar(&ConfigValue::Str("jdbc:postgresql://db/x".into())),
            "jdbc:postgresql://db/x"
        );
        assert_eq!(render_scalar(&ConfigValue::Str("8080".into())), "\"8080\"");
        assert_eq!(render_scalar(&ConfigValue::Str("true".into())), "\"true\"");
        assert_eq!(render_scalar(&ConfigValue::Str("no".into())), "\"no\"");
        assert_eq!(render_scalar(&ConfigValue::Str("".into())), "\"\"");
        assert_eq!(
            render_scalar(&ConfigValue::Str("a: b".into())),
            "\"a: b\""
        );
        assert_eq!(
            render_scalar(&ConfigValue::Str(" padded ".into())),
            "\" padded \""
        );
        assert_eq!(
            render_scalar(&ConfigValue::Str("line\nbreak".into())),
            "\"line\\nbreak\""
        );
    }

    #[test]
    fn float_keeps_decimal_point() {
        assert_eq!(render_scalar(&ConfigValue::Float(5.0)), "5.0");
        assert_eq!(render_scalar(&ConfigValue::Float(1.25)), "1.25");
    }

    #[test]
    fn empty_mapping_rendered_inline() {
        let result = result_from("empty: {}\nafter: 1\n", vec![("after", "a.yml")], vec![]);
        let out = render_at_root(&result);
        assert!(out.contains("empty: {}\n"));
    }

    #[test]
    fn nested_uniform_inside_divergent_parent() {
        let result = result_from(
            "app:\n  db:\n    url: x\n    pool: 5\n  name: demo\n",
            vec![
                ("app.db.url", "application-prod.yml"),
                ("app.db.pool", "application-prod.yml"),
                ("app.name", "application.yml"),
            ],
            vec![],
        );
        let out = render_at_root(&result);
        // app diverges, app.db is uniform
        assert!(out.contains("  # From: application-prod.yml\n  db:\n"));
        assert!(out.contains("name: demo  # application.yml"));
        assert!(!out.contains("url: x  #"));
    }

    #[test]
    fn write_output_creates_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = result_from("a: 1\n", vec![("a", "application.yml")], vec![]);
        let out_dir = dir.path().join(".computed");
        let path = write_output(
            &result,
            dir.path(),
            &out_dir,
            &["prod".to_string()],
        )
        .unwrap();
        assert_eq!(path, out_dir.join("application-prod-computed.yml"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("a: 1"));
    }

    #[test]
    fn relative_paths_in_comments() {
        let dir = tempfile::TempDir::new().unwrap();
        let resources = dir.path().join("src/main/resources");
        std::fs::create_dir_all(&resources).unwrap();
        let file = resources.join("application.yml");
        std::fs::write(&file, "a: 1\n").unwrap();

        let mut source_map = SourceMap::new();
        source_map.insert("a".to_string(), ConfigSource::new(file, 0));
        let result = ResolverResult {
            config: crate::parser::parse_yaml("a: 1\n", Path::new("application.yml"))
                .unwrap()
                .documents
                .remove(0)
                .content,
            sources: source_map,
            overridden: BTreeSet::new(),
            warnings: Vec::new(),
            active_profiles: vec![],
        };
        let out = render(&result, dir.path());
        assert!(out.contains("a: 1  # src/main/resources/application.yml"));
    }

    #[test]
    fn key_needing_quotes() {
        let mut config = Mapping::new();
        config.insert("on".to_string(), ConfigValue::Bool(true));
        let result = ResolverResult {
            config,
            sources: SourceMap::new(),
            overridden: BTreeSet::new(),
            warnings: Vec::new(),
            active_profiles: vec![],
        };
        let out = render_at_root(&result);
        assert!(out.contains("\"on\": true"));
    }

    #[test]
    fn deterministic_rendering() {
        let result = result_from(
            "b: 2\na: 1\n",
            vec![("a", "x.yml"), ("b", "y.yml")],
            vec![],
        );
        let first = render_at_root(&result);
        let second = render_at_root(&result);
        assert_eq!(first, second);
        // declaration order preserved, not alphabetical
        assert!(first.find("b: 2").unwrap() < first.find("a: 1").unwrap());
    }
}
