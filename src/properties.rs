//! Java properties parsing with the Spring Boot extensions.
//!
//! Beyond the classic format (`key=value` / `key: value`, `#`/`!` comments,
//! `\` line continuations, `\uXXXX` escapes) this handles:
//!
//! - multi-document separators: a full `#---` or `!---` line splits the file
//!   into documents, mirroring YAML's `---`;
//! - `spring.config.activate.on-profile` as a per-document activation;
//! - dotted keys building nested mappings and `key[0]` index notation
//!   building sequences.
//!
//! Values are typed with the same heuristic used elsewhere in the crate:
//! bool, then integer, then float, then string.

use std::path::Path;

use crate::error::ResolverError;
use crate::model::{ConfigDocument, ConfigValue, Mapping};
use crate::parser::{self, ParsedFile};

/// Parse properties content into documents.
///
/// Invalid escape sequences (bad or truncated `\uXXXX`, surrogate code
/// points) are hard errors carrying file and line.
pub fn parse_properties(content: &str, source: &Path) -> Result<ParsedFile, ResolverError> {
    let mut sections: Vec<Vec<(usize, &str)>> = Vec::new();
    let mut current: Vec<(usize, &str)> = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim_end();
        if trimmed == "#---" || trimmed == "!---" {
            if !current.is_empty() {
                sections.push(std::mem::take(&mut current));
            }
        } else {
            current.push((i + 1, line));
        }
    }
    if !current.is_empty() {
        sections.push(current);
    }

    let mut parsed = ParsedFile::default();

    for (index, section) in sections.iter().enumerate() {
        let pairs = parse_section(section, source)?;
        let mut content_map = Mapping::new();
        for (key, value) in pairs {
            let segments = parse_key_path(&key);
            insert_into_map(
                &mut content_map,
                &segments,
                ConfigValue::from_scalar_str(&value),
            );
        }

        match parser::extract_activation(&mut content_map, source, index) {
            Ok((activation, on_cloud_platform)) => {
                if content_map.is_empty() && activation.is_none() {
                    continue;
                }
                let mut doc = ConfigDocument::new(content_map, source, index);
                doc.activation = activation;
                doc.on_cloud_platform = on_cloud_platform;
                parsed.documents.push(doc);
            }
            Err(warning) => parsed.warnings.push(warning),
        }
    }

    Ok(parsed)
}

/// Parse one document's lines into `(key, value)` pairs; a repeated key
/// takes its last value.
fn parse_section(
    lines: &[(usize, &str)],
    source: &Path,
) -> Result<Vec<(String, String)>, ResolverError> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let (line_no, raw) = lines[i];
        let stripped = raw.trim();
        if stripped.is_empty() || stripped.starts_with('#') || stripped.starts_with('!') {
            i += 1;
            continue;
        }

        // Fold continuation lines into one logical line.
        let mut logical = stripped.to_string();
        while ends_with_odd_backslashes(&logical) && i + 1 < lines.len() {
            logical.pop();
            i += 1;
            logical.push_str(lines[i].1.trim());
        }
        if ends_with_odd_backslashes(&logical) {
            logical.pop();
        }
        i += 1;

        let (raw_key, raw_value) = split_property(&logical);
        if raw_key.is_empty() {
            continue;
        }
        let key = unescape(&raw_key, source, line_no)?;
        let value = unescape(&raw_value, source, line_no)?;

        match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => pairs.push((key, value)),
        }
    }

    Ok(pairs)
}

/// Split a logical line at the first unescaped `=`, `:`, or whitespace run.
fn split_property(line: &str) -> (String, String) {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    let mut separator: Option<(usize, char)> = None;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            i += 2;
            continue;
        }
        if c == '=' || c == ':' {
            separator = Some((i, c));
            break;
        }
        if c.is_whitespace() {
            separator = Some((i, ' '));
            break;
        }
        i += 1;
    }

    match separator {
        None => (line.trim().to_string(), String::new()),
        Some((idx, sep)) => {
            let key: String = chars[..idx].iter().collect();
            let mut value: String = chars[idx + 1..]
                .iter()
                .collect::<String>()
                .trim_start()
                .to_string();
            // "key = value" and "key : value" reached via the whitespace arm
            if sep == ' ' && (value.starts_with('=') || value.starts_with(':')) {
                value = value[1..].trim_start().to_string();
            }
            (key.trim().to_string(), value)
        }
    }
}

fn ends_with_odd_backslashes(s: &str) -> bool {
    s.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn unescape(s: &str, source: &Path, line: usize) -> Result<String, ResolverError> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            match chars[i + 1] {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                'f' => out.push('\u{000C}'),
                '\\' => out.push('\\'),
                'u' => {
                    if i + 5 >= chars.len() {
                        return Err(escape_error(source, line, "truncated \\u escape"));
                    }
                    let hex: String = chars[i + 2..i + 6].iter().collect();
                    let code = u32::from_str_radix(&hex, 16).map_err(|_| {
                        escape_error(source, line, &format!("invalid \\u escape '\\u{hex}'"))
                    })?;
                    let ch = char::from_u32(code).ok_or_else(|| {
                        escape_error(source, line, &format!("invalid \\u escape '\\u{hex}'"))
                    })?;
                    out.push(ch);
                    i += 6;
                    continue;
                }
                other => out.push(other),
            }
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    Ok(out)
}

fn escape_error(source: &Path, line: usize, message: &str) -> ResolverError {
    ResolverError::Parse {
        path: source.to_path_buf(),
        line,
        message: message.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Parse a dotted key into segments, handling `[n]` index notation:
/// `server.hosts[0].name` → `[Key(server), Key(hosts), Index(0), Key(name)]`.
fn parse_key_path(key: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = key.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
                match chars[i + 1..].iter().position(|c| *c == ']') {
                    Some(offset) => {
                        let inner: String = chars[i + 1..i + 1 + offset].iter().collect();
                        match inner.parse::<usize>() {
                            Ok(index) => segments.push(Segment::Index(index)),
                            // non-numeric bracket content stays literal
                            Err(_) => current.push_str(&format!("[{inner}]")),
                        }
                        i += offset + 1;
                    }
                    None => current.push('['),
                }
            }
            c => current.push(c),
        }
        i += 1;
    }
    if !current.is_empty() {
        segments.push(Segment::Key(current));
    }

    segments
}

fn insert_into_map(map: &mut Mapping, segments: &[Segment], value: ConfigValue) {
    match segments {
        [] => {}
        [Segment::Key(key)] => {
            map.insert(key.clone(), value);
        }
        [Segment::Key(key), rest @ ..] => {
            let node = map.entry(key.clone()).or_insert_with(|| match rest[0] {
                Segment::Index(_) => ConfigValue::Seq(Vec::new()),
                Segment::Key(_) => ConfigValue::Map(Mapping::new()),
            });
            insert_into_node(node, rest, value);
        }
        // an index at the root has nothing to attach to
        [Segment::Index(_), ..] => {}
    }
}

fn insert_into_node(node: &mut ConfigValue, segments: &[Segment], value: ConfigValue) {
    match segments {
        [] => *node = value,
        [Segment::Key(_), ..] => {
            if !node.is_map() {
                *node = ConfigValue::Map(Mapping::new());
            }
            if let ConfigValue::Map(map) = node {
                insert_into_map(map, segments, value);
            }
        }
        [Segment::Index(index), rest @ ..] => {
            if !node.is_seq() {
                *node = ConfigValue::Seq(Vec::new());
            }
            if let ConfigValue::Seq(items) = node {
                while items.len() <= *index {
                    items.push(ConfigValue::Null);
                }
                if rest.is_empty() {
                    items[*index] = value;
                } else {
                    insert_into_node(&mut items[*index], rest, value);
                }
            }
        }
    }
}
