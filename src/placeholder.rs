//! `${...}` placeholder resolution over the merged tree.
//!
//! Syntax: `${name}` or `${name:default}`. The `name` is a dot-path that
//! resolves, in order, against the merged tree, the VCAP namespace, and the
//! environment overlay; a default applies when all three miss. Placeholders
//! nest (`${outer.${key}:fallback}`) and resolve innermost-first; a value
//! that expands to another placeholder is resolved in turn.
//!
//! Cycles are caught by tracking the `(path, name)` pairs on the current
//! resolution stack: re-entering a pair leaves the placeholder literal and
//! warns. Whatever is still unresolved after the pass limit is reported
//! once per distinct `(path, placeholder)` and left as-is.

use std::collections::BTreeSet;

use crate::env::EnvOverlay;
use crate::model::{get_path, ConfigValue, Mapping, Warning, WarningCategory};

const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Resolve all placeholders in `config` in place, returning warnings for
/// cycles and anything left unresolved.
pub fn resolve_placeholders(
    config: &mut Mapping,
    vcap: Option<&Mapping>,
    env: &EnvOverlay,
    max_iterations: Option<usize>,
) -> Vec<Warning> {
    let max_iterations = max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
    let mut cycles: BTreeSet<(String, String)> = BTreeSet::new();

    for pass in 0..max_iterations {
        let snapshot = config.clone();
        let ctx = Context {
            root: &snapshot,
            vcap,
            env,
        };
        let changed = resolve_map(config, "", &ctx, &mut cycles);
        tracing::debug!(pass, changed, "placeholder pass complete");
        if !changed {
            break;
        }
    }

    let mut warnings: Vec<Warning> = cycles
        .iter()
        .map(|(path, name)| {
            Warning::new(
                WarningCategory::Placeholder,
                format!("circular placeholder reference '{name}' at {path}; left unresolved"),
            )
        })
        .collect();

    let mut unresolved: BTreeSet<(String, String)> = BTreeSet::new();
    find_unresolved(config, "", &mut unresolved);
    for (path, placeholder) in unresolved {
        if cycles.iter().any(|(p, name)| *p == path && placeholder.contains(name.as_str())) {
            continue;
        }
        warnings.push(Warning::new(
            WarningCategory::Placeholder,
            format!("unresolved placeholder {placeholder} at {path}"),
        ));
    }

    warnings
}

struct Context<'a> {
    root: &'a Mapping,
    vcap: Option<&'a Mapping>,
    env: &'a EnvOverlay,
}

impl Context<'_> {
    /// Lookup order: merged tree, VCAP namespace, environment overlay.
    fn lookup(&self, name: &str) -> Option<String> {
        if let Some(value) = get_path(self.root, name) {
            if let Some(text) = value.substitution_text() {
                return Some(text);
            }
        }
        if let Some(vcap) = self.vcap {
            if let Some(value) = get_path(vcap, name) {
                if let Some(text) = value.substitution_text() {
                    return Some(text);
                }
            }
        }
        self.env.lookup(name).map(|s| s.to_string())
    }
}

fn resolve_map(
    map: &mut Mapping,
    prefix: &str,
    ctx: &Context<'_>,
    cycles: &mut BTreeSet<(String, String)>,
) -> bool {
    let mut changed = false;
    for (key, value) in map.iter_mut() {
        let path = crate::model::join_path(prefix, key);
        changed |= resolve_value(value, &path, ctx, cycles);
    }
    changed
}

fn resolve_value(
    value: &mut ConfigValue,
    path: &str,
    ctx: &Context<'_>,
    cycles: &mut BTreeSet<(String, String)>,
) -> bool {
    match value {
        ConfigValue::Str(s) => {
            if !s.contains("${") {
                return false;
            }
            let mut stack: Vec<(String, String)> = Vec::new();
            let resolved = expand(path, s, ctx, &mut stack, cycles);
            if resolved == *s {
                return false;
            }
            let retyped = retype(s, resolved);
            *value = retyped;
            true
        }
        ConfigValue::Seq(items) => {
            let mut changed = false;
            for (index, item) in items.iter_mut().enumerate() {
                let item_path = format!("{path}[{index}]");
                changed |= resolve_value(item, &item_path, ctx, cycles);
            }
            changed
        }
        ConfigValue::Map(map) => resolve_map(map, path, ctx, cycles),
        _ => false,
    }
}

/// When the whole scalar was a single placeholder, the substituted value
/// takes its natural type; partial substitutions stay strings.
fn retype(original: &str, resolved: String) -> ConfigValue {
    let full_replacement = original.starts_with("${")
        && matching_close(original, 0) == Some(original.len() - 1);
    if full_replacement && !resolved.contains("${") {
        ConfigValue::from_scalar_str(&resolved)
    } else {
        ConfigValue::Str(resolved)
    }
}

/// Expand every placeholder in `text`, recursing into nested names,
/// defaults, and looked-up values.
fn expand(
    path: &str,
    text: &str,
    ctx: &Context<'_>,
    stack: &mut Vec<(String, String)>,
    cycles: &mut BTreeSet<(String, String)>,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while let Some(offset) = text[i..].find("${") {
        let open = i + offset;
        out.push_str(&text[i..open]);

        let Some(close) = matching_close(text, open) else {
            // unterminated placeholder: keep the rest verbatim
            out.push_str(&text[open..]);
            return out;
        };
        let raw = &text[open..=close];
        let inner = &text[open + 2..close];

        // innermost-first: resolve nested placeholders inside the name
        let inner = if inner.contains("${") {
            expand(path, inner, ctx, stack, cycles)
        } else {
            inner.to_string()
        };
        let (name, default) = split_name_default(&inner);

        match ctx.lookup(name) {
            Some(resolved) if resolved.contains("${") => {
                let frame = (path.to_string(), name.to_string());
                if stack.contains(&frame) {
                    cycles.insert(frame);
                    out.push_str(raw);
                } else {
                    stack.push(frame);
                    out.push_str(&expand(path, &resolved, ctx, stack, cycles));
                    stack.pop();
                }
            }
            Some(resolved) => out.push_str(&resolved),
            None => match default {
                Some(default) => out.push_str(&expand(path, default, ctx, stack, cycles)),
                None => out.push_str(raw),
            },
        }

        i = close + 1;
    }

    out.push_str(&text[i..]);
    out
}

/// Index of the `}` closing the `${` that starts at `open`, accounting for
/// nested `${`.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            depth += 1;
            i += 2;
            continue;
        }
        if bytes[i] == b'}' {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Split `name:default` at the first `:` outside any nested `${...}`.
fn split_name_default(inner: &str) -> (&str, Option<&str>) {
    let bytes = inner.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            depth += 1;
            i += 2;
            continue;
        }
        match bytes[i] {
            b'}' if depth > 0 => depth -= 1,
            b':' if depth == 0 => return (&inner[..i], Some(&inner[i + 1..])),
            _ => {}
        }
        i += 1;
    }
    (inner, None)
}

/// Collect every placeholder still present, with its containing path.
fn find_unresolved(map: &Mapping, prefix: &str, out: &mut BTreeSet<(String, String)>) {
    for (key, value) in map {
        let path = crate::model::join_path(prefix, key);
        find_unresolved_in_value(value, &path, out);
    }
}

fn find_unresolved_in_value(value: &ConfigValue, path: &str, out: &mut BTreeSet<(String, String)>) {
    match value {
        ConfigValue::Str(s) => {
            let mut i = 0;
            while let Some(offset) = s[i..].find("${") {
                let open = i + offset;
                match matching_close(s, open) {
                    Some(close) => {
                        out.insert((path.to_string(), s[open..=close].to_string()));
                        i = close + 1;
                    }
                    None => break,
                }
            }
        }
        ConfigValue::Seq(items) => {
            for (index, item) in items.iter().enumerate() {
                find_unresolved_in_value(item, &format!("{path}[{index}]"), out);
            }
        }
        ConfigValue::Map(map) => find_unresolved(map, path, out),
        _ => {}
    }
}
