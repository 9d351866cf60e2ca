//! Cloud Foundry `VCAP_SERVICES` / `VCAP_APPLICATION` support.
//!
//! Cloud Foundry injects bound-service credentials and application metadata
//! as JSON environment variables. Spring exposes them as properties under
//! `vcap.services.<name>.*` and `vcap.application.*`; this module parses
//! the JSON into a [`Mapping`] that the placeholder engine consults as a
//! lookup namespace. The tree never appears in the merged output.

use crate::model::{ConfigValue, Mapping, Warning, WarningCategory};

/// Build the `vcap.*` namespace from the two JSON payloads.
///
/// Returns `None` when neither payload is present or parseable. Malformed
/// JSON warns and is otherwise ignored, matching the tolerance of the
/// platform itself.
pub fn vcap_namespace(
    services_json: Option<&str>,
    application_json: Option<&str>,
    warnings: &mut Vec<Warning>,
) -> Option<Mapping> {
    let mut vcap = Mapping::new();

    if let Some(services) = services_json.and_then(|json| parse_services(json, warnings)) {
        vcap.insert("services".to_string(), ConfigValue::Map(services));
    }
    if let Some(application) = application_json.and_then(|json| parse_application(json, warnings)) {
        vcap.insert("application".to_string(), ConfigValue::Map(application));
    }

    if vcap.is_empty() {
        return None;
    }
    let mut root = Mapping::new();
    root.insert("vcap".to_string(), ConfigValue::Map(vcap));
    Some(root)
}

/// `VCAP_SERVICES` is keyed by service type, each holding an array of
/// instances; instances are re-keyed by their `name` field.
fn parse_services(json: &str, warnings: &mut Vec<Warning>) -> Option<Mapping> {
    let data = parse_object(json, "VCAP_SERVICES", warnings)?;

    let mut services = Mapping::new();
    for (_service_type, instances) in data {
        let serde_json::Value::Array(instances) = instances else {
            continue;
        };
        for instance in instances {
            let serde_json::Value::Object(instance) = instance else {
                continue;
            };
            let Some(name) = instance.get("name").and_then(|n| n.as_str()) else {
                continue;
            };
            let name = name.to_string();
            services.insert(name, json_to_value(serde_json::Value::Object(instance)));
        }
    }

    if services.is_empty() {
        None
    } else {
        Some(services)
    }
}

fn parse_application(json: &str, warnings: &mut Vec<Warning>) -> Option<Mapping> {
    let data = parse_object(json, "VCAP_APPLICATION", warnings)?;
    if data.is_empty() {
        return None;
    }
    match json_to_value(serde_json::Value::Object(data)) {
        ConfigValue::Map(map) => Some(map),
        _ => None,
    }
}

fn parse_object(
    json: &str,
    label: &str,
    warnings: &mut Vec<Warning>,
) -> Option<serde_json::Map<String, serde_json::Value>> {
    match serde_json::from_str::<serde_json::Value>(json) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        Ok(_) => {
            warnings.push(Warning::new(
                WarningCategory::Vcap,
                format!("{label} is not a JSON object; ignored"),
            ));
            None
        }
        Err(e) => {
            warnings.push(Warning::new(
                WarningCategory::Vcap,
                format!("{label} is not valid JSON ({e}); ignored"),
            ));
            None
        }
    }
}

fn json_to_value(value: serde_json::Value) -> ConfigValue {
    match value {
        serde_json::Value::Null => ConfigValue::Null,
        serde_json::Value::Bool(b) => ConfigValue::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ConfigValue::Int(i)
            } else {
                ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => ConfigValue::Str(s),
        serde_json::Value::Array(items) => {
            ConfigValue::Seq(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => {
            let mut out = Mapping::new();
            for (key, value) in map {
                out.insert(key, json_to_value(value));
            }
            ConfigValue::Map(out)
        }
    }
}

/// Warn when the configuration references `vcap.*` placeholders but no
/// VCAP payload is available — those placeholders will not resolve in
/// local development.
pub fn availability_warnings(config: &Mapping, vcap_available: bool) -> Vec<Warning> {
    if vcap_available {
        return Vec::new();
    }

    let mut refs = Vec::new();
    collect_vcap_refs(config, &mut refs);
    if refs.is_empty() {
        return Vec::new();
    }

    let services = refs.iter().filter(|r| r.starts_with("vcap.services.")).count();
    let application = refs
        .iter()
        .filter(|r| r.starts_with("vcap.application."))
        .count();

    let mut warnings = Vec::new();
    if services > 0 {
        warnings.push(Warning::new(
            WarningCategory::Vcap,
            format!(
                "configuration references {services} VCAP_SERVICES propert{} but \
                 VCAP_SERVICES is not available; these placeholders will not resolve",
                if services == 1 { "y" } else { "ies" }
            ),
        ));
    }
    if application > 0 {
        warnings.push(Warning::new(
            WarningCategory::Vcap,
            format!(
                "configuration references {application} VCAP_APPLICATION propert{} but \
                 VCAP_APPLICATION is not available; these placeholders will not resolve",
                if application == 1 { "y" } else { "ies" }
            ),
        ));
    }
    warnings
}

fn collect_vcap_refs(map: &Mapping, refs: &mut Vec<String>) {
    for value in map.values() {
        collect_vcap_refs_in_value(value, refs);
    }
}

fn collect_vcap_refs_in_value(value: &ConfigValue, refs: &mut Vec<String>) {
    match value {
        ConfigValue::Str(s) => {
            let mut rest = s.as_str();
            while let Some(start) = rest.find("${vcap.") {
                let tail = &rest[start + 2..];
                let end = tail
                    .find(|c: char| c == '}' || c == ':')
                    .unwrap_or(tail.len());
                refs.push(tail[..end].to_string());
                rest = &rest[start + 2..];
            }
        }
        ConfigValue::Seq(items) => {
            for item in items {
                collect_vcap_refs_in_value(item, refs);
            }
        }
        ConfigValue::Map(map) => collect_vcap_refs(map, refs),
        _ => {}
    }
}
