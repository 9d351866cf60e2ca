//! End-to-end resolver scenarios over real project trees.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use spring_profile_resolver::env::EnvOverlay;
use spring_profile_resolver::model::get_path;
use spring_profile_resolver::output;
use spring_profile_resolver::{
    resolve, ConfigValue, ResolveOptions, ResolverResult, WarningCategory,
};

struct Project {
    dir: TempDir,
    resources: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let resources = dir.path().join("src").join("main").join("resources");
        fs::create_dir_all(&resources).unwrap();
        Project { dir, resources }
    }

    fn file(&self, name: &str, content: &str) -> &Self {
        fs::write(self.resources.join(name), content).unwrap();
        self
    }

    fn options(&self, profiles: &[&str]) -> ResolveOptions {
        ResolveOptions::new(
            self.dir.path(),
            profiles.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn resolve(&self, profiles: &[&str]) -> ResolverResult {
        resolve(&self.options(profiles)).unwrap()
    }
}

fn int_at(result: &ResolverResult, path: &str) -> i64 {
    match get_path(&result.config, path) {
        Some(ConfigValue::Int(i)) => *i,
        other => panic!("expected integer at {path}, got {other:?}"),
    }
}

fn str_at<'a>(result: &'a ResolverResult, path: &str) -> &'a str {
    get_path(&result.config, path)
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| panic!("expected string at {path}"))
}

// S1: basic override between base and profile file.
#[test]
fn basic_override() {
    let project = Project::new();
    project
        .file(
            "application.yml",
            "server:\n  port: 8080\napp:\n  name: demo\n",
        )
        .file("application-prod.yml", "server:\n  port: 80\n");

    let result = project.resolve(&["prod"]);
    assert_eq!(int_at(&result, "server.port"), 80);
    assert_eq!(str_at(&result, "app.name"), "demo");
    assert!(result.sources["server.port"]
        .file
        .ends_with("application-prod.yml"));
    assert!(result.sources["app.name"].file.ends_with("application.yml"));
}

// S2: multi-document activation within one file.
#[test]
fn multi_document_activation() {
    let project = Project::new();
    project.file(
        "application.yml",
        "server:\n  port: 8080\n---\nspring:\n  config:\n    activate:\n      on-profile: dev\nserver:\n  port: 9000\n---\nspring:\n  config:\n    activate:\n      on-profile: prod\nserver:\n  port: 80\n",
    );

    assert_eq!(int_at(&project.resolve(&["dev"]), "server.port"), 9000);
    assert_eq!(int_at(&project.resolve(&["prod"]), "server.port"), 80);
    // prod document is later in the file
    assert_eq!(int_at(&project.resolve(&["dev", "prod"]), "server.port"), 80);
}

// S3: recursive group expansion, parent before members.
#[test]
fn group_expansion() {
    let project = Project::new();
    project.file(
        "application.yml",
        "spring:\n  profiles:\n    group:\n      prod: proddb,prodmq\n      proddb: postgres,hikari\n",
    );

    let result = project.resolve(&["prod"]);
    assert_eq!(
        result.active_profiles,
        vec!["prod", "proddb", "postgres", "hikari", "prodmq"]
    );
}

// S4: group cycles are fatal with exit code 2.
#[test]
fn group_cycle_detection() {
    let project = Project::new();
    project.file(
        "application.yml",
        "spring:\n  profiles:\n    group:\n      a: b\n      b: a\n",
    );

    let err = resolve(&project.options(&["a"])).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    let message = err.to_string();
    assert!(message.contains('a'));
    assert!(message.contains('b'));
}

// S5: placeholder chain with a default.
#[test]
fn placeholder_chain_with_default() {
    let project = Project::new();
    project.file(
        "application.yml",
        "database:\n  host: localhost\n  port: 5432\n  url: jdbc:postgresql://${database.host}:${database.port}/${database.name:app}\n",
    );

    let result = project.resolve(&["default"]);
    assert_eq!(
        str_at(&result, "database.url"),
        "jdbc:postgresql://localhost:5432/app"
    );
    assert!(result
        .warnings
        .iter()
        .all(|w| w.category != WarningCategory::Placeholder));
}

// S6: expression activation.
#[test]
fn expression_activation() {
    let project = Project::new();
    project.file(
        "application.yml",
        "mode: base\n---\nspring:\n  config:\n    activate:\n      on-profile: \"prod & !staging\"\nmode: hardened\n",
    );

    assert_eq!(str_at(&project.resolve(&["prod"]), "mode"), "hardened");
    assert_eq!(
        str_at(&project.resolve(&["prod", "staging"]), "mode"),
        "base"
    );
    assert_eq!(str_at(&project.resolve(&["staging"]), "mode"), "base");
}

#[test]
fn properties_file_participates() {
    let project = Project::new();
    project
        .file("application.yml", "server:\n  port: 8080\n")
        .file(
            "application-prod.properties",
            "server.port=80\nserver.ssl.enabled=true\n",
        );

    let result = project.resolve(&["prod"]);
    assert_eq!(int_at(&result, "server.port"), 80);
    assert_eq!(
        get_path(&result.config, "server.ssl.enabled"),
        Some(&ConfigValue::Bool(true))
    );
}

#[test]
fn multi_document_properties_activation() {
    let project = Project::new();
    project.file(
        "application.properties",
        "server.port=8080\n#---\nspring.config.activate.on-profile=prod\nserver.port=80\n",
    );

    assert_eq!(int_at(&project.resolve(&["prod"]), "server.port"), 80);
    assert_eq!(int_at(&project.resolve(&["dev"]), "server.port"), 8080);
}

#[test]
fn sequences_replace_wholesale() {
    let project = Project::new();
    project
        .file(
            "application.yml",
            "servers:\n  - alpha\n  - beta\n  - gamma\n",
        )
        .file("application-prod.yml", "servers:\n  - delta\n");

    let result = project.resolve(&["prod"]);
    match get_path(&result.config, "servers") {
        Some(ConfigValue::Seq(items)) => {
            assert_eq!(items, &vec![ConfigValue::Str("delta".into())]);
        }
        other => panic!("expected sequence, got {other:?}"),
    }
    assert!(result.sources["servers"].file.ends_with("application-prod.yml"));
}

#[test]
fn imports_splice_after_importing_document() {
    let project = Project::new();
    project
        .file(
            "application.yml",
            "spring:\n  config:\n    import: file:shared.yml\nserver:\n  port: 8080\n",
        )
        .file("shared.yml", "server:\n  port: 7000\nshared:\n  flag: true\n");

    let result = project.resolve(&["default"]);
    // imported document comes after the importer, so it wins
    assert_eq!(int_at(&result, "server.port"), 7000);
    assert_eq!(
        get_path(&result.config, "shared.flag"),
        Some(&ConfigValue::Bool(true))
    );
}

#[test]
fn optional_import_missing_is_warning_only() {
    let project = Project::new();
    project.file(
        "application.yml",
        "spring:\n  config:\n    import: optional:file:absent.yml\nok: 1\n",
    );

    let result = project.resolve(&["default"]);
    assert_eq!(int_at(&result, "ok"), 1);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.category == WarningCategory::Import));
}

#[test]
fn required_import_missing_is_fatal() {
    let project = Project::new();
    project.file(
        "application.yml",
        "spring:\n  config:\n    import: file:absent.yml\n",
    );

    let err = resolve(&project.options(&["default"])).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn import_cycle_is_fatal() {
    let project = Project::new();
    project
        .file(
            "application.yml",
            "spring:\n  config:\n    import: file:a.yml\n",
        )
        .file("a.yml", "spring:\n  config:\n    import: file:application.yml\n");

    let err = resolve(&project.options(&["default"])).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn env_overlay_beats_default_not_tree() {
    let project = Project::new();
    project.file(
        "application.yml",
        "configured: explicit\na: ${configured}\nb: ${only.env:fallback}\n",
    );

    let mut options = project.options(&["default"]);
    options.env = EnvOverlay::from_pairs(&[("CONFIGURED", "from-env"), ("ONLY_ENV", "from-env")]);
    let result = resolve(&options).unwrap();
    // merged tree wins over the environment overlay
    assert_eq!(str_at(&result, "a"), "explicit");
    assert_eq!(str_at(&result, "b"), "from-env");
}

#[test]
fn vcap_services_feed_placeholders() {
    let project = Project::new();
    project.file(
        "application.yml",
        "amqp:\n  uri: ${vcap.services.rabbit.credentials.uri}\n",
    );

    let mut options = project.options(&["default"]);
    options.vcap_services_json = Some(
        r#"{"p.rabbitmq": [{"name": "rabbit", "credentials": {"uri": "amqp://cf-broker"}}]}"#
            .to_string(),
    );
    let result = resolve(&options).unwrap();
    assert_eq!(str_at(&result, "amqp.uri"), "amqp://cf-broker");
    // the vcap namespace itself is not part of the merged output
    assert!(get_path(&result.config, "vcap").is_none());
}

#[test]
fn vcap_reference_without_payload_warns() {
    let project = Project::new();
    project.file(
        "application.yml",
        "amqp:\n  uri: ${vcap.services.rabbit.credentials.uri}\n",
    );

    let result = project.resolve(&["default"]);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.category == WarningCategory::Vcap));

    let mut options = project.options(&["default"]);
    options.ignore_vcap_warnings = true;
    let silenced = resolve(&options).unwrap();
    assert!(silenced
        .warnings
        .iter()
        .all(|w| w.category != WarningCategory::Vcap));
}

#[test]
fn unresolved_placeholder_reported_once_per_path() {
    let project = Project::new();
    project.file(
        "application.yml",
        "a: ${missing.one}\nb: ${missing.one}\n",
    );

    let result = project.resolve(&["default"]);
    let placeholder_warnings: Vec<_> = result
        .warnings
        .iter()
        .filter(|w| w.category == WarningCategory::Placeholder)
        .collect();
    // one per (path, placeholder): paths a and b
    assert_eq!(placeholder_warnings.len(), 2);
    assert_eq!(str_at(&result, "a"), "${missing.one}");
}

#[test]
fn source_coverage_invariant() {
    let project = Project::new();
    project
        .file(
            "application.yml",
            "server:\n  port: 8080\n  ssl:\n    enabled: false\nitems:\n  - 1\n  - 2\n",
        )
        .file(
            "application-prod.yml",
            "server:\n  ssl:\n    enabled: true\nextra: x\n",
        );

    let result = project.resolve(&["prod"]);

    fn walk(map: &spring_profile_resolver::Mapping, prefix: &str, paths: &mut Vec<String>) {
        for (key, value) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                ConfigValue::Map(nested) => walk(nested, &path, paths),
                _ => paths.push(path),
            }
        }
    }
    let mut leaf_paths = Vec::new();
    walk(&result.config, "", &mut leaf_paths);

    for path in &leaf_paths {
        assert!(
            result.sources.contains_key(path),
            "leaf {path} has no source entry"
        );
    }
    assert_eq!(leaf_paths.len(), result.sources.len());
}

#[test]
fn annotated_output_round_trip() {
    let project = Project::new();
    project
        .file(
            "application.yml",
            "server:\n  port: 8080\napp:\n  name: demo\n",
        )
        .file("application-prod.yml", "server:\n  port: 80\n");

    let result = project.resolve(&["prod"]);
    let rendered = output::render(&result, project.dir.path());

    assert!(rendered.contains("port: 80"));
    assert!(rendered.contains("application-prod.yml"));
    assert!(rendered.contains("application.yml"));

    // written file lands under the output directory with the profile name
    let out_dir = project.dir.path().join(".computed");
    let written = output::write_output(
        &result,
        project.dir.path(),
        &out_dir,
        &["prod".to_string()],
    )
    .unwrap();
    assert!(written.ends_with("application-prod-computed.yml"));
    assert_eq!(fs::read_to_string(written).unwrap(), rendered);
}

#[test]
fn unknown_profile_warns_but_succeeds() {
    let project = Project::new();
    project.file("application.yml", "a: 1\n");

    let result = project.resolve(&["nosuch"]);
    assert_eq!(int_at(&result, "a"), 1);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.category == WarningCategory::UnknownProfile));
}

#[test]
fn profile_referenced_by_activation_is_known() {
    let project = Project::new();
    project.file(
        "application.yml",
        "a: 1\n---\nspring:\n  config:\n    activate:\n      on-profile: tuned\na: 2\n",
    );

    let result = project.resolve(&["tuned"]);
    assert_eq!(int_at(&result, "a"), 2);
    assert!(result
        .warnings
        .iter()
        .all(|w| w.category != WarningCategory::UnknownProfile));
}

#[test]
fn full_pipeline_with_groups_activation_and_placeholders() {
    let project = Project::new();
    project
        .file(
            "application.yml",
            concat!(
                "spring:\n",
                "  profiles:\n",
                "    group:\n",
                "      prod: proddb\n",
                "server:\n",
                "  port: 8080\n",
                "database:\n",
                "  host: localhost\n",
                "---\n",
                "spring:\n",
                "  config:\n",
                "    activate:\n",
                "      on-profile: proddb\n",
                "database:\n",
                "  host: db.internal\n",
                "  url: jdbc:postgresql://${database.host}:${database.port:5432}/app\n",
            ),
        )
        .file("application-prod.yml", "server:\n  port: 443\n");

    let result = project.resolve(&["prod"]);
    assert_eq!(result.active_profiles, vec!["prod", "proddb"]);
    assert_eq!(int_at(&result, "server.port"), 443);
    assert_eq!(
        str_at(&result, "database.url"),
        "jdbc:postgresql://db.internal:5432/app"
    );
    assert!(result.sources["database.host"]
        .file
        .ends_with("application.yml"));
    assert_eq!(result.sources["database.host"].document_index, 1);
}

#[test]
fn overridden_paths_tracked_for_output() {
    let project = Project::new();
    project
        .file("application.yml", "server:\n  port: 8080\n")
        .file("application-prod.yml", "server:\n  port: 80\n");

    let result = project.resolve(&["prod"]);
    assert!(result.overridden.contains("server.port"));

    let rendered = output::render(&result, project.dir.path());
    assert!(rendered.contains("(overridden)"));
}

fn touch_dir(path: &Path) {
    fs::create_dir_all(path).unwrap();
}

#[test]
fn test_resources_override_main() {
    let project = Project::new();
    project.file("application.yml", "a: main\nkeep: main\n");
    let test_resources = project.dir.path().join("src").join("test").join("resources");
    touch_dir(&test_resources);
    fs::write(test_resources.join("application.yml"), "a: test\n").unwrap();

    let mut options = project.options(&["default"]);
    options.include_test = true;
    let result = resolve(&options).unwrap();
    assert_eq!(str_at(&result, "a"), "test");
    assert_eq!(str_at(&result, "keep"), "main");

    // without the flag, test resources stay out
    let without = project.resolve(&["default"]);
    assert_eq!(str_at(&without, "a"), "main");
}
