//! Command-line surface.
//!
//! The clap derive struct is a thin shell: [`run`] converts parsed
//! arguments into [`ResolveOptions`], ingests the environment exactly once
//! (env files, process environment, explicit overrides, VCAP payloads),
//! runs the pipeline, and writes or prints the annotated output. All logic
//! below that point is CLI-free and lives in [`resolve`](crate::resolve).

use std::path::PathBuf;

use clap::Parser;

use crate::env::{self, EnvOverlay};
use crate::error::ResolverError;
use crate::model::Warning;
use crate::output;
use crate::resolve::{self, ResolveOptions};

/// Compute the effective Spring Boot configuration for a set of profiles.
#[derive(Debug, Parser)]
#[command(name = "spring-profile-resolver", version)]
pub struct Cli {
    /// Path to the Spring Boot project root.
    pub project_path: PathBuf,

    /// Comma-separated list of profiles to activate.
    #[arg(short, long)]
    pub profiles: String,

    /// Comma-separated extra resource roots, relative to the project.
    #[arg(short, long)]
    pub resources: Option<String>,

    /// Also load src/test/resources (applied last).
    #[arg(short = 't', long)]
    pub include_test: bool,

    /// Output directory (default: .computed/).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write to stdout instead of a file.
    #[arg(long)]
    pub stdout: bool,

    /// KEY=VAL file(s) for placeholder resolution; later files win.
    #[arg(long = "env-file", value_name = "PATH")]
    pub env_files: Vec<PathBuf>,

    /// Explicit environment override (repeatable).
    #[arg(long = "env", value_name = "KEY=VAL")]
    pub env: Vec<String>,

    /// Ignore the process environment during placeholder resolution.
    #[arg(long)]
    pub no_system_env: bool,

    /// JSON file standing in for the VCAP_SERVICES environment variable.
    #[arg(long, value_name = "PATH")]
    pub vcap_services_file: Option<PathBuf>,

    /// JSON file standing in for the VCAP_APPLICATION environment variable.
    #[arg(long, value_name = "PATH")]
    pub vcap_application_file: Option<PathBuf>,

    /// Suppress warnings about unavailable VCAP environment variables.
    #[arg(long)]
    pub ignore_vcap: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Convert parsed arguments into pipeline options, reading the
    /// environment and any referenced files.
    pub fn into_options(self) -> Result<(ResolveOptions, OutputTarget), ResolverError> {
        let profiles: Vec<String> = self
            .profiles
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if profiles.is_empty() {
            return Err(ResolverError::NoProfiles);
        }

        let resource_dirs: Vec<String> = self
            .resources
            .as_deref()
            .map(|csv| {
                csv.split(',')
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let system_vars: Vec<(String, String)> = if self.no_system_env {
            Vec::new()
        } else {
            std::env::vars().collect()
        };
        let overrides = env::parse_env_pairs(&self.env)?;
        let overlay = EnvOverlay::build(&self.env_files, system_vars, overrides)?;

        let vcap_services_json = read_vcap(self.vcap_services_file.as_deref(), "VCAP_SERVICES")?;
        let vcap_application_json =
            read_vcap(self.vcap_application_file.as_deref(), "VCAP_APPLICATION")?;

        let options = ResolveOptions {
            project_path: self.project_path,
            profiles,
            resource_dirs,
            include_test: self.include_test,
            env: overlay,
            vcap_services_json,
            vcap_application_json,
            ignore_vcap_warnings: self.ignore_vcap,
            max_placeholder_iterations: None,
        };

        let target = if self.stdout {
            OutputTarget::Stdout
        } else {
            OutputTarget::Directory(
                self.output
                    .unwrap_or_else(|| PathBuf::from(".computed")),
            )
        };

        Ok((options, target))
    }
}

/// Where the rendered configuration goes.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputTarget {
    Stdout,
    Directory(PathBuf),
}

fn read_vcap(
    file: Option<&std::path::Path>,
    env_var: &str,
) -> Result<Option<String>, ResolverError> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map(Some)
            .map_err(|e| ResolverError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        None => Ok(std::env::var(env_var).ok()),
    }
}

/// Run the full pipeline for parsed arguments. Returns the accumulated
/// warnings for the caller to report.
pub fn run(cli: Cli) -> Result<Vec<Warning>, ResolverError> {
    let requested_profiles: Vec<String> = cli
        .profiles
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    let (options, target) = cli.into_options()?;
    let project_root = options.project_path.clone();

    let result = resolve::resolve(&options)?;

    match target {
        OutputTarget::Stdout => {
            print!("{}", output::render(&result, &project_root));
        }
        OutputTarget::Directory(dir) => {
            let path = output::write_output(&result, &project_root, &dir, &requested_profiles)?;
            eprintln!("Configuration written to {}", path.display());
        }
    }

    Ok(result.warnings)
}

/// Print warnings to stderr, grouped by category.
pub fn report_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    let mut categories: Vec<_> = warnings.iter().map(|w| w.category).collect();
    categories.sort();
    categories.dedup();

    eprintln!();
    for category in categories {
        eprintln!("Warnings ({}):", category.label());
        for warning in warnings.iter().filter(|w| w.category == category) {
            eprintln!("  - {}", warning.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WarningCategory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn minimal_invocation() {
        let cli = parse(&["spring-profile-resolver", "/proj", "--profiles", "prod"]);
        assert_eq!(cli.project_path, PathBuf::from("/proj"));
        assert_eq!(cli.profiles, "prod");
        assert!(!cli.include_test);
        assert!(!cli.stdout);
    }

    #[test]
    fn short_flags() {
        let cli = parse(&[
            "spring-profile-resolver",
            "/proj",
            "-p",
            "prod,aws",
            "-r",
            "config,shared",
            "-t",
            "-o",
            "out",
        ]);
        assert_eq!(cli.profiles, "prod,aws");
        assert_eq!(cli.resources.as_deref(), Some("config,shared"));
        assert!(cli.include_test);
        assert_eq!(cli.output, Some(PathBuf::from("out")));
    }

    #[test]
    fn repeatable_env_flags() {
        let cli = parse(&[
            "spring-profile-resolver",
            "/proj",
            "-p",
            "prod",
            "--env",
            "A=1",
            "--env",
            "B=2",
            "--env-file",
            "a.env",
            "--env-file",
            "b.env",
        ]);
        assert_eq!(cli.env, vec!["A=1", "B=2"]);
        assert_eq!(
            cli.env_files,
            vec![PathBuf::from("a.env"), PathBuf::from("b.env")]
        );
    }

    #[test]
    fn profiles_flag_is_required() {
        assert!(Cli::try_parse_from(["spring-profile-resolver", "/proj"]).is_err());
    }

    #[test]
    fn blank_profile_csv_is_user_error() {
        let cli = parse(&["spring-profile-resolver", "/proj", "--profiles", " , "]);
        let err = cli.into_options().unwrap_err();
        assert!(matches!(err, ResolverError::NoProfiles));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn invalid_env_pair_is_user_error() {
        let cli = parse(&[
            "spring-profile-resolver",
            "/proj",
            "-p",
            "prod",
            "--env",
            "MISSING_EQUALS",
        ]);
        let err = cli.into_options().unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn default_output_directory() {
        let cli = parse(&["spring-profile-resolver", "/proj", "-p", "prod"]);
        let (_, target) = cli.into_options().unwrap();
        assert_eq!(target, OutputTarget::Directory(PathBuf::from(".computed")));
    }

    #[test]
    fn stdout_target() {
        let cli = parse(&["spring-profile-resolver", "/proj", "-p", "prod", "--stdout"]);
        let (_, target) = cli.into_options().unwrap();
        assert_eq!(target, OutputTarget::Stdout);
    }

    #[test]
    fn verbose_counts() {
        let cli = parse(&["spring-profile-resolver", "/proj", "-p", "prod", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn report_warnings_groups_by_category() {
        // smoke test: must not panic on an empty or mixed list
        report_warnings(&[]);
        report_warnings(&[
            Warning::new(WarningCategory::Placeholder, "one"),
            Warning::new(WarningCategory::Restriction, "two"),
            Warning::new(WarningCategory::Placeholder, "three"),
        ]);
    }
}
