use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a resolver run.
///
/// Recoverable conditions (unresolved placeholders, restriction violations,
/// unknown profiles) are reported as [`Warning`](crate::model::Warning)s on
/// the result instead.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Project path not found: {path}")]
    ProjectNotFound { path: PathBuf },

    #[error("At least one profile must be requested")]
    NoProfiles,

    #[error("Invalid environment override '{entry}' — expected KEY=VALUE")]
    InvalidEnvOverride { entry: String },

    #[error("Failed to read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path} (line {line}): {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Circular profile group: {}", .chain.join(" -> "))]
    CircularProfileGroup { chain: Vec<String> },

    #[error("Circular import of {path} (import chain: {})", format_chain(.chain))]
    CircularImport { path: PathBuf, chain: Vec<PathBuf> },

    #[error("Imported file not found: {location} (imported from {from})")]
    ImportNotFound { location: String, from: PathBuf },
}

impl ResolverError {
    /// Process exit code for this error: 1 for user/input errors, 2 for
    /// configuration errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            ResolverError::ProjectNotFound { .. }
            | ResolverError::NoProfiles
            | ResolverError::InvalidEnvOverride { .. }
            | ResolverError::EnvFile { .. } => 1,
            ResolverError::Io { .. }
            | ResolverError::Parse { .. }
            | ResolverError::CircularProfileGroup { .. }
            | ResolverError::CircularImport { .. }
            | ResolverError::ImportNotFound { .. } => 2,
        }
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
