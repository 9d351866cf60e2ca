//! Compute the effective configuration of a Spring-Boot-style application
//! for a chosen set of active profiles.
//!
//! Point the resolver at a project tree and a profile list, and it answers
//! the question "what does profile X actually configure?" — the single
//! merged key/value tree the application would observe at runtime, with
//! every leaf annotated with the file that contributed it.
//!
//! ```ignore
//! let options = ResolveOptions::new("/path/to/project", vec!["prod".into()]);
//! let result = resolve(&options)?;
//! println!("{}", output::render(&result, Path::new("/path/to/project")));
//! ```
//!
//! # Pipeline
//!
//! Resolution runs as a fixed, synchronous pipeline:
//!
//! 1. **Discovery** — `application.{yml,yaml,properties}` and
//!    `application-<profile>.*` under `src/main/resources` (plus any extra
//!    roots, plus `src/test/resources` last when requested).
//! 2. **Parsing** — multi-document YAML (`---`) and properties (`#---`)
//!    files become uniform [`ConfigDocument`]s; each document may carry an
//!    activation expression extracted from
//!    `spring.config.activate.on-profile`.
//! 3. **Imports** — `spring.config.import` directives (`file:`,
//!    `classpath:`, `optional:`) splice additional files into the stream
//!    right after the importing document, transitively.
//! 4. **Profile expansion** — `spring.profiles.group.*` tables from the
//!    base documents expand the requested list depth-first (parent before
//!    members, duplicates suppressed, cycles fatal).
//! 5. **Filtering & merge** — applicable documents fold left-to-right into
//!    one tree. Mappings merge key-wise, everything else replaces; a
//!    parallel source map records the origin of every leaf.
//! 6. **Placeholders** — `${name}` / `${name:default}` references resolve
//!    against the merged tree, the Cloud Foundry VCAP namespace, and an
//!    environment overlay, innermost-first, with cycle protection.
//!
//! # Precedence
//!
//! ```text
//! base application.yml            (first document)
//!        ↑ overridden by
//! activated documents             (same file, later documents)
//! application.properties         (properties beat YAML per profile)
//!        ↑ overridden by
//! application-<profile>.*         (active-list order)
//!        ↑ overridden by
//! test resources                  (only with include_test)
//! ```
//!
//! Every layer is sparse: a document only overrides the keys it sets.
//! Sequences are the exception — they replace as a unit, never merge.
//!
//! # Determinism
//!
//! For fixed inputs (file contents, requested profiles, environment
//! overlay) the output tree, source map, and warning list are
//! byte-for-byte reproducible. The environment is read once at CLI
//! startup; nothing else is ambient.
//!
//! # Errors and warnings
//!
//! Hard failures ([`ResolverError`]) carry a process exit code: 1 for
//! input errors (missing project, bad flag values), 2 for configuration
//! errors (malformed files, group/import cycles, missing non-optional
//! imports). Everything recoverable — unresolved placeholders, restriction
//! violations, unknown profiles — accumulates as [`Warning`]s on the
//! [`ResolverResult`] and is reported at the end of the run.

pub mod cli;
pub mod env;
pub mod error;
pub mod expr;
pub mod model;
pub mod output;
pub mod resolve;

mod discover;
mod imports;
mod merge;
mod parser;
mod placeholder;
mod profiles;
mod properties;
mod vcap;

pub use error::ResolverError;
pub use expr::ProfileExpr;
pub use model::{
    ConfigDocument, ConfigSource, ConfigValue, Mapping, ResolverResult, SourceMap, Warning,
    WarningCategory,
};
pub use resolve::{resolve, ResolveOptions};
