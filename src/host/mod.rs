//! Capabilities the embedding host lends to the core.
//!
//! The interpreter never spawns processes or touches the filesystem itself.
//! Shell execution and alias-package handling go through the [`Host`]
//! trait, and the grammar checker defers to an [`Authority`] when one is
//! available. Every method reports [`HostError::Unavailable`] instead of
//! failing hard when the host cannot provide it.
//!
//! ```text
//! Interpreter ──int exec/shell/load/pack/run──▶ Arc<dyn Host>
//!                                                 ├─ NoHost    (nothing available)
//!                                                 └─ LocalHost (sh -c, local files)
//! Checker ──check_with──▶ &dyn Authority
//!                           └─ ExternalCompiler (`geneia --check <file>`)
//! ```

mod compiler;
mod local;

pub use compiler::ExternalCompiler;
pub use local::LocalHost;

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;

use crate::checker::CheckResult;

pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("capability unavailable")]
    Unavailable,
    #[error("{0}")]
    Failed(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("timed out after {0} ms")]
    Timeout(u64),
}

impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> Self {
        HostError::Io(err.to_string())
    }
}

/// What a shell command produced. `success` mirrors the process status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    pub success: bool,
    pub output: String,
}

impl ShellOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// One command executed from a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageStep {
    pub name: String,
    pub output: String,
}

#[async_trait]
pub trait Host: Send + Sync {
    async fn shell(&self, _command: &str) -> HostResult<ShellOutput> {
        Err(HostError::Unavailable)
    }

    /// Reads an alias config file into `name -> body`.
    async fn load_config(&self, _path: &str) -> HostResult<IndexMap<String, String>> {
        Err(HostError::Unavailable)
    }

    async fn pack(&self, _config_path: &str, _output_path: &str) -> HostResult<()> {
        Err(HostError::Unavailable)
    }

    async fn run_package(&self, _path: &str) -> HostResult<Vec<PackageStep>> {
        Err(HostError::Unavailable)
    }
}

/// A host that provides nothing; every delegated statement takes its
/// fallback path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHost;

impl Host for NoHost {}

/// A stricter checker the grammar checker defers to for errors.
#[async_trait]
pub trait Authority: Send + Sync {
    async fn check(&self, source: &str, filename: Option<&str>) -> HostResult<CheckResult>;
}

/// Stands in when no authoritative compiler is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAuthority;

#[async_trait]
impl Authority for NoAuthority {
    async fn check(&self, _source: &str, _filename: Option<&str>) -> HostResult<CheckResult> {
        Err(HostError::Unavailable)
    }
}
