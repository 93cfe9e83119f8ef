//! Error taxonomy for the kernel adapter.
//!
//! Subprocess exit codes and interruptions are *not* errors: they travel in
//! the reply. Everything here is either malformed input (surfaced to the host
//! as an execution error) or a startup failure.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to read version banner: {0}")]
    Banner(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("module catalog: {0}")]
    Catalog(String),
}

impl KernelError {
    /// Short kind name used as `ename` when an error is reported to the host.
    pub fn kind(&self) -> &'static str {
        match self {
            KernelError::InvalidYaml(_) => "InvalidYaml",
            KernelError::InvalidInput(_) => "InvalidInput",
            KernelError::Spawn { .. } => "SpawnError",
            KernelError::Banner(_) => "BannerError",
            KernelError::Config(_) => "ConfigError",
            KernelError::Catalog(_) => "CatalogError",
        }
    }

    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        KernelError::InvalidInput(msg.into())
    }
}

pub type Result<T, E = KernelError> = std::result::Result<T, E>;
