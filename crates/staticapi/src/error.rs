//! CLI error types.

use staticapi_build::BuildError;
use staticapi_config::ConfigError;
use staticapi_schema::SchemaError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    Build(#[from] BuildError),
}
