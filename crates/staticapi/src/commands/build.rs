//! `staticapi build` command implementation.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use staticapi_build::{BuildConfig, Builder};
use staticapi_config::{CliSettings, Config, LinkMode};
use staticapi_schema::Schema;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args, Default)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover staticapi.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Route tree schema file (overrides config).
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Output root directory (overrides config).
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Link derivation mode: relative or absolute (overrides config).
    #[arg(long)]
    link_mode: Option<LinkMode>,

    /// Base URL prepended to links in absolute mode (overrides config).
    #[arg(long, env = "STATICAPI_BASE_URL")]
    base_url: Option<String>,

    /// Write directly into the output directory instead of staging and
    /// renaming into place.
    #[arg(long)]
    in_place: bool,

    /// Enable verbose output (per-document logging).
    #[arg(short, long)]
    pub verbose: bool,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, schema loading, or materialization
    /// fails.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        // Build CLI settings from args
        let cli_settings = CliSettings {
            schema: self.schema,
            out_dir: self.out,
            link_mode: self.link_mode,
            base_url: self.base_url,
            in_place: self.in_place.then_some(true),
        };

        // Load config
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        // Print startup info
        output.info(&format!(
            "Schema: {}",
            config.schema_resolved.path.display()
        ));
        output.info(&format!(
            "Output directory: {}",
            config.output_resolved.dir.display()
        ));
        match config.links.mode {
            LinkMode::Relative => output.info(&format!(
                "Links: relative under {}",
                config.output_resolved.public_root
            )),
            LinkMode::Absolute => output.info(&format!(
                "Links: absolute under {}",
                config.links.base_url.as_deref().unwrap_or_default()
            )),
        }

        let schema = Schema::load(&config.schema_resolved.path)?;

        let started = Instant::now();
        let builder = Builder::new(BuildConfig::from_config(&config));
        let report = builder.build(schema).await?;

        if report.documents == 0 {
            output.warning("Schema root has no routes; nothing was generated");
        } else {
            output.success(&format!(
                "Generated {} documents in {} directories in {:.2?}",
                report.documents,
                report.directories,
                started.elapsed()
            ));
        }

        Ok(())
    }
}
