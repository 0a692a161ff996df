//! Configuration management for staticapi.
//!
//! Parses `staticapi.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `links.base_url`
//! - `links.root`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override schema file path.
    pub schema: Option<PathBuf>,
    /// Override output root directory.
    pub out_dir: Option<PathBuf>,
    /// Override link derivation mode.
    pub link_mode: Option<LinkMode>,
    /// Override base URL for absolute links.
    pub base_url: Option<String>,
    /// Override in-place output flag.
    pub in_place: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "staticapi.toml";

/// Default schema file, relative to the config directory.
const DEFAULT_SCHEMA_PATH: &str = "schema.json";

/// Default output root, relative to the config directory.
const DEFAULT_OUT_DIR: &str = "./static";

/// Default bound on simultaneously open filesystem operations.
const DEFAULT_MAX_OPEN_FILES: usize = 128;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema configuration (paths are relative strings from TOML).
    schema: SchemaConfigRaw,
    /// Output configuration (paths are relative strings from TOML).
    output: OutputConfigRaw,
    /// Link derivation configuration.
    pub links: LinksConfig,

    /// Resolved schema configuration (set after loading).
    #[serde(skip)]
    pub schema_resolved: SchemaConfig,
    /// Resolved output configuration (set after loading).
    #[serde(skip)]
    pub output_resolved: OutputConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// How document links are derived for generated `content` summaries.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Same-origin fetch paths under the public root (e.g.
    /// `./static/users.json`).
    #[default]
    Relative,
    /// Base URL plus the public root path (e.g.
    /// `https://api.example.com/static/users.json`).
    Absolute,
}

impl std::str::FromStr for LinkMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "relative" => Ok(Self::Relative),
            "absolute" => Ok(Self::Absolute),
            other => Err(format!(
                "unknown link mode '{other}' (expected 'relative' or 'absolute')"
            )),
        }
    }
}

impl std::fmt::Display for LinkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Relative => f.write_str("relative"),
            Self::Absolute => f.write_str("absolute"),
        }
    }
}

/// Raw schema configuration as parsed from TOML (paths as strings).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SchemaConfigRaw {
    path: Option<String>,
}

/// Resolved schema configuration with absolute paths.
#[derive(Debug, Default)]
pub struct SchemaConfig {
    /// Route tree schema file.
    pub path: PathBuf,
}

/// Raw output configuration as parsed from TOML (paths as strings).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OutputConfigRaw {
    dir: Option<String>,
    in_place: Option<bool>,
    max_open_files: Option<usize>,
}

/// Resolved output configuration.
#[derive(Debug)]
pub struct OutputConfig {
    /// Directory under which the mirrored tree is created.
    pub dir: PathBuf,
    /// Public path at which the output root is served. Prefixed to every
    /// generated link. Defaults to the output dir as configured.
    pub public_root: String,
    /// Write directly into `dir` instead of staging and renaming into place.
    pub in_place: bool,
    /// Bound on simultaneously open filesystem operations during the build.
    pub max_open_files: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::new(),
            public_root: DEFAULT_OUT_DIR.to_owned(),
            in_place: false,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
        }
    }
}

/// Link derivation configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Link derivation mode.
    pub mode: LinkMode,
    /// Base URL prepended to links in absolute mode. Required then, unused
    /// otherwise.
    pub base_url: Option<String>,
    /// Public root override. When unset, links use the output dir as
    /// configured (e.g. an output dir of `./static` yields
    /// `./static/users.json`).
    pub root: Option<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`links.base_url`").
        field: String,
        /// Error message (e.g., "${`API_BASE_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Normalize a configured path into a public link root: forward slashes, no
/// trailing slash.
fn normalize_public_root(root: &str) -> String {
    root.replace('\\', "/").trim_end_matches('/').to_owned()
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `staticapi.toml` in current directory and
    /// parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing
    /// CLI arguments to take precedence over config file values. Validation
    /// runs last, over the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the effective configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(schema) = &settings.schema {
            self.schema_resolved.path.clone_from(schema);
        }
        if let Some(out_dir) = &settings.out_dir {
            self.output_resolved.dir.clone_from(out_dir);
            // The CLI output path also becomes the public link root unless
            // the config pinned one explicitly.
            if self.links.root.is_none() {
                self.output_resolved.public_root =
                    normalize_public_root(&out_dir.to_string_lossy());
            }
        }
        if let Some(mode) = settings.link_mode {
            self.links.mode = mode;
        }
        if let Some(base_url) = &settings.base_url {
            self.links.base_url = Some(base_url.clone());
        }
        if let Some(in_place) = settings.in_place {
            self.output_resolved.in_place = in_place;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        let mut config = Self {
            schema: SchemaConfigRaw::default(),
            output: OutputConfigRaw::default(),
            links: LinksConfig::default(),
            schema_resolved: SchemaConfig::default(),
            output_resolved: OutputConfig::default(),
            config_path: None,
        };
        config.resolve_paths(base);
        config
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically at the end of [`Config::load`], after CLI
    /// settings have been applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.links.mode == LinkMode::Absolute {
            let base_url = self.links.base_url.as_deref().ok_or_else(|| {
                ConfigError::Validation(
                    "links.base_url is required when links.mode is 'absolute'".to_owned(),
                )
            })?;
            require_non_empty(base_url, "links.base_url")?;
            require_http_url(base_url, "links.base_url")?;
        }

        // A zero bound would stall the first filesystem operation forever
        if self.output_resolved.max_open_files == 0 {
            return Err(ConfigError::Validation(
                "output.max_open_files cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref base_url) = self.links.base_url {
            self.links.base_url = Some(expand::expand_env(base_url, "links.base_url")?);
        }
        if let Some(ref root) = self.links.root {
            self.links.root = Some(expand::expand_env(root, "links.root")?);
        }
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| {
            let raw = path.unwrap_or(default);
            config_dir.join(raw.strip_prefix("./").unwrap_or(raw))
        };

        self.schema_resolved = SchemaConfig {
            path: resolve(self.schema.path.as_deref(), DEFAULT_SCHEMA_PATH),
        };

        let raw_dir = self.output.dir.as_deref().unwrap_or(DEFAULT_OUT_DIR);
        self.output_resolved = OutputConfig {
            dir: resolve(self.output.dir.as_deref(), DEFAULT_OUT_DIR),
            public_root: self
                .links
                .root
                .as_deref()
                .map_or_else(|| normalize_public_root(raw_dir), normalize_public_root),
            in_place: self.output.in_place.unwrap_or(false),
            max_open_files: self.output.max_open_files.unwrap_or(DEFAULT_MAX_OPEN_FILES),
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));

        assert_eq!(config.schema_resolved.path, PathBuf::from("/test/schema.json"));
        assert_eq!(config.output_resolved.dir, PathBuf::from("/test/static"));
        assert_eq!(config.output_resolved.public_root, "./static");
        assert!(!config.output_resolved.in_place);
        assert_eq!(config.output_resolved.max_open_files, 128);
        assert_eq!(config.links.mode, LinkMode::Relative);
        assert_eq!(config.links.base_url, None);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.links.mode, LinkMode::Relative);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[schema]
path = "routes/schema.json"

[output]
dir = "/srv/static"
in_place = true
max_open_files = 32

[links]
mode = "absolute"
base_url = "https://api.example.com"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.schema_resolved.path,
            PathBuf::from("/project/routes/schema.json")
        );
        assert_eq!(config.output_resolved.dir, PathBuf::from("/srv/static"));
        assert_eq!(config.output_resolved.public_root, "/srv/static");
        assert!(config.output_resolved.in_place);
        assert_eq!(config.output_resolved.max_open_files, 32);
        assert_eq!(config.links.mode, LinkMode::Absolute);
        assert_eq!(
            config.links.base_url.as_deref(),
            Some("https://api.example.com")
        );
    }

    #[test]
    fn test_links_root_overrides_public_root() {
        let toml = r#"
[output]
dir = "./static"

[links]
root = "/static"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.output_resolved.dir, PathBuf::from("/project/static"));
        assert_eq!(config.output_resolved.public_root, "/static");
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staticapi.toml");
        std::fs::write(&path, "[output]\ndir = \"out\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.output_resolved.dir, dir.path().join("out"));
        assert_eq!(config.output_resolved.public_root, "out");
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();

        let err = Config::load(Some(&dir.path().join("absent.toml")), None).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_cli_settings_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staticapi.toml");
        std::fs::write(&path, "[output]\ndir = \"from-config\"\n").unwrap();

        let settings = CliSettings {
            schema: Some(PathBuf::from("/cli/schema.json")),
            out_dir: Some(PathBuf::from("/cli/static")),
            link_mode: Some(LinkMode::Absolute),
            base_url: Some("https://cli.example.com".to_owned()),
            in_place: Some(true),
        };
        let config = Config::load(Some(&path), Some(&settings)).unwrap();

        assert_eq!(config.schema_resolved.path, PathBuf::from("/cli/schema.json"));
        assert_eq!(config.output_resolved.dir, PathBuf::from("/cli/static"));
        assert_eq!(config.output_resolved.public_root, "/cli/static");
        assert_eq!(config.links.mode, LinkMode::Absolute);
        assert_eq!(
            config.links.base_url.as_deref(),
            Some("https://cli.example.com")
        );
        assert!(config.output_resolved.in_place);
    }

    #[test]
    fn test_cli_out_dir_respects_pinned_links_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staticapi.toml");
        std::fs::write(&path, "[links]\nroot = \"/api\"\n").unwrap();

        let settings = CliSettings {
            out_dir: Some(PathBuf::from("/elsewhere/static")),
            ..CliSettings::default()
        };
        let config = Config::load(Some(&path), Some(&settings)).unwrap();

        assert_eq!(config.output_resolved.public_root, "/api");
    }

    #[test]
    fn test_absolute_mode_requires_base_url() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.links.mode = LinkMode::Absolute;

        let err = config.validate().unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_absolute_mode_requires_http_scheme() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.links.mode = LinkMode::Absolute;
        config.links.base_url = Some("ftp://api.example.com".to_owned());

        let err = config.validate().unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_zero_max_open_files_is_rejected() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.output_resolved.max_open_files = 0;

        let err = config.validate().unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_base_url_env_expansion() {
        // SAFETY: test-only variable with a name unique to this test.
        unsafe { std::env::set_var("STATICAPI_TEST_CONFIG_BASE", "https://env.example.com") };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staticapi.toml");
        std::fs::write(
            &path,
            "[links]\nmode = \"absolute\"\nbase_url = \"${STATICAPI_TEST_CONFIG_BASE}\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(
            config.links.base_url.as_deref(),
            Some("https://env.example.com")
        );
    }

    #[test]
    fn test_link_mode_from_str() {
        assert_eq!("relative".parse::<LinkMode>().unwrap(), LinkMode::Relative);
        assert_eq!("absolute".parse::<LinkMode>().unwrap(), LinkMode::Absolute);
        assert!("RELATIVE".parse::<LinkMode>().is_err());
    }
}
