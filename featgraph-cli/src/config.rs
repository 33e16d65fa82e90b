//! featgraph configuration loading from `.featgraph.toml`.
//!
//! Configuration is optional: featgraph uses defaults if no config file exists
//! or if it cannot be parsed. Command-line flags override anything set here.
//!
//! # Example Configuration
//!
//! ```toml
//! [build]
//! validate = true
//!
//! [output]
//! format = "table"
//! color = true
//! ```

use serde::Deserialize;
use std::path::Path;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = ".featgraph.toml";

/// Root configuration structure loaded from `.featgraph.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct FeatgraphConfig {
    /// Graph building defaults.
    #[serde(default)]
    pub build: BuildConfig,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Defaults for `featgraph build`.
#[derive(Debug, Deserialize)]
pub struct BuildConfig {
    /// Whether built graphs are validated.
    ///
    /// `--no-validate` turns validation off regardless of this setting.
    /// Default: `true`
    #[serde(default = "default_validate")]
    pub validate: bool,
}

fn default_validate() -> bool {
    true
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { validate: true }
    }
}

/// Output formatting preferences.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Default output format: `table` or `json`.
    #[serde(default)]
    pub format: Option<String>,

    /// Whether to use colored output. Auto-detected from the TTY when unset.
    #[serde(default)]
    pub color: Option<bool>,
}

impl FeatgraphConfig {
    /// Load configuration from `.featgraph.toml` in the given directory.
    ///
    /// Read and parse errors are logged as warnings and yield defaults.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILE, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILE, e);
                }
            }
        }
        Self::default()
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Colored output override, `None` for auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }

    pub fn validate_on_build(&self) -> bool {
        self.build.validate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FeatgraphConfig::default();
        assert!(config.validate_on_build());
        assert!(config.default_format().is_none());
        assert!(config.use_color().is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[build]
validate = false

[output]
format = "json"
color = false
"#;
        let config: FeatgraphConfig = toml::from_str(toml_content).unwrap();
        assert!(!config.validate_on_build());
        assert_eq!(config.default_format(), Some("json"));
        assert_eq!(config.use_color(), Some(false));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: FeatgraphConfig = toml::from_str("[output]\nformat = \"table\"\n").unwrap();
        assert!(config.validate_on_build());
        assert_eq!(config.default_format(), Some("table"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeatgraphConfig::load(dir.path());
        assert!(config.validate_on_build());
    }

    #[test]
    fn test_load_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[build\nvalidate = ").unwrap();
        let config = FeatgraphConfig::load(dir.path());
        assert!(config.validate_on_build());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[build]\nvalidate = false\n").unwrap();
        let config = FeatgraphConfig::load(dir.path());
        assert!(!config.validate_on_build());
    }
}
