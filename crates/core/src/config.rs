//! Configuration for jnicheck with per-project overrides.
//!
//! Config priority: project-relative (.jnicheck.toml) > user (~/.config/jnicheck/config.toml) > defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::mangle::{DEFAULT_PREFIX, Mangler};
use crate::matcher::{MatchOptions, Matcher};

/// File name of the project-level config
pub const PROJECT_CONFIG_FILE: &str = ".jnicheck.toml";

/// Report file written under the project root
pub const DEFAULT_REPORT_FILE: &str = "jni_validation_report.txt";

// ============================================================================
// Scan Configuration
// ============================================================================

/// Source discovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
  /// Directory names skipped anywhere in the tree, in addition to the built-in list
  pub exclude_dirs: Vec<String>,

  /// Respect .gitignore, .git/info/exclude and the global gitignore (default: true)
  pub respect_gitignore: bool,

  /// Files larger than this are skipped, in bytes (default: 4MB)
  pub max_file_size: u64,

  /// Worker threads for extraction (default: 0 = available parallelism)
  pub jobs: usize,
}

impl Default for ScanConfig {
  fn default() -> Self {
    Self {
      exclude_dirs: Vec::new(),
      respect_gitignore: true,
      max_file_size: 4 * 1024 * 1024,
      jobs: 0,
    }
  }
}

// ============================================================================
// Mangling Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManglingConfig {
  /// Bridge symbol prefix (default: "Java_")
  pub prefix: String,
}

impl Default for ManglingConfig {
  fn default() -> Self {
    Self {
      prefix: DEFAULT_PREFIX.to_string(),
    }
  }
}

// ============================================================================
// Check Configuration
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
  /// Count a binding as implemented only when a definition (with body) exists (default: false)
  pub require_definitions: bool,

  /// Fail the run when orphaned implementations exist (default: false)
  pub fail_on_orphans: bool,
}

// ============================================================================
// Report Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
  #[default]
  Text,
  Json,
}

impl std::str::FromStr for ReportFormat {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "text" | "txt" => Ok(ReportFormat::Text),
      "json" => Ok(ReportFormat::Json),
      _ => Err(format!("Invalid report format: {}", s)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
  /// Write the report file under the project root (default: true)
  pub write: bool,

  /// Report file name, relative to the project root
  pub file: String,

  /// Report format (default: text)
  pub format: ReportFormat,
}

impl Default for ReportConfig {
  fn default() -> Self {
    Self {
      write: true,
      file: DEFAULT_REPORT_FILE.to_string(),
      format: ReportFormat::Text,
    }
  }
}

// ============================================================================
// Log Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Log level: error, warn, info, debug, trace (default: warn)
  pub level: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "warn".to_string(),
    }
  }
}

// ============================================================================
// Main Configuration
// ============================================================================

/// jnicheck configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Source discovery settings
  pub scan: ScanConfig,

  /// Symbol mangling settings
  pub mangling: ManglingConfig,

  /// Matching and exit-code policy
  pub check: CheckConfig,

  /// Report output settings
  pub report: ReportConfig,

  /// Logging settings
  pub log: LogConfig,
}

impl Config {
  /// Load config for a project, with fallback to user config
  pub fn load_for_project(project_path: &Path) -> Self {
    // Try project-relative first
    let project_config = Self::project_config_path(project_path);
    if project_config.exists()
      && let Ok(content) = std::fs::read_to_string(&project_config)
      && let Ok(config) = toml::from_str(&content)
    {
      return config;
    }

    // Fall back to user config
    if let Some(user_config_path) = Self::user_config_path()
      && user_config_path.exists()
      && let Ok(content) = std::fs::read_to_string(&user_config_path)
      && let Ok(config) = toml::from_str(&content)
    {
      return config;
    }

    Self::default()
  }

  /// Load an explicitly named config file; unlike [`Config::load_for_project`] this fails loudly
  pub fn from_file(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|source| Error::Config {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("JNICHECK_CONFIG_DIR") {
      return Some(PathBuf::from(path).join("config.toml"));
    }

    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
      return Some(PathBuf::from(path).join("jnicheck").join("config.toml"));
    }

    dirs::config_dir().map(|p: PathBuf| p.join("jnicheck").join("config.toml"))
  }

  /// Get the project-relative config path
  pub fn project_config_path(project_path: &Path) -> PathBuf {
    project_path.join(PROJECT_CONFIG_FILE)
  }

  pub fn mangler(&self) -> Mangler {
    Mangler::new(self.mangling.prefix.clone())
  }

  pub fn matcher(&self) -> Matcher {
    Matcher::new(
      self.mangler(),
      MatchOptions {
        require_definitions: self.check.require_definitions,
      },
    )
  }

  /// Serialize the effective config
  pub fn to_toml(&self) -> String {
    toml::to_string_pretty(self).unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.mangling.prefix, "Java_");
    assert_eq!(config.report.file, "jni_validation_report.txt");
    assert_eq!(config.report.format, ReportFormat::Text);
    assert!(config.report.write);
    assert!(config.scan.respect_gitignore);
    assert!(!config.check.require_definitions);
    assert!(!config.check.fail_on_orphans);
    assert_eq!(config.log.level, "warn");
  }

  #[test]
  fn test_load_project_config() {
    let temp = TempDir::new().unwrap();
    let config_content = r#"
[scan]
exclude_dirs = ["third_party"]
jobs = 2

[check]
fail_on_orphans = true

[report]
format = "json"
"#;
    std::fs::write(temp.path().join(PROJECT_CONFIG_FILE), config_content).unwrap();

    let config = Config::load_for_project(temp.path());
    assert_eq!(config.scan.exclude_dirs, vec!["third_party".to_string()]);
    assert_eq!(config.scan.jobs, 2);
    assert!(config.check.fail_on_orphans);
    assert_eq!(config.report.format, ReportFormat::Json);
    // Untouched sections keep their defaults
    assert_eq!(config.mangling.prefix, "Java_");
  }

  #[test]
  fn test_from_file_reports_parse_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    std::fs::write(&path, "[scan\njobs = ").unwrap();

    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
  }

  #[test]
  fn test_from_file_missing_is_io_error() {
    let temp = TempDir::new().unwrap();
    let err = Config::from_file(&temp.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
  }

  #[test]
  fn test_toml_roundtrip() {
    let mut config = Config::default();
    config.mangling.prefix = "Bridge_".to_string();
    config.check.require_definitions = true;

    let parsed: Config = toml::from_str(&config.to_toml()).unwrap();
    assert_eq!(parsed, config);
  }

  #[test]
  fn test_report_format_from_str() {
    assert_eq!("JSON".parse::<ReportFormat>(), Ok(ReportFormat::Json));
    assert_eq!("txt".parse::<ReportFormat>(), Ok(ReportFormat::Text));
    assert!("xml".parse::<ReportFormat>().is_err());
  }

  #[test]
  fn test_mangler_uses_configured_prefix() {
    let mut config = Config::default();
    config.mangling.prefix = "Bridge_".to_string();
    assert_eq!(config.mangler().short_name(&["a".to_string()], "b"), "Bridge_a_b");
  }
}
