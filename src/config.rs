//! Configuration schema for kavach.
//!
//! Every key is optional. An absent file, or an empty one, yields the
//! built-in defaults.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file names searched for in the working directory, in order.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["kavach.yaml", ".kavach.yaml"];

pub const DEFAULT_MAX_LINE_LENGTH: usize = 120;
pub const DEFAULT_MAX_FILE_LINES: usize = 100;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_BUG_MARKER_PATTERN: &str = "TODO|FIXME|BUG|XXX";
pub const DEFAULT_SUPPRESSION_PATTERN: &str = r"@Suppress|#pragma|nolint|#\[allow";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub lint: LintConfig,
    pub aegis: AegisConfig,
    /// Glob patterns skipped by directory walks (e.g. "**/generated/**").
    pub excluded_paths: Vec<String>,
    /// Override for the session state file location.
    pub session_path: Option<PathBuf>,
    /// `excluded_paths` compiled once by `parse`.
    #[serde(skip)]
    excluded: Option<GlobSet>,
}

/// Thresholds for the per-file lint rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LintConfig {
    pub max_line_length: usize,
    pub max_file_lines: usize,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            max_file_lines: DEFAULT_MAX_FILE_LINES,
        }
    }
}

/// How external tool failures affect the Aegis verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecErrorPolicy {
    /// A tool that cannot run counts as reporting zero findings.
    #[default]
    Lenient,
    /// Exec errors with no fail reasons make the run inconclusive.
    Strict,
}

/// Settings for the Aegis verifier.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AegisConfig {
    /// Per-invocation limit for external tools; 0 disables it.
    pub command_timeout_secs: u64,
    pub exec_error_policy: ExecErrorPolicy,
    pub bug_marker_pattern: String,
    pub suppression_pattern: String,
}

impl Default for AegisConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            exec_error_policy: ExecErrorPolicy::Lenient,
            bug_marker_pattern: DEFAULT_BUG_MARKER_PATTERN.to_string(),
            suppression_pattern: DEFAULT_SUPPRESSION_PATTERN.to_string(),
        }
    }
}

impl Config {
    /// Parse a config from a YAML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        config.excluded = compile_globs(&config.excluded_paths)?;
        Ok(config)
    }

    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Load the config named on the command line, or discover one in `dir`.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::parse_file(path);
        }
        match discover(dir) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using discovered config");
                Self::parse_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.lint.max_line_length == 0 {
            return Err(ConfigError::Invalid(
                "lint.max_line_length must be greater than 0".to_string(),
            ));
        }
        // ripgrep shares the regex crate's syntax.
        for pattern in [&self.aegis.bug_marker_pattern, &self.aegis.suppression_pattern] {
            if pattern.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "aegis search patterns must not be empty".to_string(),
                ));
            }
            regex::Regex::new(pattern).map_err(|e| {
                ConfigError::Invalid(format!("search pattern {:?}: {}", pattern, e))
            })?;
        }
        Ok(())
    }

    /// Check if a path matches any `excluded_paths` glob.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        self.excluded.as_ref().is_some_and(|set| set.is_match(path))
    }
}

fn compile_globs(patterns: &[String]) -> Result<Option<GlobSet>, ConfigError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| ConfigError::Invalid(format!("excluded path {:?}: {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| ConfigError::Invalid(format!("excluded paths: {}", e)))
}

/// Find the first default config file present in `dir`.
fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.lint.max_line_length, 120);
        assert_eq!(config.lint.max_file_lines, 100);
        assert_eq!(config.aegis.command_timeout_secs, 300);
        assert_eq!(config.aegis.exec_error_policy, ExecErrorPolicy::Lenient);
        assert_eq!(config.aegis.bug_marker_pattern, "TODO|FIXME|BUG|XXX");
    }

    #[test]
    fn test_partial_override() {
        let yaml = r#"
lint:
  max_file_lines: 250
aegis:
  exec_error_policy: strict
excluded_paths:
  - "**/generated/**"
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.lint.max_file_lines, 250);
        assert_eq!(config.lint.max_line_length, 120);
        assert_eq!(config.aegis.exec_error_policy, ExecErrorPolicy::Strict);
        assert!(config.is_path_excluded(Path::new("src/generated/api.go")));
        assert!(!config.is_path_excluded(Path::new("src/api.go")));
    }

    #[test]
    fn test_any_excluded_pattern_matches() {
        let yaml = "excluded_paths:\n  - \"**/*.pb.go\"\n  - \"third_party/**\"\n";
        let config = Config::parse(yaml).unwrap();
        assert!(config.is_path_excluded(Path::new("api/user.pb.go")));
        assert!(config.is_path_excluded(Path::new("third_party/lib/x.go")));
        assert!(!config.is_path_excluded(Path::new("api/user.go")));
        assert!(!Config::default().is_path_excluded(Path::new("api/user.pb.go")));
    }

    #[test]
    fn test_rejects_zero_line_length() {
        let err = Config::parse("lint:\n  max_line_length: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_glob() {
        let err = Config::parse("excluded_paths: [\"a[\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_search_pattern() {
        let err = Config::parse("aegis:\n  bug_marker_pattern: \"TODO(\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_discovery() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load(None, temp.path()).is_ok());

        std::fs::write(temp.path().join(".kavach.yaml"), "lint:\n  max_file_lines: 7\n")
            .unwrap();
        let config = Config::load(None, temp.path()).unwrap();
        assert_eq!(config.lint.max_file_lines, 7);
    }
}
