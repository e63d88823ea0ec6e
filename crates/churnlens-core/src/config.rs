use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChurnError;
use crate::types::{parse_date, CoChangeWindow};

/// Top-level configuration loaded from `.churnlens.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use churnlens_core::ChurnConfig;
///
/// let config = ChurnConfig::default();
/// assert!(!config.history.ignore_cloc_zero);
/// assert_eq!(config.output.limit, 20);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChurnConfig {
    /// Which history to read and how to window churn counters.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Co-change analysis settings.
    #[serde(default)]
    pub coupling: CouplingConfig,
    /// Rendering settings for the CLI.
    #[serde(default)]
    pub output: OutputConfig,
}

impl ChurnConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::FileNotFound`] if the file does not exist,
    /// [`ChurnError::Io`] if it cannot be read, or [`ChurnError::Toml`] if the
    /// content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use churnlens_core::ChurnConfig;
    /// use std::path::Path;
    ///
    /// let config = ChurnConfig::from_file(Path::new(".churnlens.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ChurnError> {
        if !path.exists() {
            return Err(ChurnError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use churnlens_core::ChurnConfig;
    ///
    /// let toml = r#"
    /// [history]
    /// ignore_cloc_zero = true
    /// "#;
    /// let config = ChurnConfig::from_toml(toml).unwrap();
    /// assert!(config.history.ignore_cloc_zero);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ChurnError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no analysis can use.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Config`] when `coupling.min_co_changes` or
    /// `output.limit` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use churnlens_core::{ChurnConfig, ChurnError};
    ///
    /// let mut config = ChurnConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.output.limit = 0;
    /// assert!(matches!(config.validate(), Err(ChurnError::Config(_))));
    /// ```
    pub fn validate(&self) -> Result<(), ChurnError> {
        if self.coupling.min_co_changes == 0 {
            return Err(ChurnError::Config(
                "coupling.min_co_changes must be at least 1".into(),
            ));
        }
        if self.output.limit == 0 {
            return Err(ChurnError::Config("output.limit must be at least 1".into()));
        }
        Ok(())
    }
}

/// History selection and churn windowing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Only count churn from commits on or after this date.
    ///
    /// Lifetime metadata (`created`, `lastCommit`) is still tracked for older
    /// commits.
    pub after: Option<String>,
    /// Skip file changes whose lines-of-code count is zero or unknown.
    #[serde(default)]
    pub ignore_cloc_zero: bool,
    /// Branch or ref to walk (default: HEAD).
    pub branch: Option<String>,
    /// Walk every local branch instead of a single ref.
    #[serde(default)]
    pub all_refs: bool,
    /// Attribute first-parent diffs to merge commits.
    #[serde(default)]
    pub include_merge_diffs: bool,
}

impl HistoryConfig {
    /// Resolve the configured `after` string into a UTC cutoff.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::InvalidDate`] when `after` cannot be parsed.
    ///
    /// # Examples
    ///
    /// ```
    /// use churnlens_core::HistoryConfig;
    ///
    /// let config = HistoryConfig { after: Some("2024-01-15".into()), ..Default::default() };
    /// let cutoff = config.cutoff().unwrap().unwrap();
    /// assert_eq!(cutoff.date_naive().to_string(), "2024-01-15");
    /// ```
    pub fn cutoff(&self) -> Result<Option<DateTime<Utc>>, ChurnError> {
        self.after.as_deref().map(parse_date).transpose()
    }
}

/// Co-change (coupling) analysis settings.
///
/// # Examples
///
/// ```
/// use churnlens_core::{CouplingConfig, CoChangeWindow};
///
/// let config = CouplingConfig::default();
/// assert_eq!(config.min_co_changes, 1);
/// assert_eq!(config.window, CoChangeWindow::Commit);
/// assert_eq!(config.large_commit_warning, 500);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingConfig {
    /// Drop pairs that changed together fewer times than this (default: 1).
    #[serde(default = "default_min_co_changes")]
    pub min_co_changes: u32,
    /// How files are grouped into change sets (default: commit).
    #[serde(default)]
    pub window: CoChangeWindow,
    /// Log a warning for change sets with more files than this (default: 500).
    #[serde(default = "default_large_commit_warning")]
    pub large_commit_warning: usize,
}

fn default_min_co_changes() -> u32 {
    1
}

fn default_large_commit_warning() -> usize {
    500
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            min_co_changes: default_min_co_changes(),
            window: CoChangeWindow::default(),
            large_commit_warning: default_large_commit_warning(),
        }
    }
}

/// Rendering settings for text and markdown tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Maximum rows shown per table (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}
