use std::path::PathBuf;

/// Errors that can occur across churnlens.
///
/// The aggregation engine itself never fails on data problems; these errors
/// come from repository access, configuration, and serialization. Library
/// crates use this type directly; the binary converts to `miette` reports at
/// the boundary.
///
/// # Examples
///
/// ```
/// use churnlens_core::ChurnError;
///
/// let err = ChurnError::Config("unknown window".into());
/// assert!(err.to_string().contains("unknown window"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ChurnError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// A date string that is neither `YYYY-MM-DD` nor RFC 3339.
    #[error("invalid date '{0}': expected YYYY-MM-DD or RFC 3339")]
    InvalidDate(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
