//! Commit and file-change records consumed by every aggregator.
//!
//! Records are produced once (by [`crate::mining`] or deserialized from JSON)
//! and treated as read-only afterwards.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use churnlens_core::ChurnError;
use serde::{Deserialize, Serialize};

/// One commit with its per-file line changes.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use churnlens_history::record::{CommitRecord, FileChangeRecord};
///
/// let when = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
/// let commit = CommitRecord {
///     hash: "b1".into(),
///     parents: vec!["a0".into()],
///     author: "alice".into(),
///     author_email: "alice@example.com".into(),
///     author_date: when,
///     committer_date: when,
///     subject: "fix: token refresh".into(),
///     files: vec![FileChangeRecord::new("src/auth.rs", Some(4), Some(1), Some(120))],
/// };
/// assert!(!commit.is_merge());
/// assert_eq!(commit.lines_add_del(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Full commit hash.
    pub hash: String,
    /// Parent hashes in order; empty for a root commit.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Author name.
    pub author: String,
    /// Author email.
    #[serde(default)]
    pub author_email: String,
    /// When the change was authored.
    pub author_date: DateTime<Utc>,
    /// When the commit was recorded. All date-based aggregation keys on this.
    pub committer_date: DateTime<Utc>,
    /// First line of the commit message.
    #[serde(default)]
    pub subject: String,
    /// Files changed by this commit.
    #[serde(default)]
    pub files: Vec<FileChangeRecord>,
}

impl CommitRecord {
    /// `true` when the commit has more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Calendar day (UTC) of the committer date.
    pub fn day(&self) -> NaiveDate {
        self.committer_date.date_naive()
    }

    /// Lines added across all files; missing counts are zero.
    pub fn lines_added(&self) -> u64 {
        self.files.iter().map(FileChangeRecord::added).sum()
    }

    /// Lines deleted across all files; missing counts are zero.
    pub fn lines_deleted(&self) -> u64 {
        self.files.iter().map(FileChangeRecord::deleted).sum()
    }

    /// `lines_added + lines_deleted`.
    pub fn lines_add_del(&self) -> u64 {
        self.lines_added() + self.lines_deleted()
    }
}

/// Line changes for a single path within a commit.
///
/// Binary files carry no line counts, so both counters are optional.
///
/// # Examples
///
/// ```
/// use churnlens_history::record::FileChangeRecord;
///
/// let png = FileChangeRecord::new("logo.png", None, None, None);
/// assert!(png.is_binary());
/// assert_eq!(png.add_del(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChangeRecord {
    /// File path relative to the repository root.
    pub path: String,
    /// Lines added, if known.
    pub lines_added: Option<u64>,
    /// Lines deleted, if known.
    pub lines_deleted: Option<u64>,
    /// Lines of code in the file at this revision, if known.
    pub cloc: Option<u64>,
}

impl FileChangeRecord {
    /// Build a record from its parts.
    pub fn new(
        path: impl Into<String>,
        lines_added: Option<u64>,
        lines_deleted: Option<u64>,
        cloc: Option<u64>,
    ) -> Self {
        Self {
            path: path.into(),
            lines_added,
            lines_deleted,
            cloc,
        }
    }

    pub fn added(&self) -> u64 {
        self.lines_added.unwrap_or(0)
    }

    pub fn deleted(&self) -> u64 {
        self.lines_deleted.unwrap_or(0)
    }

    pub fn add_del(&self) -> u64 {
        self.added() + self.deleted()
    }

    /// Neither line counter is known (binary or blob content).
    pub fn is_binary(&self) -> bool {
        self.lines_added.is_none() && self.lines_deleted.is_none()
    }

    /// Whether the record survives the `ignore_cloc_zero` filter.
    pub fn passes_cloc_filter(&self, ignore_cloc_zero: bool) -> bool {
        !ignore_cloc_zero || self.cloc.unwrap_or(0) > 0
    }
}

/// Load an oldest-first JSON array of [`CommitRecord`]s.
///
/// # Errors
///
/// Returns [`ChurnError::FileNotFound`] if `path` does not exist,
/// [`ChurnError::Io`] if it cannot be read, or [`ChurnError::Serialization`]
/// if the content is not a valid record array.
pub fn read_commits(path: &Path) -> Result<Vec<CommitRecord>, ChurnError> {
    if !path.exists() {
        return Err(ChurnError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let commits: Vec<CommitRecord> = serde_json::from_str(&content)?;
    Ok(commits)
}
