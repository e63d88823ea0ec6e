//! Per-file churn with an optional recent-window cutoff.
//!
//! `created` and `last_commit` always span the file's whole observed life;
//! the counters only include commits on or after the cutoff.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::record::{CommitRecord, FileChangeRecord};

/// Churn statistics for one path.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use churnlens_history::file_churn::FileChurn;
///
/// let when = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let churn = FileChurn {
///     path: "src/lib.rs".into(),
///     cloc: 210,
///     commits: 4,
///     lines_added: 30,
///     lines_deleted: 12,
///     lines_add_del: 42,
///     created: when,
///     last_commit: when,
/// };
/// assert_eq!(churn.lines_add_del, churn.lines_added + churn.lines_deleted);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChurn {
    /// File path relative to repo root.
    pub path: String,
    /// Most recent known lines-of-code count.
    pub cloc: u64,
    /// Commits touching the file inside the window.
    pub commits: u32,
    pub lines_added: u64,
    pub lines_deleted: u64,
    /// `lines_added + lines_deleted`.
    pub lines_add_del: u64,
    /// Earliest committer date seen for the file.
    pub created: DateTime<Utc>,
    /// Latest committer date seen for the file.
    pub last_commit: DateTime<Utc>,
}

/// Filtering and windowing for [`FileChurnAggregator`].
#[derive(Debug, Clone, Default)]
pub struct FileChurnOptions {
    /// Commits before this date only update `created`/`last_commit`.
    pub after: Option<DateTime<Utc>>,
    /// Drop change records whose cloc is zero or unknown.
    pub ignore_cloc_zero: bool,
}

/// Folds commits into an insertion-ordered map of [`FileChurn`].
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use churnlens_history::file_churn::{FileChurnAggregator, FileChurnOptions};
/// use churnlens_history::record::{CommitRecord, FileChangeRecord};
///
/// let commit = CommitRecord {
///     hash: "a".into(),
///     parents: vec![],
///     author: "alice".into(),
///     author_email: String::new(),
///     author_date: Utc::now(),
///     committer_date: Utc::now(),
///     subject: String::new(),
///     files: vec![FileChangeRecord::new("f.ts", Some(5), Some(1), Some(40))],
/// };
///
/// let mut agg = FileChurnAggregator::new(FileChurnOptions::default());
/// agg.add(&commit);
/// let files = agg.finish();
/// assert_eq!(files[0].lines_add_del, 6);
/// ```
#[derive(Debug, Default)]
pub struct FileChurnAggregator {
    options: FileChurnOptions,
    files: IndexMap<String, FileChurn>,
}

impl FileChurnAggregator {
    pub fn new(options: FileChurnOptions) -> Self {
        Self {
            options,
            files: IndexMap::new(),
        }
    }

    /// Fold every file change of `commit`.
    pub fn add(&mut self, commit: &CommitRecord) {
        let when = commit.committer_date;
        let in_window = self.options.after.map_or(true, |cutoff| when >= cutoff);

        for change in &commit.files {
            if !change.passes_cloc_filter(self.options.ignore_cloc_zero) {
                continue;
            }
            self.add_change(change, when, in_window);
        }
    }

    fn add_change(&mut self, change: &FileChangeRecord, when: DateTime<Utc>, in_window: bool) {
        let entry = self
            .files
            .entry(change.path.clone())
            .or_insert_with(|| FileChurn {
                path: change.path.clone(),
                cloc: change.cloc.unwrap_or(0),
                commits: 0,
                lines_added: 0,
                lines_deleted: 0,
                lines_add_del: 0,
                created: when,
                last_commit: when,
            });

        if when >= entry.last_commit {
            // A text change without a count is a deletion; binary changes keep
            // the last known value.
            match change.cloc {
                Some(cloc) => entry.cloc = cloc,
                None if !change.is_binary() => entry.cloc = 0,
                None => {}
            }
            entry.last_commit = when;
        }
        if when < entry.created {
            entry.created = when;
        }

        if in_window {
            entry.commits += 1;
            entry.lines_added += change.added();
            entry.lines_deleted += change.deleted();
            entry.lines_add_del += change.add_del();
        }
    }

    /// Look up the running entry for `path`.
    pub fn get(&self, path: &str) -> Option<&FileChurn> {
        self.files.get(path)
    }

    /// Entries sorted by `lines_add_del` descending; ties keep first-seen order.
    pub fn finish(self) -> Vec<FileChurn> {
        let mut files: Vec<FileChurn> = self.files.into_values().collect();
        files.sort_by(|a, b| b.lines_add_del.cmp(&a.lines_add_del));
        files
    }
}

/// Compute file churn over a whole commit slice.
pub fn file_churn<'a>(
    commits: impl IntoIterator<Item = &'a CommitRecord>,
    options: &FileChurnOptions,
) -> Vec<FileChurn> {
    let mut aggregator = FileChurnAggregator::new(options.clone());
    for commit in commits {
        aggregator.add(commit);
    }
    aggregator.finish()
}
