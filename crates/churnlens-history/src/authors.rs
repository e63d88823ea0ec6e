//! Per-author churn and activity bounds.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::record::CommitRecord;

/// Lines and commits attributed to one author.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use churnlens_history::authors::AuthorChurn;
///
/// let first = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
/// let last = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let churn = AuthorChurn {
///     author_name: "alice".into(),
///     lines_added: 120,
///     lines_deleted: 30,
///     lines_add_del: 150,
///     commits: 12,
///     first_commit: first,
///     last_commit: last,
/// };
/// assert!(churn.first_commit <= churn.last_commit);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorChurn {
    pub author_name: String,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub lines_add_del: u64,
    pub commits: u32,
    /// Earliest committer date among the author's commits.
    pub first_commit: DateTime<Utc>,
    /// Latest committer date among the author's commits.
    pub last_commit: DateTime<Utc>,
}

/// Folds commits into per-author totals keyed by author name.
#[derive(Debug, Default)]
pub struct AuthorChurnAggregator {
    authors: IndexMap<String, AuthorChurn>,
}

impl AuthorChurnAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, commit: &CommitRecord) {
        let when = commit.committer_date;
        let entry = self
            .authors
            .entry(commit.author.clone())
            .or_insert_with(|| AuthorChurn {
                author_name: commit.author.clone(),
                lines_added: 0,
                lines_deleted: 0,
                lines_add_del: 0,
                commits: 0,
                first_commit: when,
                last_commit: when,
            });

        let added = commit.lines_added();
        let deleted = commit.lines_deleted();
        entry.lines_added += added;
        entry.lines_deleted += deleted;
        entry.lines_add_del += added + deleted;
        entry.commits += 1;
        entry.first_commit = entry.first_commit.min(when);
        entry.last_commit = entry.last_commit.max(when);
    }

    /// Authors sorted by `lines_add_del` descending; ties keep first-seen
    /// order.
    pub fn finish(self) -> Vec<AuthorChurn> {
        let mut authors: Vec<AuthorChurn> = self.authors.into_values().collect();
        authors.sort_by(|a, b| b.lines_add_del.cmp(&a.lines_add_del));
        authors
    }
}

/// Compute author churn over a whole commit slice.
pub fn author_churn<'a>(commits: impl IntoIterator<Item = &'a CommitRecord>) -> Vec<AuthorChurn> {
    let mut aggregator = AuthorChurnAggregator::new();
    for commit in commits {
        aggregator.add(commit);
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FileChangeRecord;
    use chrono::TimeZone;

    fn make_commit(author: &str, day: u32, files: Vec<(&str, Option<u64>, Option<u64>)>) -> CommitRecord {
        let when = Utc.with_ymd_and_hms(2024, 2, day, 8, 0, 0).unwrap();
        CommitRecord {
            hash: format!("{author}_{day}"),
            parents: vec![],
            author: author.into(),
            author_email: format!("{author}@example.com"),
            author_date: when,
            committer_date: when,
            subject: "test".into(),
            files: files
                .into_iter()
                .map(|(path, added, deleted)| FileChangeRecord::new(path, added, deleted, Some(1)))
                .collect(),
        }
    }

    #[test]
    fn totals_and_bounds_accumulate_per_author() {
        let commits = vec![
            make_commit("alice", 10, vec![("a.rs", Some(5), Some(1))]),
            make_commit("bob", 11, vec![("b.rs", Some(1), Some(0))]),
            make_commit("alice", 3, vec![("a.rs", Some(2), Some(2)), ("c.rs", Some(1), None)]),
        ];

        let authors = author_churn(&commits);
        assert_eq!(authors.len(), 2);

        let alice = &authors[0];
        assert_eq!(alice.author_name, "alice");
        assert_eq!(alice.commits, 2);
        assert_eq!(alice.lines_added, 8);
        assert_eq!(alice.lines_deleted, 3);
        assert_eq!(alice.lines_add_del, 11);
        assert_eq!(alice.first_commit.format("%d").to_string(), "03");
        assert_eq!(alice.last_commit.format("%d").to_string(), "10");
    }

    #[test]
    fn commits_without_line_counts_still_count() {
        let commits = vec![make_commit("carol", 1, vec![("logo.png", None, None)])];
        let authors = author_churn(&commits);
        assert_eq!(authors[0].commits, 1);
        assert_eq!(authors[0].lines_add_del, 0);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let commits = vec![
            make_commit("zed", 1, vec![("a", Some(1), Some(0))]),
            make_commit("amy", 2, vec![("b", Some(1), Some(0))]),
        ];
        let names: Vec<String> = author_churn(&commits)
            .into_iter()
            .map(|a| a.author_name)
            .collect();
        assert_eq!(names, vec!["zed", "amy"]);
    }
}
