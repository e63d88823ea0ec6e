//! File co-change (coupling) detection.
//!
//! Counts how often two files are changed in the same change set (a commit,
//! or a calendar day) and normalizes the count by the total number of
//! commits analyzed.
//!
//! Pair counting is quadratic in the size of a change set. Change sets larger
//! than [`CouplingOptions::large_commit_warning`] are still counted in full
//! and only logged.

use chrono::NaiveDate;
use churnlens_core::CoChangeWindow;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::record::CommitRecord;

/// Co-change statistics for an unordered pair of files.
///
/// `path` is the lexicographically smaller of the two paths, so each pair
/// appears once.
///
/// # Examples
///
/// ```
/// use churnlens_history::coupling::FileCoupling;
///
/// let pair = FileCoupling {
///     path: "src/auth.rs".into(),
///     coupled_file: "src/session.rs".into(),
///     tot_commit_for_file: 20,
///     tot_commits_for_coupled_file: 18,
///     how_many_times: 15,
///     how_many_times_vs_tot_commits: 0.15,
///     tot_number_of_commits: 100,
/// };
/// assert!(pair.path < pair.coupled_file);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCoupling {
    /// First file in the pair (lexicographically smaller).
    pub path: String,
    /// Second file in the pair.
    pub coupled_file: String,
    /// Change sets touching `path`.
    pub tot_commit_for_file: u32,
    /// Change sets touching `coupled_file`.
    pub tot_commits_for_coupled_file: u32,
    /// Change sets touching both files.
    pub how_many_times: u32,
    /// `how_many_times / tot_number_of_commits`.
    #[serde(rename = "howManyTimes_vs_totCommits")]
    pub how_many_times_vs_tot_commits: f64,
    /// Commits analyzed in total.
    pub tot_number_of_commits: u32,
}

/// Options for [`FileCouplingAnalyzer`].
///
/// # Examples
///
/// ```
/// use churnlens_history::coupling::CouplingOptions;
///
/// let opts = CouplingOptions::default();
/// assert_eq!(opts.min_co_changes, 1);
/// assert!(!opts.ignore_cloc_zero);
/// ```
#[derive(Debug, Clone)]
pub struct CouplingOptions {
    /// How commits are grouped into change sets.
    pub window: CoChangeWindow,
    /// Drop pairs seen together fewer times than this.
    pub min_co_changes: u32,
    /// Skip change records whose cloc is zero or unknown.
    pub ignore_cloc_zero: bool,
    /// Change sets with more files than this are logged as oversized.
    pub large_commit_warning: usize,
}

impl Default for CouplingOptions {
    fn default() -> Self {
        Self {
            window: CoChangeWindow::Commit,
            min_co_changes: 1,
            ignore_cloc_zero: false,
            large_commit_warning: 500,
        }
    }
}

/// Folds commits into pairwise co-change counters.
#[derive(Debug)]
pub struct FileCouplingAnalyzer {
    options: CouplingOptions,
    total_commits: u32,
    file_changes: IndexMap<String, u32>,
    co_changes: IndexMap<(String, String), u32>,
    open_day: Option<(NaiveDate, IndexSet<String>)>,
}

impl FileCouplingAnalyzer {
    pub fn new(options: CouplingOptions) -> Self {
        Self {
            options,
            total_commits: 0,
            file_changes: IndexMap::new(),
            co_changes: IndexMap::new(),
            open_day: None,
        }
    }

    pub fn add(&mut self, commit: &CommitRecord) {
        self.total_commits += 1;

        let ignore_cloc_zero = self.options.ignore_cloc_zero;
        let files = commit
            .files
            .iter()
            .filter(|f| f.passes_cloc_filter(ignore_cloc_zero))
            .map(|f| f.path.clone());

        match self.options.window {
            CoChangeWindow::Commit => {
                let unique: IndexSet<String> = files.collect();
                self.count_change_set(&commit.hash, &unique);
            }
            CoChangeWindow::Day => {
                let day = commit.day();
                let same_day = matches!(&self.open_day, Some((open, _)) if *open == day);
                if !same_day {
                    self.flush_day();
                    self.open_day = Some((day, IndexSet::new()));
                }
                if let Some((_, set)) = self.open_day.as_mut() {
                    set.extend(files);
                }
            }
        }
    }

    fn flush_day(&mut self) {
        if let Some((day, set)) = self.open_day.take() {
            self.count_change_set(&day.to_string(), &set);
        }
    }

    fn count_change_set(&mut self, label: &str, files: &IndexSet<String>) {
        if files.len() > self.options.large_commit_warning {
            warn!(
                change_set = label,
                files = files.len(),
                pairs = files.len() * (files.len() - 1) / 2,
                "large change set, coupling pairs grow quadratically"
            );
        }

        for file in files {
            *self.file_changes.entry(file.clone()).or_default() += 1;
        }

        let files: Vec<&String> = files.iter().collect();
        for i in 0..files.len() {
            for j in (i + 1)..files.len() {
                let key = normalize_pair(files[i], files[j]);
                *self.co_changes.entry(key).or_default() += 1;
            }
        }
    }

    /// Build coupling records sorted by `how_many_times` descending; ties
    /// keep first-seen order.
    pub fn finish(mut self) -> Vec<FileCoupling> {
        self.flush_day();

        let total = self.total_commits;
        let mut pairs = Vec::new();
        for ((file_a, file_b), co_count) in &self.co_changes {
            if *co_count < self.options.min_co_changes {
                continue;
            }

            let ratio = if total == 0 {
                0.0
            } else {
                f64::from(*co_count) / f64::from(total)
            };

            pairs.push(FileCoupling {
                path: file_a.clone(),
                coupled_file: file_b.clone(),
                tot_commit_for_file: self.file_changes.get(file_a).copied().unwrap_or(0),
                tot_commits_for_coupled_file: self.file_changes.get(file_b).copied().unwrap_or(0),
                how_many_times: *co_count,
                how_many_times_vs_tot_commits: ratio,
                tot_number_of_commits: total,
            });
        }

        pairs.sort_by(|a, b| b.how_many_times.cmp(&a.how_many_times));
        pairs
    }
}

/// Detect co-change coupling over a whole commit slice.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use churnlens_history::coupling::{detect_coupling, CouplingOptions};
/// use churnlens_history::record::{CommitRecord, FileChangeRecord};
///
/// let commits = vec![CommitRecord {
///     hash: "abc".into(),
///     parents: vec![],
///     author: "alice".into(),
///     author_email: String::new(),
///     author_date: Utc::now(),
///     committer_date: Utc::now(),
///     subject: "change".into(),
///     files: vec![
///         FileChangeRecord::new("a.rs", Some(5), Some(0), Some(10)),
///         FileChangeRecord::new("b.rs", Some(3), Some(0), Some(10)),
///     ],
/// }];
/// let pairs = detect_coupling(&commits, &CouplingOptions::default());
/// assert_eq!(pairs.len(), 1);
/// ```
pub fn detect_coupling<'a>(
    commits: impl IntoIterator<Item = &'a CommitRecord>,
    options: &CouplingOptions,
) -> Vec<FileCoupling> {
    let mut analyzer = FileCouplingAnalyzer::new(options.clone());
    for commit in commits {
        analyzer.add(commit);
    }
    analyzer.finish()
}

fn normalize_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FileChangeRecord;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, day, hour, 0, 0).unwrap()
    }

    fn make_commit_at(when: DateTime<Utc>, files: Vec<&str>) -> CommitRecord {
        CommitRecord {
            hash: format!("hash_{}", when.timestamp()),
            parents: vec![],
            author: "alice".into(),
            author_email: "alice@example.com".into(),
            author_date: when,
            committer_date: when,
            subject: "test".into(),
            files: files
                .into_iter()
                .map(|path| FileChangeRecord::new(path, Some(5), Some(2), Some(10)))
                .collect(),
        }
    }

    fn make_commit(files: Vec<&str>) -> CommitRecord {
        make_commit_at(at(1, 9), files)
    }

    #[test]
    fn three_files_make_three_pairs() {
        let pairs = detect_coupling(&[make_commit(vec!["x", "y", "z"])], &CouplingOptions::default());
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|p| p.how_many_times == 1));
        assert!(pairs.iter().all(|p| p.path < p.coupled_file));
    }

    #[test]
    fn files_always_changed_together_have_full_ratio() {
        let commits = vec![
            make_commit(vec!["a.rs", "b.rs"]),
            make_commit(vec!["a.rs", "b.rs"]),
            make_commit(vec!["a.rs", "b.rs"]),
        ];

        let pairs = detect_coupling(&commits, &CouplingOptions::default());
        assert_eq!(pairs.len(), 1);
        assert!((pairs[0].how_many_times_vs_tot_commits - 1.0).abs() < f64::EPSILON);
        assert_eq!(pairs[0].how_many_times, 3);
        assert_eq!(pairs[0].tot_number_of_commits, 3);
    }

    #[test]
    fn ratio_uses_global_commit_count() {
        let commits = vec![
            make_commit(vec!["a.rs", "b.rs"]),
            make_commit(vec!["a.rs"]),
            make_commit(vec!["c.rs"]),
            make_commit(vec![]),
        ];

        let pairs = detect_coupling(&commits, &CouplingOptions::default());
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].tot_commit_for_file, 2);
        assert_eq!(pairs[0].tot_commits_for_coupled_file, 1);
        assert_eq!(pairs[0].tot_number_of_commits, 4);
        assert!((pairs[0].how_many_times_vs_tot_commits - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn files_never_changed_together_not_in_results() {
        let commits = vec![make_commit(vec!["a.rs"]), make_commit(vec!["b.rs"])];

        let pairs = detect_coupling(&commits, &CouplingOptions::default());
        assert!(pairs.is_empty());
    }

    #[test]
    fn min_co_changes_filter_works() {
        let commits = vec![make_commit(vec!["a.rs", "b.rs"])];
        let strict = CouplingOptions {
            min_co_changes: 2,
            ..CouplingOptions::default()
        };

        assert!(detect_coupling(&commits, &strict).is_empty());
        assert_eq!(detect_coupling(&commits, &CouplingOptions::default()).len(), 1);
    }

    #[test]
    fn pair_normalization_treats_ab_same_as_ba() {
        let commits = vec![
            make_commit(vec!["z.rs", "a.rs"]),
            make_commit(vec!["a.rs", "z.rs"]),
        ];

        let pairs = detect_coupling(&commits, &CouplingOptions::default());
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].path, "a.rs");
        assert_eq!(pairs[0].coupled_file, "z.rs");
        assert_eq!(pairs[0].how_many_times, 2);
    }

    #[test]
    fn duplicate_paths_in_one_commit_count_once() {
        let pairs = detect_coupling(
            &[make_commit(vec!["a.rs", "b.rs", "a.rs"])],
            &CouplingOptions::default(),
        );
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].tot_commit_for_file, 1);
    }

    #[test]
    fn zero_cloc_files_are_filtered_when_configured() {
        let mut commit = make_commit(vec!["a.rs", "b.rs"]);
        commit.files.push(FileChangeRecord::new("logo.png", None, None, None));
        let options = CouplingOptions {
            ignore_cloc_zero: true,
            ..CouplingOptions::default()
        };

        assert_eq!(detect_coupling(&[commit.clone()], &options).len(), 1);
        assert_eq!(detect_coupling(&[commit], &CouplingOptions::default()).len(), 3);
    }

    #[test]
    fn day_window_couples_files_from_separate_commits() {
        let commits = vec![
            make_commit_at(at(1, 9), vec!["a.rs"]),
            make_commit_at(at(1, 17), vec!["b.rs"]),
            make_commit_at(at(2, 9), vec!["c.rs"]),
        ];
        let options = CouplingOptions {
            window: CoChangeWindow::Day,
            ..CouplingOptions::default()
        };

        let pairs = detect_coupling(&commits, &options);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].path, "a.rs");
        assert_eq!(pairs[0].coupled_file, "b.rs");
        assert_eq!(pairs[0].tot_number_of_commits, 3);
        assert!(detect_coupling(&commits, &CouplingOptions::default()).is_empty());
    }

    #[test]
    fn oversized_commits_are_still_counted() {
        let files: Vec<String> = (0..40).map(|i| format!("f{i}.rs")).collect();
        let commit = make_commit(files.iter().map(String::as_str).collect());
        let options = CouplingOptions {
            large_commit_warning: 10,
            ..CouplingOptions::default()
        };
        assert_eq!(detect_coupling(&[commit], &options).len(), 40 * 39 / 2);
    }

    #[test]
    fn empty_history_has_no_pairs() {
        assert!(detect_coupling(&Vec::<CommitRecord>::new(), &CouplingOptions::default()).is_empty());
    }
}
