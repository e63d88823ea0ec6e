//! One-call driver that runs every analysis over a commit range.
//!
//! Branch-tip tracking is strictly sequential. The remaining aggregators own
//! private state and only read the shared commit slice, so they run in
//! parallel via `rayon::join`; the result is identical to a sequential run.

use chrono::{DateTime, Utc};
use churnlens_core::{ChurnConfig, ChurnError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::authors::{AuthorChurn, AuthorChurnAggregator};
use crate::branch_tips::{BranchTipTracker, EnrichedCommit};
use crate::coupling::{CouplingOptions, FileCoupling, FileCouplingAnalyzer};
use crate::daily::{daily_summaries, CommitDailySummary};
use crate::dangling::DanglingTipResolver;
use crate::file_churn::{FileChurn, FileChurnAggregator, FileChurnOptions};
use crate::module_churn::{module_churn, ModuleChurn};
use crate::record::CommitRecord;

/// Options for a full [`HistoryReport`].
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub churn: FileChurnOptions,
    pub coupling: CouplingOptions,
}

impl AnalysisOptions {
    /// Derive analysis options from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::InvalidDate`] if `history.after` is malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use churnlens_core::ChurnConfig;
    /// use churnlens_history::report::AnalysisOptions;
    ///
    /// let config = ChurnConfig::from_toml("[history]\nignore_cloc_zero = true\n").unwrap();
    /// let options = AnalysisOptions::from_config(&config).unwrap();
    /// assert!(options.churn.ignore_cloc_zero);
    /// assert!(options.coupling.ignore_cloc_zero);
    /// ```
    pub fn from_config(config: &ChurnConfig) -> Result<Self, ChurnError> {
        Ok(Self {
            churn: FileChurnOptions {
                after: config.history.cutoff()?,
                ignore_cloc_zero: config.history.ignore_cloc_zero,
            },
            coupling: CouplingOptions {
                window: config.coupling.window,
                min_co_changes: config.coupling.min_co_changes,
                ignore_cloc_zero: config.history.ignore_cloc_zero,
                large_commit_warning: config.coupling.large_commit_warning,
            },
        })
    }
}

/// Whole-range branch topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSummary {
    pub total_commits: usize,
    pub merges: usize,
    /// Commits that opened a new lineage (roots and siblings).
    pub additional_branch_tips: usize,
    /// Tip set after the newest commit.
    pub final_tips: Vec<String>,
    /// Commits in the range that no other commit in the range builds on.
    pub abandoned_tips: Vec<String>,
    /// Parent references to commits outside the analyzed stream.
    pub unknown_parents: usize,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
}

/// Every aggregate produced from one commit range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReport {
    pub branches: BranchSummary,
    pub commits: Vec<EnrichedCommit>,
    pub daily: Vec<CommitDailySummary>,
    pub files: Vec<FileChurn>,
    pub modules: Vec<ModuleChurn>,
    pub coupling: Vec<FileCoupling>,
    pub authors: Vec<AuthorChurn>,
}

impl HistoryReport {
    /// Run every analysis over `commits`, which must be oldest-first.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Utc;
    /// use churnlens_history::record::{CommitRecord, FileChangeRecord};
    /// use churnlens_history::report::{AnalysisOptions, HistoryReport};
    ///
    /// let now = Utc::now();
    /// let commits = vec![CommitRecord {
    ///     hash: "a".into(),
    ///     parents: vec![],
    ///     author: "alice".into(),
    ///     author_email: String::new(),
    ///     author_date: now,
    ///     committer_date: now,
    ///     subject: "init".into(),
    ///     files: vec![FileChangeRecord::new("src/lib.rs", Some(10), Some(0), Some(10))],
    /// }];
    /// let report = HistoryReport::build(commits, &AnalysisOptions::default());
    /// assert_eq!(report.branches.final_tips, vec!["a"]);
    /// assert_eq!(report.modules.len(), 2);
    /// ```
    pub fn build(commits: Vec<CommitRecord>, options: &AnalysisOptions) -> Self {
        let resolver = DanglingTipResolver::from_commits(&commits);

        let mut tracker = BranchTipTracker::new();
        let enriched: Vec<EnrichedCommit> =
            commits.into_iter().map(|c| tracker.track(c)).collect();
        if tracker.unknown_parents() > 0 {
            warn!(
                unknown_parents = tracker.unknown_parents(),
                "some parents fall outside the analyzed range"
            );
        }

        let ((files, modules), (coupling, (authors, daily))) = rayon::join(
            || {
                let mut agg = FileChurnAggregator::new(options.churn.clone());
                enriched.iter().for_each(|e| agg.add(&e.commit));
                let files = agg.finish();
                let modules = module_churn(&files);
                (files, modules)
            },
            || {
                rayon::join(
                    || {
                        let mut agg = FileCouplingAnalyzer::new(options.coupling.clone());
                        enriched.iter().for_each(|e| agg.add(&e.commit));
                        agg.finish()
                    },
                    || {
                        rayon::join(
                            || {
                                let mut agg = AuthorChurnAggregator::new();
                                enriched.iter().for_each(|e| agg.add(&e.commit));
                                agg.finish()
                            },
                            || daily_summaries(&enriched, &resolver),
                        )
                    },
                )
            },
        );

        let branches = BranchSummary {
            total_commits: enriched.len(),
            merges: enriched.iter().filter(|e| e.is_merge).count(),
            additional_branch_tips: enriched
                .iter()
                .filter(|e| e.is_additional_branch_tip)
                .count(),
            final_tips: tracker.tips().as_slice().to_vec(),
            abandoned_tips: enriched
                .iter()
                .filter(|e| !resolver.will_have_children(&e.commit.hash))
                .map(|e| e.commit.hash.clone())
                .collect(),
            unknown_parents: tracker.unknown_parents(),
            first_commit: enriched.iter().map(|e| e.commit.committer_date).min(),
            last_commit: enriched.iter().map(|e| e.commit.committer_date).max(),
        };

        info!(
            commits = branches.total_commits,
            files = files.len(),
            modules = modules.len(),
            pairs = coupling.len(),
            authors = authors.len(),
            days = daily.len(),
            "history analysis complete"
        );

        Self {
            branches,
            commits: enriched,
            daily,
            files,
            modules,
            coupling,
            authors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FileChangeRecord;
    use chrono::TimeZone;

    fn make_commit(
        hash: &str,
        parents: &[&str],
        author: &str,
        day: u32,
        files: Vec<(&str, u64, u64)>,
    ) -> CommitRecord {
        let when = Utc.with_ymd_and_hms(2024, 7, day, 12, 0, 0).unwrap();
        CommitRecord {
            hash: hash.into(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            author: author.into(),
            author_email: format!("{author}@example.com"),
            author_date: when,
            committer_date: when,
            subject: format!("commit {hash}"),
            files: files
                .into_iter()
                .map(|(path, added, deleted)| {
                    FileChangeRecord::new(path, Some(added), Some(deleted), Some(added + 1))
                })
                .collect(),
        }
    }

    fn history() -> Vec<CommitRecord> {
        vec![
            make_commit("A", &[], "alice", 1, vec![("src/main.rs", 50, 0), ("README.md", 5, 0)]),
            make_commit("B", &["A"], "bob", 2, vec![("src/main.rs", 4, 2), ("src/cli/args.rs", 20, 0)]),
            make_commit("C", &["A"], "alice", 2, vec![("docs/guide.md", 8, 0)]),
            make_commit("M", &["B", "C"], "alice", 3, vec![]),
            make_commit("D", &["M"], "carol", 4, vec![("src/main.rs", 1, 1), ("src/cli/args.rs", 3, 3)]),
        ]
    }

    #[test]
    fn report_covers_every_aggregate() {
        let report = HistoryReport::build(history(), &AnalysisOptions::default());

        assert_eq!(report.branches.total_commits, 5);
        assert_eq!(report.branches.merges, 1);
        assert_eq!(report.branches.additional_branch_tips, 2);
        assert_eq!(report.branches.final_tips, vec!["D"]);
        assert_eq!(report.branches.abandoned_tips, vec!["D"]);
        assert_eq!(report.branches.unknown_parents, 0);

        assert_eq!(report.commits.len(), 5);
        assert_eq!(report.daily.len(), 4);

        let main = report.files.iter().find(|f| f.path == "src/main.rs").unwrap();
        assert_eq!(main.commits, 3);
        assert_eq!(main.lines_add_del, 58);

        let root = report.modules.iter().find(|m| m.path == ".").unwrap();
        let total: u64 = report.files.iter().map(|f| f.lines_add_del).sum();
        assert_eq!(root.subtree.lines_add_del, total);

        let pair = report
            .coupling
            .iter()
            .find(|p| p.path == "src/cli/args.rs" && p.coupled_file == "src/main.rs")
            .unwrap();
        assert_eq!(pair.how_many_times, 2);
        assert_eq!(pair.tot_number_of_commits, 5);

        assert_eq!(report.authors[0].author_name, "alice");
        assert_eq!(report.authors[0].commits, 3);
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let options = AnalysisOptions::default();
        let first = HistoryReport::build(history(), &options);
        let second = HistoryReport::build(history(), &options);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn cutoff_flows_into_file_churn_only() {
        let options = AnalysisOptions {
            churn: FileChurnOptions {
                after: Some(Utc.with_ymd_and_hms(2024, 7, 4, 0, 0, 0).unwrap()),
                ignore_cloc_zero: false,
            },
            ..AnalysisOptions::default()
        };
        let report = HistoryReport::build(history(), &options);
        let main = report.files.iter().find(|f| f.path == "src/main.rs").unwrap();
        assert_eq!(main.commits, 1);
        assert_eq!(main.lines_add_del, 2);
        // author churn is lifetime
        let alice = report.authors.iter().find(|a| a.author_name == "alice").unwrap();
        assert_eq!(alice.lines_add_del, 63);
    }

    #[test]
    fn empty_history_builds_empty_report() {
        let report = HistoryReport::build(Vec::new(), &AnalysisOptions::default());
        assert_eq!(report.branches.total_commits, 0);
        assert!(report.branches.final_tips.is_empty());
        assert!(report.branches.first_commit.is_none());
        assert!(report.files.is_empty());
        assert!(report.modules.is_empty());
        assert!(report.daily.is_empty());
    }

    #[test]
    fn options_come_from_config() {
        let config = ChurnConfig::from_toml(
            "[history]\nafter = \"2024-01-01\"\n[coupling]\nmin_co_changes = 4\nwindow = \"day\"\n",
        )
        .unwrap();
        let options = AnalysisOptions::from_config(&config).unwrap();
        assert!(options.churn.after.is_some());
        assert_eq!(options.coupling.min_co_changes, 4);
        assert_eq!(options.coupling.window, churnlens_core::CoChangeWindow::Day);
    }
}
