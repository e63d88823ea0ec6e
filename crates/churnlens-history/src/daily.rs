//! Per-day branch topology and churn summaries.
//!
//! Days are UTC calendar days of the committer date and appear in the order
//! they are first seen in the (oldest-first) stream. Deltas compare against
//! the previous summarized day, not the previous calendar day; the first day
//! compares against an empty tip set.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::branch_tips::{BranchTips, EnrichedCommit};
use crate::dangling::DanglingTipResolver;

/// Topology and churn for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitDailySummary {
    pub day: NaiveDate,
    pub commit_hashes: Vec<String>,
    pub number_of_commits: usize,
    /// Tip set after the day's last commit.
    pub branch_tips: Vec<String>,
    /// `|tips(day)| - |tips(previous day)|`.
    pub delta_branch_tips: i64,
    pub number_of_commits_merged_in_the_day: usize,
    /// Tips of the day that no later commit builds on.
    pub commits_with_no_future_children: Vec<String>,
    pub number_of_commits_with_no_future_children: usize,
    pub number_of_branch_tips_which_will_have_children: usize,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub lines_add_del: u64,
}

#[derive(Debug, Default)]
struct DayAccumulator {
    commit_hashes: Vec<String>,
    tips: BranchTips,
    merges: usize,
    lines_added: u64,
    lines_deleted: u64,
}

/// Groups enriched commits by day.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use churnlens_history::branch_tips::enrich_commits;
/// use churnlens_history::daily::DailySummaryAggregator;
/// use churnlens_history::dangling::DanglingTipResolver;
/// use churnlens_history::record::CommitRecord;
///
/// let now = Utc::now();
/// let commits = vec![CommitRecord {
///     hash: "a".into(),
///     parents: vec![],
///     author: "alice".into(),
///     author_email: String::new(),
///     author_date: now,
///     committer_date: now,
///     subject: String::new(),
///     files: vec![],
/// }];
/// let resolver = DanglingTipResolver::from_commits(&commits);
///
/// let mut daily = DailySummaryAggregator::new();
/// for commit in &enrich_commits(commits) {
///     daily.add(commit);
/// }
/// let days = daily.finish(&resolver);
/// assert_eq!(days[0].delta_branch_tips, 1);
/// assert_eq!(days[0].number_of_commits_with_no_future_children, 1);
/// ```
#[derive(Debug, Default)]
pub struct DailySummaryAggregator {
    days: IndexMap<NaiveDate, DayAccumulator>,
}

impl DailySummaryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, enriched: &EnrichedCommit) {
        let commit = &enriched.commit;
        let day = self.days.entry(commit.day()).or_default();
        day.commit_hashes.push(commit.hash.clone());
        day.tips = enriched.branch_tips.clone();
        if enriched.is_merge {
            day.merges += 1;
        }
        day.lines_added += commit.lines_added();
        day.lines_deleted += commit.lines_deleted();
    }

    /// Resolve dangling tips and emit one summary per day.
    pub fn finish(self, resolver: &DanglingTipResolver) -> Vec<CommitDailySummary> {
        let mut previous_tips = 0i64;
        self.days
            .into_iter()
            .map(|(day, acc)| {
                let tips = acc.tips.as_slice().to_vec();
                let tip_count = tips.len() as i64;
                let dangling = resolver.no_future_children(&tips);
                let summary = CommitDailySummary {
                    day,
                    number_of_commits: acc.commit_hashes.len(),
                    commit_hashes: acc.commit_hashes,
                    delta_branch_tips: tip_count - previous_tips,
                    number_of_commits_merged_in_the_day: acc.merges,
                    number_of_commits_with_no_future_children: dangling.len(),
                    number_of_branch_tips_which_will_have_children: tips.len() - dangling.len(),
                    commits_with_no_future_children: dangling,
                    branch_tips: tips,
                    lines_added: acc.lines_added,
                    lines_deleted: acc.lines_deleted,
                    lines_add_del: acc.lines_added + acc.lines_deleted,
                };
                previous_tips = tip_count;
                summary
            })
            .collect()
    }
}

/// Summarize an enriched stream; `resolver` must cover the same range.
pub fn daily_summaries(
    commits: &[EnrichedCommit],
    resolver: &DanglingTipResolver,
) -> Vec<CommitDailySummary> {
    let mut aggregator = DailySummaryAggregator::new();
    for commit in commits {
        aggregator.add(commit);
    }
    aggregator.finish(resolver)
}
