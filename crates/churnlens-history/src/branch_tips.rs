//! Branch-tip tracking over an oldest-first commit stream.
//!
//! A branch tip is a commit that no later commit (so far) names as a parent.
//! Each commit absorbs whichever of its parents are currently tips and then
//! becomes a tip itself.
//!
//! Input must arrive oldest-first (topological, then by time). Feeding the
//! stream in any other order is not detected and yields wrong tip sets.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::record::CommitRecord;

/// The ordered set of current DAG leaves.
///
/// # Examples
///
/// ```
/// use churnlens_history::branch_tips::BranchTips;
///
/// let (tips, root) = BranchTips::default().advance("a", &[]);
/// assert!(root.is_additional_branch_tip);
///
/// let (tips, child) = tips.advance("b", &["a".to_string()]);
/// assert!(!child.is_additional_branch_tip);
/// assert_eq!(tips.as_slice(), ["b"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchTips(Vec<String>);

impl BranchTips {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.0.iter().any(|tip| tip == hash)
    }

    /// Apply one commit: remove every parent found among the tips, then
    /// append `hash`.
    ///
    /// This is a pure transition; the previous state is consumed and the next
    /// one returned together with the flags describing the step.
    pub fn advance(mut self, hash: &str, parents: &[String]) -> (Self, TipTransition) {
        let mut absorbed = 0usize;
        for parent in parents {
            if let Some(pos) = self.0.iter().position(|tip| tip == parent) {
                self.0.remove(pos);
                absorbed += 1;
            }
        }
        self.0.push(hash.to_string());

        let transition = TipTransition {
            is_merge: parents.len() > 1,
            is_additional_branch_tip: absorbed == 0,
            absorbed,
        };
        (self, transition)
    }
}

impl From<Vec<String>> for BranchTips {
    fn from(tips: Vec<String>) -> Self {
        Self(tips)
    }
}

/// Flags produced by a single [`BranchTips::advance`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TipTransition {
    /// The commit has more than one parent.
    pub is_merge: bool,
    /// None of the commit's parents was a tip, so it opens a new lineage.
    pub is_additional_branch_tip: bool,
    /// How many tips the commit absorbed.
    pub absorbed: usize,
}

/// A commit together with the tip set observed right after it.
///
/// Serializes flat: the commit's own fields plus `branchTips`, `isMerge` and
/// `isAdditionalBranchTip`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCommit {
    #[serde(flatten)]
    pub commit: CommitRecord,
    /// Tip set after processing this commit.
    pub branch_tips: BranchTips,
    pub is_merge: bool,
    pub is_additional_branch_tip: bool,
}

/// Threads [`BranchTips`] through a commit stream.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use churnlens_history::branch_tips::BranchTipTracker;
/// use churnlens_history::record::CommitRecord;
///
/// let commit = |hash: &str, parents: &[&str]| CommitRecord {
///     hash: hash.into(),
///     parents: parents.iter().map(|p| p.to_string()).collect(),
///     author: "alice".into(),
///     author_email: String::new(),
///     author_date: Utc::now(),
///     committer_date: Utc::now(),
///     subject: String::new(),
///     files: vec![],
/// };
///
/// let mut tracker = BranchTipTracker::new();
/// tracker.track(commit("a", &[]));
/// tracker.track(commit("b", &["a"]));
/// let c = tracker.track(commit("c", &["a"]));
/// assert!(c.is_additional_branch_tip);
/// assert_eq!(c.branch_tips.as_slice(), ["b", "c"]);
/// ```
#[derive(Debug, Default)]
pub struct BranchTipTracker {
    tips: BranchTips,
    seen: HashSet<String>,
    unknown_parents: usize,
}

impl BranchTipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the tip state with `commit` and return it enriched.
    pub fn track(&mut self, commit: CommitRecord) -> EnrichedCommit {
        for parent in &commit.parents {
            if !self.seen.contains(parent) {
                self.unknown_parents += 1;
                debug!(commit = %commit.hash, parent = %parent, "parent not seen earlier in the stream");
            }
        }
        self.seen.insert(commit.hash.clone());

        let tips = std::mem::take(&mut self.tips);
        let (tips, transition) = tips.advance(&commit.hash, &commit.parents);
        self.tips = tips;

        EnrichedCommit {
            branch_tips: self.tips.clone(),
            is_merge: transition.is_merge,
            is_additional_branch_tip: transition.is_additional_branch_tip,
            commit,
        }
    }

    /// Current tip set.
    pub fn tips(&self) -> &BranchTips {
        &self.tips
    }

    /// Parent references that pointed at commits not seen earlier in the
    /// stream, e.g. history cut off by a ref or a shallow clone.
    pub fn unknown_parents(&self) -> usize {
        self.unknown_parents
    }
}

/// Enrich an oldest-first commit sequence with branch-tip snapshots.
pub fn enrich_commits(commits: impl IntoIterator<Item = CommitRecord>) -> Vec<EnrichedCommit> {
    let mut tracker = BranchTipTracker::new();
    commits
        .into_iter()
        .map(|commit| tracker.track(commit))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_commit(hash: &str, parents: &[&str]) -> CommitRecord {
        let when = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        CommitRecord {
            hash: hash.into(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            author: "alice".into(),
            author_email: "alice@example.com".into(),
            author_date: when,
            committer_date: when,
            subject: "test".into(),
            files: vec![],
        }
    }

    fn parents(hashes: &[&str]) -> Vec<String> {
        hashes.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn root_commit_is_an_additional_tip() {
        let (tips, transition) = BranchTips::default().advance("a", &[]);
        assert!(transition.is_additional_branch_tip);
        assert!(!transition.is_merge);
        assert_eq!(tips.as_slice(), ["a"]);
    }

    #[test]
    fn linear_history_keeps_a_single_tip() {
        let mut tracker = BranchTipTracker::new();
        let mut previous: Option<String> = None;
        for i in 0..20 {
            let hash = format!("c{i}");
            let parent: Vec<&str> = previous.iter().map(String::as_str).collect();
            let enriched = tracker.track(make_commit(&hash, &parent));
            assert_eq!(enriched.branch_tips.len(), 1, "after {hash}");
            previous = Some(hash);
        }
        assert_eq!(tracker.unknown_parents(), 0);
    }

    #[test]
    fn sibling_commit_opens_a_second_tip() {
        let enriched = enrich_commits(vec![
            make_commit("A", &[]),
            make_commit("B", &["A"]),
            make_commit("C", &["A"]),
        ]);
        let c = &enriched[2];
        assert_eq!(c.branch_tips.as_slice(), ["B", "C"]);
        assert!(c.is_additional_branch_tip);
        assert!(!enriched[1].is_additional_branch_tip);
    }

    #[test]
    fn merge_absorbs_only_known_tips() {
        let enriched = enrich_commits(vec![
            make_commit("A", &[]),
            make_commit("B", &["A"]),
            make_commit("C", &["B"]),
            make_commit("M", &["C", "X"]),
        ]);
        let m = &enriched[3];
        assert_eq!(m.branch_tips.as_slice(), ["M"]);
        assert!(m.is_merge);
        assert!(!m.is_additional_branch_tip);
    }

    #[test]
    fn merge_of_k_tips_shrinks_the_set_by_k_minus_one() {
        let tips = BranchTips::from(parents(&["x", "y", "z", "w"]));
        let (next, transition) = tips.advance("m", &parents(&["x", "z", "w"]));
        assert_eq!(transition.absorbed, 3);
        assert_eq!(next.len(), 4 - 2);
        assert_eq!(next.as_slice(), ["y", "m"]);
    }

    #[test]
    fn merge_with_no_known_parents_grows_the_set() {
        let tips = BranchTips::from(parents(&["x"]));
        let (next, transition) = tips.advance("m", &parents(&["p", "q"]));
        assert!(transition.is_merge);
        assert!(transition.is_additional_branch_tip);
        assert_eq!(next.len(), 2);
    }

    #[test]
    fn unknown_parents_are_counted_not_fatal() {
        let mut tracker = BranchTipTracker::new();
        let first = tracker.track(make_commit("B", &["A"]));
        assert!(first.is_additional_branch_tip);
        assert_eq!(tracker.unknown_parents(), 1);
        assert_eq!(tracker.tips().as_slice(), ["B"]);
    }

    #[test]
    fn enrichment_is_deterministic() {
        let history = vec![
            make_commit("A", &[]),
            make_commit("B", &["A"]),
            make_commit("C", &["A"]),
            make_commit("D", &["B", "C"]),
        ];
        assert_eq!(enrich_commits(history.clone()), enrich_commits(history));
    }

    #[test]
    fn enriched_commit_serializes_flat() {
        let enriched = enrich_commits(vec![make_commit("A", &[])]);
        let json = serde_json::to_value(&enriched[0]).unwrap();
        assert_eq!(json["hash"], "A");
        assert_eq!(json["branchTips"], serde_json::json!(["A"]));
        assert_eq!(json["isAdditionalBranchTip"], true);
        assert_eq!(json["isMerge"], false);
    }
}
