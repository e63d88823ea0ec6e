//! Detection of branch tips that never gain children.
//!
//! A single forward pass cannot know whether a tip will be built on later,
//! so the resolver is built from the whole analyzed range up front.

use std::collections::HashSet;

use crate::record::CommitRecord;

/// Global index of every hash that appears as a parent in the range.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use churnlens_history::dangling::DanglingTipResolver;
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
/// let history = vec![commit("a", &[]), commit("b", &["a"]), commit("c", &["a"])];
/// let resolver = DanglingTipResolver::from_commits(&history);
/// let tips = vec!["b".to_string(), "c".to_string()];
/// assert_eq!(resolver.no_future_children(&tips), vec!["b", "c"]);
/// assert!(resolver.will_have_children("a"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DanglingTipResolver {
    parents: HashSet<String>,
}

impl DanglingTipResolver {
    /// Index every parent hash referenced by `commits`.
    pub fn from_commits<'a>(commits: impl IntoIterator<Item = &'a CommitRecord>) -> Self {
        let parents = commits
            .into_iter()
            .flat_map(|commit| commit.parents.iter().cloned())
            .collect();
        Self { parents }
    }

    /// Whether some commit in the range names `hash` as a parent.
    pub fn will_have_children(&self, hash: &str) -> bool {
        self.parents.contains(hash)
    }

    /// The subset of `tips` never used as a parent, in input order.
    pub fn no_future_children(&self, tips: &[String]) -> Vec<String> {
        tips.iter()
            .filter(|tip| !self.will_have_children(tip))
            .cloned()
            .collect()
    }

    /// Number of distinct parent hashes indexed.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}
