//! Commit history extraction via git2.
//!
//! Walks a repository oldest-first and turns every commit into a
//! [`CommitRecord`] with per-file line counts and the lines-of-code count of
//! each touched file at that revision.

use std::path::Path;

use chrono::{DateTime, Utc};
use churnlens_core::{ChurnError, HistoryConfig};
use git2::{Commit, Diff, DiffOptions, Oid, Patch, Repository, Sort};
use tracing::debug;

use crate::record::{CommitRecord, FileChangeRecord};

/// Options for history mining.
///
/// # Examples
///
/// ```
/// use churnlens_history::mining::MiningOptions;
///
/// let opts = MiningOptions::default();
/// assert!(opts.branch.is_none());
/// assert!(!opts.all_refs);
/// assert!(!opts.include_merge_diffs);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MiningOptions {
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
    /// Walk every local branch.
    pub all_refs: bool,
    /// Diff merge commits against their first parent instead of leaving them
    /// without file changes.
    pub include_merge_diffs: bool,
}

impl From<&HistoryConfig> for MiningOptions {
    fn from(config: &HistoryConfig) -> Self {
        Self {
            branch: config.branch.clone(),
            all_refs: config.all_refs,
            include_merge_diffs: config.include_merge_diffs,
        }
    }
}

/// Mine commit history from a git repository.
///
/// Returns commits oldest-first (topological, then by time), the order
/// branch-tip tracking requires. Renames are not followed: a moved file shows
/// up as a deletion plus an addition.
///
/// # Errors
///
/// Returns [`ChurnError::Git`] if the repository cannot be opened or walked.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use churnlens_history::mining::{mine_commits, MiningOptions};
///
/// let commits = mine_commits(Path::new("."), &MiningOptions::default()).unwrap();
/// for c in &commits {
///     println!("{}: {} ({})", &c.hash[..7], c.subject, c.author);
/// }
/// ```
pub fn mine_commits(
    repo_path: &Path,
    options: &MiningOptions,
) -> Result<Vec<CommitRecord>, ChurnError> {
    let repo = Repository::discover(repo_path)
        .map_err(|e| ChurnError::Git(format!("failed to open repository: {e}")))?;

    let mut revwalk = repo
        .revwalk()
        .map_err(|e| ChurnError::Git(format!("failed to create revwalk: {e}")))?;

    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE)
        .map_err(|e| ChurnError::Git(format!("failed to set revwalk order: {e}")))?;

    if options.all_refs {
        revwalk
            .push_glob("refs/heads")
            .map_err(|e| ChurnError::Git(format!("failed to push local branches: {e}")))?;
    } else if let Some(ref branch) = options.branch {
        let oid = resolve_branch(&repo, branch)?;
        revwalk
            .push(oid)
            .map_err(|e| ChurnError::Git(format!("failed to push oid: {e}")))?;
    } else {
        revwalk
            .push_head()
            .map_err(|e| ChurnError::Git(format!("failed to push HEAD: {e}")))?;
    }

    let mut commits = Vec::new();
    for oid_result in revwalk {
        let oid = oid_result.map_err(|e| ChurnError::Git(format!("revwalk error: {e}")))?;
        let commit = repo
            .find_commit(oid)
            .map_err(|e| ChurnError::Git(format!("failed to find commit: {e}")))?;

        let files = if commit.parent_count() > 1 && !options.include_merge_diffs {
            Vec::new()
        } else {
            extract_file_changes(&repo, &commit)?
        };

        commits.push(to_record(&commit, files));
    }

    debug!(commits = commits.len(), path = %repo_path.display(), "mined history");
    Ok(commits)
}

fn resolve_branch(repo: &Repository, branch: &str) -> Result<Oid, ChurnError> {
    let reference = repo
        .resolve_reference_from_short_name(branch)
        .map_err(|e| ChurnError::Git(format!("failed to resolve branch '{branch}': {e}")))?;
    reference
        .peel_to_commit()
        .map(|c| c.id())
        .map_err(|e| ChurnError::Git(format!("branch '{branch}' has no commit: {e}")))
}

fn to_record(commit: &Commit<'_>, files: Vec<FileChangeRecord>) -> CommitRecord {
    let author = commit.author();
    CommitRecord {
        hash: commit.id().to_string(),
        parents: commit.parent_ids().map(|id| id.to_string()).collect(),
        author: author.name().unwrap_or("unknown").to_string(),
        author_email: author.email().unwrap_or("unknown").to_string(),
        author_date: to_utc(author.when().seconds()),
        committer_date: to_utc(commit.committer().when().seconds()),
        subject: commit.summary().unwrap_or("").to_string(),
        files,
    }
}

fn to_utc(seconds: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(seconds, 0).unwrap_or_default()
}

fn first_parent_diff<'r>(repo: &'r Repository, commit: &Commit<'_>) -> Result<Diff<'r>, ChurnError> {
    let commit_tree = commit
        .tree()
        .map_err(|e| ChurnError::Git(format!("failed to get commit tree: {e}")))?;

    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit
            .parent(0)
            .map_err(|e| ChurnError::Git(format!("failed to get parent: {e}")))?;
        Some(
            parent
                .tree()
                .map_err(|e| ChurnError::Git(format!("failed to get parent tree: {e}")))?,
        )
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    repo.diff_tree_to_tree(
        parent_tree.as_ref(),
        Some(&commit_tree),
        Some(&mut diff_opts),
    )
    .map_err(|e| ChurnError::Git(format!("failed to compute diff: {e}")))
}

fn extract_file_changes(
    repo: &Repository,
    commit: &Commit<'_>,
) -> Result<Vec<FileChangeRecord>, ChurnError> {
    let diff = first_parent_diff(repo, commit)?;

    let mut changes = Vec::new();
    for idx in 0..diff.deltas().len() {
        let Some(delta) = diff.get_delta(idx) else {
            continue;
        };

        let new_file = delta.new_file();
        let Some(path) = new_file
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().to_string())
        else {
            continue;
        };

        let patch = Patch::from_diff(&diff, idx)
            .map_err(|e| ChurnError::Git(format!("failed to build patch for {path}: {e}")))?;

        let deleted_file = delta.status() == git2::Delta::Deleted;
        let cloc = if deleted_file {
            None
        } else {
            count_code_lines(repo, new_file.id())
        };

        let binary = delta.flags().is_binary() || (!deleted_file && cloc.is_none());
        let (lines_added, lines_deleted) = match patch {
            Some(patch) if !binary => {
                let (_, added, deleted) = patch
                    .line_stats()
                    .map_err(|e| ChurnError::Git(format!("failed to count lines for {path}: {e}")))?;
                (Some(added as u64), Some(deleted as u64))
            }
            _ => (None, None),
        };

        changes.push(FileChangeRecord {
            path,
            lines_added,
            lines_deleted,
            cloc,
        });
    }

    Ok(changes)
}

/// Non-blank lines of a text blob; `None` for binary or missing blobs.
fn count_code_lines(repo: &Repository, id: Oid) -> Option<u64> {
    if id.is_zero() {
        return None;
    }
    let blob = repo.find_blob(id).ok()?;
    if blob.is_binary() {
        return None;
    }
    let content = String::from_utf8_lossy(blob.content());
    Some(content.lines().filter(|l| !l.trim().is_empty()).count() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mining_options_follow_history_config() {
        let config = HistoryConfig {
            branch: Some("main".into()),
            all_refs: true,
            include_merge_diffs: true,
            ..HistoryConfig::default()
        };
        let opts = MiningOptions::from(&config);
        assert_eq!(opts.branch.as_deref(), Some("main"));
        assert!(opts.all_refs);
        assert!(opts.include_merge_diffs);
    }

    #[test]
    fn non_repository_is_a_git_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = mine_commits(dir.path(), &MiningOptions::default());
        assert!(matches!(result, Err(ChurnError::Git(_))));
    }

    #[test]
    fn epoch_fallback_for_out_of_range_timestamps() {
        assert_eq!(to_utc(i64::MAX), DateTime::<Utc>::default());
        assert_eq!(to_utc(0).timestamp(), 0);
    }
}
