//! Text and Markdown rendering for analysis results.
//!
//! JSON output is produced directly from the serde models in `main`.

use churnlens_history::authors::AuthorChurn;
use churnlens_history::branch_tips::EnrichedCommit;
use churnlens_history::coupling::FileCoupling;
use churnlens_history::daily::CommitDailySummary;
use churnlens_history::file_churn::FileChurn;
use churnlens_history::module_churn::ModuleChurn;
use churnlens_history::report::{BranchSummary, HistoryReport};

const RULE: &str = "------------------------------------------------------------------------";

fn short(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}

/// The newest `limit` entries of an oldest-first sequence.
fn latest<T>(items: &[T], limit: usize) -> &[T] {
    &items[items.len().saturating_sub(limit)..]
}

fn heading(title: &str, shown: usize, total: usize) -> String {
    if shown < total {
        format!("{title} (top {shown} of {total}):\n{RULE}\n")
    } else {
        format!("{title} ({total}):\n{RULE}\n")
    }
}

pub fn files_text(files: &[FileChurn], limit: usize) -> String {
    let shown = files.len().min(limit);
    let mut out = heading("File churn", shown, files.len());
    if files.is_empty() {
        out.push_str("  No file changes in range.\n");
        return out;
    }
    for (i, f) in files.iter().take(limit).enumerate() {
        out.push_str(&format!(
            "{:>3}. {:<44} +{}/-{}  commits={}  cloc={}  last={}\n",
            i + 1,
            f.path,
            f.lines_added,
            f.lines_deleted,
            f.commits,
            f.cloc,
            f.last_commit.format("%Y-%m-%d"),
        ));
    }
    out
}

pub fn files_markdown(files: &[FileChurn], limit: usize) -> String {
    let mut out = String::from("## File Churn\n\n");
    if files.is_empty() {
        out.push_str("No file changes in range.\n\n");
        return out;
    }
    out.push_str("| Rank | File | Commits | +/- | Churn | LoC | Created | Last Commit |\n");
    out.push_str("|------|------|---------|-----|-------|-----|---------|-------------|\n");
    for (i, f) in files.iter().take(limit).enumerate() {
        out.push_str(&format!(
            "| {} | `{}` | {} | +{}/-{} | {} | {} | {} | {} |\n",
            i + 1,
            f.path,
            f.commits,
            f.lines_added,
            f.lines_deleted,
            f.lines_add_del,
            f.cloc,
            f.created.format("%Y-%m-%d"),
            f.last_commit.format("%Y-%m-%d"),
        ));
    }
    out.push('\n');
    out
}

pub fn modules_text(modules: &[&ModuleChurn], limit: usize) -> String {
    let shown = modules.len().min(limit);
    let mut out = heading("Module churn", shown, modules.len());
    if modules.is_empty() {
        out.push_str("  No modules in range.\n");
        return out;
    }
    for (i, m) in modules.iter().take(limit).enumerate() {
        out.push_str(&format!(
            "{:>3}. {:<36} depth={}  churn={} (own {})  files={}  cloc={}\n",
            i + 1,
            m.path,
            m.depth,
            m.subtree.lines_add_del,
            m.own.lines_add_del,
            m.subtree.num_churned_files,
            m.subtree.cloc,
        ));
    }
    out
}

pub fn modules_markdown(modules: &[&ModuleChurn], limit: usize) -> String {
    let mut out = String::from("## Module Churn\n\n");
    if modules.is_empty() {
        out.push_str("No modules in range.\n\n");
        return out;
    }
    out.push_str("| Module | Depth | Churn | Own Churn | Churned Files | LoC |\n");
    out.push_str("|--------|-------|-------|-----------|---------------|-----|\n");
    for m in modules.iter().take(limit) {
        out.push_str(&format!(
            "| `{}` | {} | {} | {} | {} | {} |\n",
            m.path,
            m.depth,
            m.subtree.lines_add_del,
            m.own.lines_add_del,
            m.subtree.num_churned_files,
            m.subtree.cloc,
        ));
    }
    out.push('\n');
    out
}

pub fn coupling_text(pairs: &[FileCoupling], limit: usize) -> String {
    let shown = pairs.len().min(limit);
    let mut out = heading("Co-change coupling", shown, pairs.len());
    if pairs.is_empty() {
        out.push_str("  No files changed together.\n");
        return out;
    }
    for pair in pairs.iter().take(limit) {
        out.push_str(&format!(
            "  {} <-> {} (together={}, ratio={:.3}, {}/{} commits)\n",
            pair.path,
            pair.coupled_file,
            pair.how_many_times,
            pair.how_many_times_vs_tot_commits,
            pair.tot_commit_for_file,
            pair.tot_commits_for_coupled_file,
        ));
    }
    out
}

pub fn coupling_markdown(pairs: &[FileCoupling], limit: usize) -> String {
    let mut out = String::from("## Co-change Coupling\n\n");
    if pairs.is_empty() {
        out.push_str("No files changed together.\n\n");
        return out;
    }
    out.push_str("| File | Coupled File | Together | Ratio | File Commits | Coupled Commits |\n");
    out.push_str("|------|--------------|----------|-------|--------------|-----------------|\n");
    for pair in pairs.iter().take(limit) {
        out.push_str(&format!(
            "| `{}` | `{}` | {} | {:.3} | {} | {} |\n",
            pair.path,
            pair.coupled_file,
            pair.how_many_times,
            pair.how_many_times_vs_tot_commits,
            pair.tot_commit_for_file,
            pair.tot_commits_for_coupled_file,
        ));
    }
    out.push('\n');
    out
}

pub fn authors_text(authors: &[AuthorChurn], limit: usize) -> String {
    let shown = authors.len().min(limit);
    let mut out = heading("Author churn", shown, authors.len());
    if authors.is_empty() {
        out.push_str("  No authors in range.\n");
        return out;
    }
    for (i, a) in authors.iter().take(limit).enumerate() {
        out.push_str(&format!(
            "{:>3}. {:<28} +{}/-{}  commits={}  active {} .. {}\n",
            i + 1,
            a.author_name,
            a.lines_added,
            a.lines_deleted,
            a.commits,
            a.first_commit.format("%Y-%m-%d"),
            a.last_commit.format("%Y-%m-%d"),
        ));
    }
    out
}

pub fn authors_markdown(authors: &[AuthorChurn], limit: usize) -> String {
    let mut out = String::from("## Author Churn\n\n");
    if authors.is_empty() {
        out.push_str("No authors in range.\n\n");
        return out;
    }
    out.push_str("| Author | Commits | +/- | Churn | First Commit | Last Commit |\n");
    out.push_str("|--------|---------|-----|-------|--------------|-------------|\n");
    for a in authors.iter().take(limit) {
        out.push_str(&format!(
            "| {} | {} | +{}/-{} | {} | {} | {} |\n",
            a.author_name,
            a.commits,
            a.lines_added,
            a.lines_deleted,
            a.lines_add_del,
            a.first_commit.format("%Y-%m-%d"),
            a.last_commit.format("%Y-%m-%d"),
        ));
    }
    out.push('\n');
    out
}

pub fn daily_text(days: &[CommitDailySummary], limit: usize) -> String {
    let shown = latest(days, limit);
    let mut out = if shown.len() < days.len() {
        format!("Daily summary (latest {} of {} days):\n{RULE}\n", shown.len(), days.len())
    } else {
        format!("Daily summary ({} days):\n{RULE}\n", days.len())
    };
    for d in shown {
        out.push_str(&format!(
            "  {}  commits={:<3} tips={:<3} ({:+})  merged={}  dangling={}  churn={}\n",
            d.day,
            d.number_of_commits,
            d.branch_tips.len(),
            d.delta_branch_tips,
            d.number_of_commits_merged_in_the_day,
            d.number_of_commits_with_no_future_children,
            d.lines_add_del,
        ));
    }
    out
}

pub fn daily_markdown(days: &[CommitDailySummary], limit: usize) -> String {
    let mut out = String::from("## Daily Summary\n\n");
    if days.is_empty() {
        out.push_str("No commits in range.\n\n");
        return out;
    }
    out.push_str("| Day | Commits | Tips | Delta | Merged | No Future Children | Churn |\n");
    out.push_str("|-----|---------|------|-------|--------|--------------------|-------|\n");
    for d in latest(days, limit) {
        out.push_str(&format!(
            "| {} | {} | {} | {:+} | {} | {} | {} |\n",
            d.day,
            d.number_of_commits,
            d.branch_tips.len(),
            d.delta_branch_tips,
            d.number_of_commits_merged_in_the_day,
            d.number_of_commits_with_no_future_children,
            d.lines_add_del,
        ));
    }
    out.push('\n');
    out
}

pub fn tips_text(commits: &[EnrichedCommit], limit: usize) -> String {
    let shown = latest(commits, limit);
    let mut out = if shown.len() < commits.len() {
        format!(
            "Branch tips (latest {} of {} commits):\n{RULE}\n",
            shown.len(),
            commits.len()
        )
    } else {
        format!("Branch tips ({} commits):\n{RULE}\n", commits.len())
    };
    for e in shown {
        let mut flags = Vec::new();
        if e.is_merge {
            flags.push("merge");
        }
        if e.is_additional_branch_tip {
            flags.push("new-tip");
        }
        out.push_str(&format!(
            "  {} {}  tips={:<3} {:<14} {}\n",
            short(&e.commit.hash),
            e.commit.committer_date.format("%Y-%m-%d %H:%M"),
            e.branch_tips.len(),
            flags.join(","),
            e.commit.subject,
        ));
    }
    out
}

pub fn tips_markdown(commits: &[EnrichedCommit], limit: usize) -> String {
    let mut out = String::from("## Branch Tips\n\n");
    if commits.is_empty() {
        out.push_str("No commits in range.\n\n");
        return out;
    }
    out.push_str("| Commit | Date | Tips | Merge | New Tip | Subject |\n");
    out.push_str("|--------|------|------|-------|---------|---------|\n");
    for e in latest(commits, limit) {
        out.push_str(&format!(
            "| `{}` | {} | {} | {} | {} | {} |\n",
            short(&e.commit.hash),
            e.commit.committer_date.format("%Y-%m-%d %H:%M"),
            e.branch_tips.len(),
            if e.is_merge { "yes" } else { "" },
            if e.is_additional_branch_tip { "yes" } else { "" },
            e.commit.subject.replace('|', "\\|"),
        ));
    }
    out.push('\n');
    out
}

fn branches_text(b: &BranchSummary) -> String {
    let mut out = format!("Branch topology:\n{RULE}\n");
    out.push_str(&format!("  Commits:          {}\n", b.total_commits));
    out.push_str(&format!("  Merges:           {}\n", b.merges));
    out.push_str(&format!("  New branch tips:  {}\n", b.additional_branch_tips));
    out.push_str(&format!("  Unknown parents:  {}\n", b.unknown_parents));
    if let (Some(first), Some(last)) = (b.first_commit, b.last_commit) {
        out.push_str(&format!(
            "  Range:            {} .. {}\n",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        ));
    }
    let tips: Vec<&str> = b.final_tips.iter().map(|h| short(h)).collect();
    out.push_str(&format!("  Final tips:       {}\n", tips.join(" ")));
    out.push_str(&format!("  Abandoned tips:   {}\n", b.abandoned_tips.len()));
    out
}

fn branches_markdown(b: &BranchSummary) -> String {
    let mut out = String::from("## Branch Topology\n\n");
    out.push_str(&format!("- **Commits:** {}\n", b.total_commits));
    out.push_str(&format!("- **Merges:** {}\n", b.merges));
    out.push_str(&format!("- **New branch tips:** {}\n", b.additional_branch_tips));
    out.push_str(&format!("- **Unknown parents:** {}\n", b.unknown_parents));
    let tips: Vec<String> = b.final_tips.iter().map(|h| format!("`{}`", short(h))).collect();
    out.push_str(&format!("- **Final tips:** {}\n", tips.join(", ")));
    out.push_str(&format!("- **Abandoned tips:** {}\n\n", b.abandoned_tips.len()));
    out
}

pub fn report_text(report: &HistoryReport, limit: usize) -> String {
    let modules: Vec<&ModuleChurn> = report.modules.iter().collect();
    let mut out = branches_text(&report.branches);
    for section in [
        files_text(&report.files, limit),
        modules_text(&modules, limit),
        coupling_text(&report.coupling, limit),
        authors_text(&report.authors, limit),
        daily_text(&report.daily, limit),
    ] {
        out.push('\n');
        out.push_str(&section);
    }
    out
}

pub fn report_markdown(report: &HistoryReport, limit: usize) -> String {
    let modules: Vec<&ModuleChurn> = report.modules.iter().collect();
    let mut out = String::from("# Commit History Analysis\n\n");
    out.push_str(&branches_markdown(&report.branches));
    out.push_str(&files_markdown(&report.files, limit));
    out.push_str(&modules_markdown(&modules, limit));
    out.push_str(&coupling_markdown(&report.coupling, limit));
    out.push_str(&authors_markdown(&report.authors, limit));
    out.push_str(&daily_markdown(&report.daily, limit));
    out
}
