//! Roll file churn up into directory modules.
//!
//! Every file contributes to the subtree totals of all its ancestor
//! directories and to the `own` totals of its immediate parent only, so for
//! any module: `subtree == own + sum(children.subtree)`.
//!
//! The root module is `"."`. Module paths keep the prefix style of the input:
//! `a/b/f.ts` rolls into `a/b`, `a`, `.`; `./a/f.ts` rolls into `./a`, `.`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::file_churn::FileChurn;

/// Path of the repository root module.
pub const ROOT_MODULE: &str = ".";

/// Additive churn counters shared by subtree and own totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnTotals {
    pub cloc: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub lines_add_del: u64,
    /// Files with at least one commit inside the churn window.
    pub num_churned_files: u64,
}

impl ChurnTotals {
    fn absorb(&mut self, file: &FileChurn) {
        self.cloc += file.cloc;
        self.lines_added += file.lines_added;
        self.lines_deleted += file.lines_deleted;
        self.lines_add_del += file.lines_add_del;
        if file.commits > 0 {
            self.num_churned_files += 1;
        }
    }
}

impl std::ops::Add for ChurnTotals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            cloc: self.cloc + rhs.cloc,
            lines_added: self.lines_added + rhs.lines_added,
            lines_deleted: self.lines_deleted + rhs.lines_deleted,
            lines_add_del: self.lines_add_del + rhs.lines_add_del,
            num_churned_files: self.num_churned_files + rhs.num_churned_files,
        }
    }
}

/// Churn for one directory module.
///
/// Subtree totals serialize at the top level; the direct-file totals nest
/// under `own`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleChurn {
    pub path: String,
    /// Segment count below the root; the root itself is 0.
    pub depth: usize,
    /// Totals for every file anywhere under this module.
    #[serde(flatten)]
    pub subtree: ChurnTotals,
    /// Totals for files directly inside this module.
    pub own: ChurnTotals,
}

/// Folds [`FileChurn`] entries into per-module aggregates.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use churnlens_history::file_churn::FileChurn;
/// use churnlens_history::module_churn::ModuleChurnAggregator;
///
/// let file = FileChurn {
///     path: "a/b/f.ts".into(),
///     cloc: 50,
///     commits: 1,
///     lines_added: 7,
///     lines_deleted: 3,
///     lines_add_del: 10,
///     created: Utc::now(),
///     last_commit: Utc::now(),
/// };
///
/// let mut agg = ModuleChurnAggregator::new();
/// agg.add(&file);
/// let a = agg.get("a").unwrap();
/// assert_eq!(a.own.lines_add_del, 0);
/// assert_eq!(a.subtree.lines_add_del, 10);
/// ```
#[derive(Debug, Default)]
pub struct ModuleChurnAggregator {
    modules: IndexMap<String, ModuleChurn>,
}

impl ModuleChurnAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file: &FileChurn) {
        let ancestors = ancestor_modules(&file.path);
        for (i, module_path) in ancestors.iter().enumerate() {
            let module = self
                .modules
                .entry(module_path.clone())
                .or_insert_with(|| ModuleChurn {
                    path: module_path.clone(),
                    depth: module_depth(module_path),
                    subtree: ChurnTotals::default(),
                    own: ChurnTotals::default(),
                });
            module.subtree.absorb(file);
            if i == 0 {
                module.own.absorb(file);
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&ModuleChurn> {
        self.modules.get(path)
    }

    /// Modules sorted by subtree `lines_add_del` descending; ties keep
    /// first-seen order.
    pub fn finish(self) -> Vec<ModuleChurn> {
        let mut modules: Vec<ModuleChurn> = self.modules.into_values().collect();
        modules.sort_by(|a, b| b.subtree.lines_add_del.cmp(&a.subtree.lines_add_del));
        modules
    }
}

/// Compute module churn for a set of file churn entries.
pub fn module_churn(files: &[FileChurn]) -> Vec<ModuleChurn> {
    let mut aggregator = ModuleChurnAggregator::new();
    for file in files {
        aggregator.add(file);
    }
    aggregator.finish()
}

/// Ancestor modules of `file_path`, nearest first, ending with the root.
///
/// # Examples
///
/// ```
/// use churnlens_history::module_churn::ancestor_modules;
///
/// assert_eq!(ancestor_modules("a/b/c.ts"), vec!["a/b", "a", "."]);
/// assert_eq!(ancestor_modules("./src/main.rs"), vec!["./src", "."]);
/// assert_eq!(ancestor_modules("README.md"), vec!["."]);
/// ```
pub fn ancestor_modules(file_path: &str) -> Vec<String> {
    let mut ancestors = Vec::new();
    let mut current = file_path;
    while let Some(idx) = current.rfind('/') {
        current = &current[..idx];
        if current.is_empty() || current == ROOT_MODULE {
            break;
        }
        ancestors.push(current.to_string());
    }
    ancestors.push(ROOT_MODULE.to_string());
    ancestors
}

/// Depth of a module path: `/`-separated segments of its `./`-rooted form,
/// minus one.
///
/// # Examples
///
/// ```
/// use churnlens_history::module_churn::module_depth;
///
/// assert_eq!(module_depth("."), 0);
/// assert_eq!(module_depth("a"), 1);
/// assert_eq!(module_depth("./a/b"), 2);
/// ```
pub fn module_depth(module_path: &str) -> usize {
    if module_path == ROOT_MODULE {
        return 0;
    }
    let relative = module_path.strip_prefix("./").unwrap_or(module_path);
    relative.split('/').filter(|s| !s.is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn file(path: &str, added: u64, deleted: u64, cloc: u64) -> FileChurn {
        let when = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        FileChurn {
            path: path.into(),
            cloc,
            commits: 1,
            lines_added: added,
            lines_deleted: deleted,
            lines_add_del: added + deleted,
            created: when,
            last_commit: when,
        }
    }

    fn find<'a>(modules: &'a [ModuleChurn], path: &str) -> &'a ModuleChurn {
        modules
            .iter()
            .find(|m| m.path == path)
            .unwrap_or_else(|| panic!("module {path} missing"))
    }

    fn is_descendant(module: &str, of: &str) -> bool {
        if of == ROOT_MODULE {
            return true;
        }
        module == of || module.starts_with(&format!("{of}/"))
    }

    #[test]
    fn single_file_rolls_up_to_every_ancestor() {
        let modules = module_churn(&[file("a/b/f.ts", 6, 4, 30)]);
        assert_eq!(modules.len(), 3);

        let ab = find(&modules, "a/b");
        assert_eq!(ab.own.lines_add_del, 10);
        assert_eq!(ab.subtree.lines_add_del, 10);
        assert_eq!(ab.depth, 2);

        let a = find(&modules, "a");
        assert_eq!(a.own.lines_add_del, 0);
        assert_eq!(a.subtree.lines_add_del, 10);
        assert_eq!(a.depth, 1);

        let root = find(&modules, ".");
        assert_eq!(root.subtree.cloc, 30);
        assert_eq!(root.subtree.num_churned_files, 1);
        assert_eq!(root.depth, 0);
    }

    #[test]
    fn root_level_files_are_owned_by_root() {
        let modules = module_churn(&[file("README.md", 2, 0, 5), file("src/lib.rs", 1, 1, 9)]);
        let root = find(&modules, ".");
        assert_eq!(root.own.lines_add_del, 2);
        assert_eq!(root.own.num_churned_files, 1);
        assert_eq!(root.subtree.lines_add_del, 4);
        assert_eq!(root.subtree.num_churned_files, 2);
    }

    #[test]
    fn subtree_equals_own_plus_children() {
        let files = vec![
            file("src/main.rs", 10, 2, 100),
            file("src/cli/args.rs", 3, 3, 40),
            file("src/cli/run.rs", 1, 0, 20),
            file("src/core/deep/x.rs", 7, 7, 70),
            file("docs/guide.md", 5, 0, 50),
            file("Cargo.toml", 1, 1, 10),
        ];
        let modules = module_churn(&files);

        for module in &modules {
            let children: ChurnTotals = modules
                .iter()
                .filter(|m| m.depth == module.depth + 1 && is_descendant(&m.path, &module.path))
                .fold(ChurnTotals::default(), |acc, m| acc + m.subtree);
            assert_eq!(module.subtree, module.own + children, "module {}", module.path);

            let own_below: u64 = modules
                .iter()
                .filter(|m| is_descendant(&m.path, &module.path))
                .map(|m| m.own.lines_add_del)
                .sum();
            assert_eq!(own_below, module.subtree.lines_add_del, "module {}", module.path);
        }
    }

    #[test]
    fn files_outside_the_window_count_cloc_but_not_as_churned() {
        let mut stale = file("lib/old.rs", 0, 0, 80);
        stale.commits = 0;
        let modules = module_churn(&[stale, file("lib/new.rs", 2, 0, 20)]);
        let lib = find(&modules, "lib");
        assert_eq!(lib.own.cloc, 100);
        assert_eq!(lib.own.num_churned_files, 1);
    }

    #[test]
    fn dot_prefixed_paths_use_dot_rooted_modules() {
        let modules = module_churn(&[file("./app/core/x.ts", 1, 0, 1)]);
        let paths: Vec<&str> = modules.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["./app/core", "./app", "."]);
        assert_eq!(find(&modules, "./app/core").depth, 2);
    }

    #[test]
    fn deep_paths_do_not_recurse() {
        let deep: String = (0..500).map(|i| format!("d{i}/")).collect::<String>() + "leaf.rs";
        let ancestors = ancestor_modules(&deep);
        assert_eq!(ancestors.len(), 501);
        assert_eq!(ancestors.last().map(String::as_str), Some("."));
    }

    #[test]
    fn module_json_flattens_subtree_and_nests_own() {
        let modules = module_churn(&[file("a/f.ts", 1, 2, 3)]);
        let json = serde_json::to_value(find(&modules, "a")).unwrap();
        assert_eq!(json["linesAddDel"], 3);
        assert_eq!(json["own"]["linesAddDel"], 3);
        assert_eq!(json["numChurnedFiles"], 1);
    }
}
