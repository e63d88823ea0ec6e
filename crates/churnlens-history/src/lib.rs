//! Commit-history analytics: branch topology, churn, and co-change.
//!
//! Consumes an oldest-first stream of [`record::CommitRecord`]s and derives
//! branch-tip snapshots, per-day topology summaries, file and module churn,
//! file coupling, and author churn. [`mining`] produces the stream from a git
//! repository; [`report::HistoryReport`] runs everything in one call.

pub mod authors;
pub mod branch_tips;
pub mod coupling;
pub mod daily;
pub mod dangling;
pub mod file_churn;
pub mod mining;
pub mod module_churn;
pub mod record;
pub mod report;
