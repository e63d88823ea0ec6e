//! Core types, configuration, and error handling for churnlens.
//!
//! This crate provides the shared foundation used by the history engine and
//! the command-line binary:
//! - [`ChurnError`]: unified error type using `thiserror`
//! - [`ChurnConfig`]: configuration loaded from `.churnlens.toml`
//! - Shared types: [`OutputFormat`], [`CoChangeWindow`], and date parsing via
//!   [`parse_date`]

mod config;
mod error;
mod types;

pub use config::{ChurnConfig, CouplingConfig, HistoryConfig, OutputConfig};
pub use error::ChurnError;
pub use types::{parse_date, CoChangeWindow, OutputFormat};

/// A convenience `Result` type for churnlens operations.
pub type Result<T> = std::result::Result<T, ChurnError>;
