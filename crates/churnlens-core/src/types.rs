use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChurnError;

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use churnlens_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Grouping used to decide which files "changed together".
///
/// # Examples
///
/// ```
/// use churnlens_core::CoChangeWindow;
///
/// let window: CoChangeWindow = "day".parse().unwrap();
/// assert_eq!(window, CoChangeWindow::Day);
/// assert_eq!(CoChangeWindow::default(), CoChangeWindow::Commit);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoChangeWindow {
    /// Files touched by the same commit.
    #[default]
    Commit,
    /// Files touched by any commit on the same calendar day (UTC).
    Day,
}

impl fmt::Display for CoChangeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoChangeWindow::Commit => write!(f, "commit"),
            CoChangeWindow::Day => write!(f, "day"),
        }
    }
}

impl FromStr for CoChangeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "commit" => Ok(CoChangeWindow::Commit),
            "day" => Ok(CoChangeWindow::Day),
            other => Err(format!("unknown co-change window: {other}")),
        }
    }
}

/// Parse a cutoff date given as `YYYY-MM-DD` (midnight UTC) or RFC 3339.
///
/// # Errors
///
/// Returns [`ChurnError::InvalidDate`] when neither form matches.
///
/// # Examples
///
/// ```
/// use churnlens_core::parse_date;
///
/// let day = parse_date("2024-03-01").unwrap();
/// assert_eq!(day.to_rfc3339(), "2024-03-01T00:00:00+00:00");
///
/// let ts = parse_date("2024-03-01T10:30:00+02:00").unwrap();
/// assert_eq!(ts.to_rfc3339(), "2024-03-01T08:30:00+00:00");
/// ```
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, ChurnError> {
    let trimmed = input.trim();
    if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ChurnError::InvalidDate(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "markdown".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Markdown.to_string(), "markdown");
    }

    #[test]
    fn co_change_window_round_trips_through_display() {
        for window in [CoChangeWindow::Commit, CoChangeWindow::Day] {
            assert_eq!(window.to_string().parse::<CoChangeWindow>(), Ok(window));
        }
        assert!("week".parse::<CoChangeWindow>().is_err());
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(matches!(
            parse_date("last tuesday"),
            Err(ChurnError::InvalidDate(_))
        ));
        assert!(parse_date("2024-13-01").is_err());
    }

    #[test]
    fn parse_date_trims_whitespace() {
        let day = parse_date(" 2023-12-31 ").unwrap();
        assert_eq!(day.date_naive().to_string(), "2023-12-31");
    }
}
