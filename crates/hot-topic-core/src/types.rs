use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{HotTopicError, Result};

/// Wire format for target dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Content block in a message (text or tool_use).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| HotTopicError::InvalidDate {
        input: input.to_string(),
    })
}

/// The local calendar date of this process.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// What a pipeline run is about: an optional target date (defaults to today).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
}

impl TopicQuery {
    pub fn new(target_date: Option<NaiveDate>) -> Self {
        Self { target_date }
    }

    /// Build from the optional string carried by a request body. Blank means "today".
    pub fn from_optional_str(target_date: Option<&str>) -> Result<Self> {
        match target_date.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Ok(Self::new(Some(parse_date(s)?))),
            None => Ok(Self::default()),
        }
    }

    /// The user prompt handed to the Topic Agent.
    pub fn prompt(&self) -> String {
        match self.target_date {
            Some(date) => format!("{}の開発関連トピックを調べて教えて", date.format(DATE_FORMAT)),
            None => "今日の開発関連トピックを調べて教えて".to_string(),
        }
    }

    pub fn search_window(&self, today: NaiveDate) -> SearchWindow {
        SearchWindow::for_target(self.target_date, today)
    }
}

/// Date range used to scope the external post search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl SearchWindow {
    /// `[target - 7d, target + 1d]`, or `[today - 7d, today]` without a target.
    pub fn for_target(target: Option<NaiveDate>, today: NaiveDate) -> Self {
        match target {
            Some(date) => Self {
                from: date - Duration::days(7),
                to: date + Duration::days(1),
            },
            None => Self {
                from: today - Duration::days(7),
                to: today,
            },
        }
    }

    pub fn start_str(&self) -> String {
        self.from.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.to.format(DATE_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_window_for_target_date() {
        let window = SearchWindow::for_target(Some(date("2024-10-03")), date("2030-01-01"));
        assert_eq!(window.start_str(), "2024-09-26");
        assert_eq!(window.end_str(), "2024-10-04");
    }

    #[test]
    fn test_window_without_target_is_trailing_week() {
        let today = date("2025-03-05");
        let window = SearchWindow::for_target(None, today);
        assert_eq!(window.from, date("2025-02-26"));
        assert_eq!(window.to, today);
    }

    #[test]
    fn test_window_bounds_hold_across_month_and_year_edges() {
        for s in ["2024-01-01", "2024-02-29", "2023-12-31", "2024-03-01", "2025-07-15"] {
            let target = date(s);
            let window = SearchWindow::for_target(Some(target), target);
            assert_eq!((window.to - target).num_days(), 1, "end for {s}");
            assert_eq!((target - window.from).num_days(), 7, "start for {s}");
        }
    }

    #[test]
    fn test_window_across_leap_day() {
        let window = SearchWindow::for_target(Some(date("2024-03-02")), date("2024-03-02"));
        assert_eq!(window.start_str(), "2024-02-24");
        assert_eq!(window.end_str(), "2024-03-03");
    }

    #[test]
    fn test_parse_date_rejects_other_formats() {
        assert!(parse_date("2024/10/03").is_err());
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("yesterday").is_err());
        assert!(matches!(
            parse_date("03-10-2024"),
            Err(HotTopicError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_query_from_optional_str() {
        assert_eq!(TopicQuery::from_optional_str(None).unwrap(), TopicQuery::default());
        assert_eq!(TopicQuery::from_optional_str(Some("  ")).unwrap(), TopicQuery::default());
        let q = TopicQuery::from_optional_str(Some("2024-10-03")).unwrap();
        assert_eq!(q.target_date, Some(date("2024-10-03")));
        assert!(TopicQuery::from_optional_str(Some("not-a-date")).is_err());
    }

    #[test]
    fn test_query_prompt() {
        let q = TopicQuery::new(Some(date("2024-10-03")));
        assert_eq!(q.prompt(), "2024-10-03の開発関連トピックを調べて教えて");
        assert_eq!(TopicQuery::default().prompt(), "今日の開発関連トピックを調べて教えて");
    }

    #[test]
    fn test_query_serde_uses_iso_date() {
        let q = TopicQuery::new(Some(date("2024-10-03")));
        let json = serde_json::to_value(q).unwrap();
        assert_eq!(json["target_date"], "2024-10-03");
        let empty = serde_json::to_value(TopicQuery::default()).unwrap();
        assert!(empty.get("target_date").is_none());
    }
}
