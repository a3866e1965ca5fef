use std::{fmt, sync::OnceLock};

use regex::Regex;
use thiserror::Error;

const PERIOD_PATTERN: &str = r"^(\d*[1-9]\d*[yMwdhm]\s*)+$";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Invalid period format: '{0}'. Use formats like '7d', '1w', '2M', '1y', or '1y 2M 1w'")]
    InvalidFormat(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Period(String);

impl Period {
    pub fn parse(value: &str) -> Result<Self, PeriodError> {
        let trimmed = value.trim();
        if !period_regex().is_match(trimmed) {
            return Err(PeriodError::InvalidFormat(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn involvement_query(period: &Period) -> String {
    format!(
        "(reporter: me or Assignee: me or mentions: me or has: star) and updated: {{minus {period}}} .. Today"
    )
}

fn period_regex() -> &'static Regex {
    static PERIOD_REGEX: OnceLock<Regex> = OnceLock::new();
    PERIOD_REGEX.get_or_init(|| Regex::new(PERIOD_PATTERN).expect("regex"))
}

#[cfg(test)]
mod tests {
    use super::{involvement_query, Period, PeriodError};

    #[test]
    fn accepts_single_and_compound_periods() {
        for value in ["7d", "1w", "2M", "1y", "12h", "30m", "1y 2M 1w", "1y2M"] {
            assert!(Period::parse(value).is_ok(), "expected {value} to be accepted");
        }
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let period = Period::parse("  1w \n").expect("period");
        assert_eq!(period.as_str(), "1w");
    }

    #[test]
    fn rejects_malformed_periods() {
        for value in ["7 days", "", "   ", "d7", "7", "7x", "0d", "1w and 2d"] {
            assert!(Period::parse(value).is_err(), "expected {value} to be rejected");
        }
    }

    #[test]
    fn error_names_offending_value_and_examples() {
        let error = Period::parse("7 days").expect_err("expected error");
        assert_eq!(error, PeriodError::InvalidFormat("7 days".to_string()));

        let message = error.to_string();
        assert!(message.contains("'7 days'"));
        assert!(message.contains("'1y 2M 1w'"));
    }

    #[test]
    fn builds_involvement_query() {
        let period = Period::parse("1y 2M").expect("period");
        assert_eq!(
            involvement_query(&period),
            "(reporter: me or Assignee: me or mentions: me or has: star) and updated: {minus 1y 2M} .. Today"
        );
    }
}
