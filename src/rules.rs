//! Field-scoped post-processing applied to records after list collapse.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IngestError, IngestResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PostRule {
    /// Remove the first occurrence of `pattern` from a string field. Other value kinds pass through.
    StripLiteral { field: String, pattern: String },
    /// Parse a string field as a calendar date and store it as `YYYY-MM-DD`.
    ParseDate { field: String },
}

impl PostRule {
    pub fn strip<F: Into<String>, P: Into<String>>(field: F, pattern: P) -> Self {
        PostRule::StripLiteral { field: field.into(), pattern: pattern.into() }
    }

    pub fn date<F: Into<String>>(field: F) -> Self {
        PostRule::ParseDate { field: field.into() }
    }

    pub fn field(&self) -> &str {
        match self {
            PostRule::StripLiteral { field, .. } | PostRule::ParseDate { field } => field,
        }
    }

    pub fn apply(&self, record: &mut Map<String, Value>) -> IngestResult<()> {
        let Some(value) = record.get_mut(self.field()) else { return Ok(()) };
        match self {
            PostRule::StripLiteral { pattern, .. } => {
                if let Value::String(s) = value {
                    if !pattern.is_empty() && s.contains(pattern.as_str()) {
                        *s = s.replacen(pattern.as_str(), "", 1);
                    }
                }
                Ok(())
            }
            PostRule::ParseDate { field } => match value {
                Value::Null => Ok(()),
                Value::String(s) => {
                    let d = parse_date(s).ok_or_else(|| IngestError::invalid_value(field.as_str(), format!("'{}' is not a date", s)))?;
                    *s = d.format("%Y-%m-%d").to_string();
                    Ok(())
                }
                other => Err(IngestError::invalid_value(field.as_str(), format!("expected a date string, found {}", other))),
            },
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// Apply `rules` in order to one record.
pub fn apply_rules(rules: &[PostRule], record: &mut Map<String, Value>) -> IngestResult<()> {
    for r in rules {
        r.apply(record)?;
    }
    Ok(())
}
