//! Core domain model and aggregation logic for jobtrack.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

pub mod stats;
pub mod streak;

pub const CRATE_NAME: &str = "jobtrack-core";

/// Calendar-day key used by daily tables and `lastAppliedDate`.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Lifecycle of a saved posting. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    NotApplied,
    Applied,
}

impl JobStatus {
    /// Label as stored in the status property.
    pub fn label(self) -> &'static str {
        match self {
            Self::NotApplied => "Not Applied",
            Self::Applied => "Applied",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Not Applied" => Some(Self::NotApplied),
            "Applied" => Some(Self::Applied),
            _ => None,
        }
    }
}

/// A normalized job posting as persisted in the structured store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Fields the completion model pulls out of a raw posting.
///
/// The url is deliberately absent: it always comes from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ExtractedJob {
    #[serde(default, rename = "jobTitle", alias = "title", deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

impl ExtractedJob {
    pub fn into_record(self, url: impl Into<String>) -> JobRecord {
        JobRecord {
            id: None,
            country: self.country,
            company: self.company,
            url: url.into(),
            title: self.title,
            description: self.description,
        }
    }
}

/// A record read back from the store together with its lifecycle properties.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredJob {
    pub record: JobRecord,
    /// Raw status label; empty when the property is unset.
    pub status: String,
    /// Raw applied-date start value, `None` when the date property is null.
    pub applied_date: Option<String>,
}

impl StoredJob {
    pub fn status(&self) -> Option<JobStatus> {
        JobStatus::from_label(&self.status)
    }
}

/// Window selector for the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    PastWeek,
    PastMonth,
    #[default]
    PastYear,
}

impl DateRange {
    /// Unrecognized or missing values fall back to `PastYear`.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("PASTWEEK") => Self::PastWeek,
            Some("PASTMONTH") => Self::PastMonth,
            _ => Self::PastYear,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PastWeek => "PASTWEEK",
            Self::PastMonth => "PASTMONTH",
            Self::PastYear => "PASTYEAR",
        }
    }

    /// Number of pre-seeded days in the daily table.
    pub fn daily_window_days(self) -> u32 {
        match self {
            Self::PastWeek => 7,
            Self::PastMonth | Self::PastYear => 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResult {
    pub status_count: BTreeMap<String, u32>,
    pub company_count: BTreeMap<String, u32>,
    pub country_count: BTreeMap<String, u32>,
    pub daily_count: BTreeMap<String, u32>,
}

/// Streak summary. The `Default` value is the empty-history result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakStats {
    pub total_count: u32,
    pub max_streak: u32,
    pub current_streak: u32,
    pub last_applied_date: String,
}

/// Resume-to-posting match produced by the comparison model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobComparison {
    #[serde(deserialize_with = "deserialize_match_score")]
    pub match_score: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub missing_skills: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub experience_gap: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendations: Vec<String>,
}

// Models answer `null` for fields they could not fill.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// The prompt shows the score quoted, so models answer with either form.
fn deserialize_match_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawScore {
        Number(f64),
        Text(String),
    }

    let value = match RawScore::deserialize(deserializer)? {
        RawScore::Number(n) => n,
        RawScore::Text(text) => text
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .map_err(serde::de::Error::custom)?,
    };
    if !value.is_finite() {
        return Err(serde::de::Error::custom("match score is not a finite number"));
    }
    Ok(value.round().clamp(0.0, 100.0) as u8)
}

/// Parse an applied-date value; failures are logged and yield `None`.
pub fn parse_applied_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(value = raw, error = %err, "skipping unparsable applied date");
            None
        }
    }
}
