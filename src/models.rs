use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recruitment pipeline instance after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub case_id: String,
    pub job_position: String,
    pub department: Option<String>,
    pub status: String,
    /// Whole days; `None` keeps the case out of every time-to-hire aggregate.
    pub time_to_hire: Option<u32>,
    pub start_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Set when `created_at` was absent and filled with the evaluation time.
    pub created_at_defaulted: bool,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub event_id: String,
    pub case_id: Option<String>,
    pub event_type: String,
    pub stage_name: String,
    pub event_date: Option<DateTime<Utc>>,
    pub department: Option<String>,
    pub duration_days: Option<f64>,
    pub stage_order: Option<i64>,
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: String,
    pub response_id: String,
    pub case_id: Option<String>,
    pub respondent_type: Option<String>,
    pub overall_score: f64,
    pub sentiment: Sentiment,
    pub feedback_text: Option<String>,
    pub response_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Delay summary for one stage transition, either precomputed by the store or
/// derived from events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDelay {
    pub id: String,
    pub case_id: Option<String>,
    pub department: Option<String>,
    pub job_position: Option<String>,
    pub from_stage: String,
    pub to_stage: String,
    pub avg_delay_days: f64,
    pub max_delay_days: Option<f64>,
    pub transition_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Unknown,
}

impl Sentiment {
    pub const ALL: [Sentiment; 4] = [
        Sentiment::Positive,
        Sentiment::Neutral,
        Sentiment::Negative,
        Sentiment::Unknown,
    ];

    /// Case-insensitive; anything outside the three polarities is `Unknown`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("positive") => Sentiment::Positive,
            Some("neutral") => Sentiment::Neutral,
            Some("negative") => Sentiment::Negative,
            _ => Sentiment::Unknown,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
            Sentiment::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// Output rows. Field names are bound by the chart layer, hence camelCase.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentComparison {
    pub name: String,
    pub count: usize,
    pub avg_time_to_hire: i64,
    pub avg_process_delay: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTransition {
    pub name: String,
    pub value: f64,
    pub count: u64,
    pub from_stage: String,
    pub to_stage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    pub month: String,
    pub count: usize,
    pub avg_days: i64,
    pub max_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSummary {
    pub name: String,
    pub count: usize,
    pub avg_time_to_hire: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondentScore {
    pub name: String,
    pub count: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentTally {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub unknown: usize,
}

impl SentimentTally {
    pub fn get(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::Negative => self.negative,
            Sentiment::Unknown => self.unknown,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative + self.unknown
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSlice {
    pub name: String,
    pub value: usize,
    pub percent: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlineMetrics {
    pub total_cases: usize,
    pub completed_cases: usize,
    pub completion_rate: u32,
    pub avg_time_to_hire: i64,
    pub total_stages: usize,
    pub survey_count: usize,
    pub avg_satisfaction_score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeToHireRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub departments: Vec<String>,
    pub job_positions: Vec<String>,
    pub statuses: Vec<String>,
}
