use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate;
use crate::config::AnalyticsConfig;
use crate::filter;
use crate::models::{
    DepartmentComparison, FilterOptions, HeadlineMetrics, MonthlyTrend, PositionSummary,
    RespondentScore, SentimentSlice, SentimentTally, StageTransition, TimeToHireRange,
};
use crate::snapshot::Snapshot;
use crate::summary;

/// Every series the dashboard renders, computed from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub headline: HeadlineMetrics,
    pub time_to_hire_range: TimeToHireRange,
    pub monthly_trend: Vec<MonthlyTrend>,
    pub departments: Vec<DepartmentComparison>,
    pub stage_transitions: Vec<StageTransition>,
    pub positions: Vec<PositionSummary>,
    pub respondent_scores: Vec<RespondentScore>,
    pub sentiment_tally: SentimentTally,
    pub sentiment: Vec<SentimentSlice>,
    pub filter_options: FilterOptions,
}

impl Dashboard {
    pub fn build(snapshot: &Snapshot, config: &AnalyticsConfig, now: DateTime<Utc>) -> Self {
        let sentiment_tally = aggregate::sentiment_tally(&snapshot.surveys);

        Self {
            generated_at: now,
            headline: summary::headline_metrics(
                &snapshot.cases,
                &snapshot.events,
                &snapshot.surveys,
                &config.completed_status,
            ),
            time_to_hire_range: summary::time_to_hire_range(&snapshot.cases),
            monthly_trend: aggregate::monthly_trend(&snapshot.cases, now, config.trend_months),
            departments: aggregate::department_comparison(&snapshot.cases, &snapshot.stage_delays),
            stage_transitions: aggregate::stage_transitions(&snapshot.stage_delays, config.top_n),
            positions: aggregate::position_summary(&snapshot.cases, config.top_n),
            respondent_scores: aggregate::respondent_scores(&snapshot.surveys),
            sentiment: aggregate::sentiment_breakdown(&sentiment_tally),
            sentiment_tally,
            filter_options: filter::filter_options(&snapshot.cases),
        }
    }
}
