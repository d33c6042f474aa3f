use crate::aggregate::{round_half_up, round_to_tenth};
use crate::models::{Case, Event, HeadlineMetrics, SurveyResponse, TimeToHireRange};

pub const COMPLETED_STATUS: &str = "Completed";

pub fn headline_metrics(
    cases: &[Case],
    events: &[Event],
    surveys: &[SurveyResponse],
    completed_status: &str,
) -> HeadlineMetrics {
    let total_cases = cases.len();
    let completed_cases = cases
        .iter()
        .filter(|case| case.status == completed_status)
        .count();
    let completion_rate = if total_cases == 0 {
        0
    } else {
        round_half_up(completed_cases as f64 / total_cases as f64 * 100.0) as u32
    };

    let (days_total, days_count) = cases
        .iter()
        .filter_map(|case| case.time_to_hire)
        .fold((0u64, 0usize), |(sum, count), days| (sum + u64::from(days), count + 1));
    let avg_time_to_hire = if days_count == 0 {
        0
    } else {
        round_half_up(days_total as f64 / days_count as f64) as i64
    };

    let avg_satisfaction_score = if surveys.is_empty() {
        0.0
    } else {
        let total: f64 = surveys.iter().map(|survey| survey.overall_score).sum();
        round_to_tenth(total / surveys.len() as f64)
    };

    HeadlineMetrics {
        total_cases,
        completed_cases,
        completion_rate,
        avg_time_to_hire,
        total_stages: events.len(),
        survey_count: surveys.len(),
        avg_satisfaction_score,
    }
}

/// Fastest and slowest time-to-hire; both 0 when no case has one.
pub fn time_to_hire_range(cases: &[Case]) -> TimeToHireRange {
    let mut days = cases.iter().filter_map(|case| case.time_to_hire);
    let Some(first) = days.next() else {
        return TimeToHireRange::default();
    };
    days.fold(TimeToHireRange { min: first, max: first }, |range, value| TimeToHireRange {
        min: range.min.min(value),
        max: range.max.max(value),
    })
}
