use std::fmt::Write;

use crate::dashboard::Dashboard;
use crate::filter::{CaseFilter, CasePage};

const EMPTY_STATE: &str = "No data available for this selection.";

fn describe_filter(filter: &CaseFilter) -> String {
    if filter.is_unconstrained() {
        return "all cases".to_string();
    }
    let mut parts = Vec::new();
    if let Some(department) = &filter.department {
        parts.push(format!("department = {department}"));
    }
    if let Some(position) = &filter.job_position {
        parts.push(format!("position = {position}"));
    }
    if let Some(status) = &filter.status {
        parts.push(format!("status = {status}"));
    }
    match (filter.time_to_hire_min, filter.time_to_hire_max) {
        (Some(min), Some(max)) => parts.push(format!("{min}-{max} days")),
        (Some(min), None) => parts.push(format!(">= {min} days")),
        (None, Some(max)) => parts.push(format!("<= {max} days")),
        (None, None) => {}
    }
    parts.join(", ")
}

pub fn build_report(dashboard: &Dashboard, filter: &CaseFilter) -> String {
    let mut output = String::new();
    let headline = &dashboard.headline;

    let _ = writeln!(output, "# Recruitment Pipeline Efficiency Report");
    let _ = writeln!(
        output,
        "Generated {} for {}",
        dashboard.generated_at.format("%Y-%m-%d %H:%M UTC"),
        describe_filter(filter)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Headline");
    let _ = writeln!(
        output,
        "- Recruitment cases: {} ({} completed, {}%)",
        headline.total_cases, headline.completed_cases, headline.completion_rate
    );
    let _ = writeln!(
        output,
        "- Avg. time to hire: {} days (fastest {}, slowest {})",
        headline.avg_time_to_hire, dashboard.time_to_hire_range.min, dashboard.time_to_hire_range.max
    );
    let _ = writeln!(output, "- Process stages recorded: {}", headline.total_stages);
    let _ = writeln!(
        output,
        "- Avg. satisfaction: {:.1} from {} responses",
        headline.avg_satisfaction_score, headline.survey_count
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Time to Hire");
    if dashboard.monthly_trend.is_empty() {
        let _ = writeln!(output, "{EMPTY_STATE}");
    } else {
        for month in &dashboard.monthly_trend {
            let _ = writeln!(
                output,
                "- {}: avg {} days, max {} days across {} cases",
                month.month, month.avg_days, month.max_days, month.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Departments");
    if dashboard.departments.is_empty() {
        let _ = writeln!(output, "{EMPTY_STATE}");
    } else {
        for department in &dashboard.departments {
            let _ = writeln!(
                output,
                "- {}: {} days to hire, {} days avg process delay ({} cases)",
                department.name,
                department.avg_time_to_hire,
                department.avg_process_delay,
                department.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Slowest Stage Transitions");
    if dashboard.stage_transitions.is_empty() {
        let _ = writeln!(output, "{EMPTY_STATE}");
    } else {
        for transition in &dashboard.stage_transitions {
            let _ = writeln!(
                output,
                "- {}: {:.1} days over {} transitions",
                transition.name, transition.value, transition.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Slowest Positions");
    if dashboard.positions.is_empty() {
        let _ = writeln!(output, "{EMPTY_STATE}");
    } else {
        for position in &dashboard.positions {
            let _ = writeln!(
                output,
                "- {}: {} days ({} cases)",
                position.name, position.avg_time_to_hire, position.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "## Survey Sentiment ({} responses)",
        dashboard.sentiment_tally.total()
    );
    if dashboard.sentiment.is_empty() {
        let _ = writeln!(output, "{EMPTY_STATE}");
    } else {
        for slice in &dashboard.sentiment {
            let _ = writeln!(output, "- {} ({} responses)", slice.label, slice.value);
        }
    }
    for score in &dashboard.respondent_scores {
        let _ = writeln!(
            output,
            "- {} avg score {:.1} ({} responses)",
            score.name, score.avg_score, score.count
        );
    }

    output
}

pub fn render_case_table(page: &CasePage) -> String {
    let mut output = String::new();

    if page.rows.is_empty() {
        let _ = writeln!(output, "No cases match this search.");
        return output;
    }

    let _ = writeln!(
        output,
        "| Case | Position | Department | Status | Days | Created |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|");
    for case in &page.rows {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} |",
            case.case_id,
            case.job_position,
            case.department.as_deref().unwrap_or("N/A"),
            case.status,
            case.time_to_hire
                .map(|days| days.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            case.created_at.format("%Y-%m-%d")
        );
    }
    let _ = writeln!(
        output,
        "Page {} of {} ({} matching cases)",
        page.page, page.page_count, page.total_matches
    );

    output
}

pub fn export_json(dashboard: &Dashboard) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(dashboard)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::filter::{evaluate, CaseQuery};
    use crate::normalize::Normalizer;
    use crate::snapshot::{RawSnapshot, Snapshot};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn empty_dashboard_reports_empty_states() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let dashboard = Dashboard::build(&Snapshot::default(), &AnalyticsConfig::default(), now);
        let report = build_report(&dashboard, &CaseFilter::default());

        assert!(report.contains("Generated 2026-05-01 00:00 UTC for all cases"));
        assert_eq!(report.matches(EMPTY_STATE).count(), 5);
        assert!(report.contains("- Recruitment cases: 0 (0 completed, 0%)"));
    }

    #[test]
    fn report_lists_departments_and_filter() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let raw: RawSnapshot = serde_json::from_value(json!({
            "cases": [
                {"case_id": 1, "department": "Eng", "hiring_status": "Completed", "time_to_hire": 10, "created_at": "2026-04-02"},
                {"case_id": 2, "department": "Eng", "hiring_status": "Completed", "time_to_hire": 20, "created_at": "2026-04-03"}
            ]
        }))
        .unwrap();
        let snapshot = raw.normalize(&Normalizer::new(now)).snapshot;
        let dashboard = Dashboard::build(&snapshot, &AnalyticsConfig::default(), now);
        let filter = CaseFilter {
            department: Some("Eng".to_string()),
            time_to_hire_min: Some(5),
            ..CaseFilter::default()
        };

        let report = build_report(&dashboard, &filter);
        assert!(report.contains("for department = Eng, >= 5 days"));
        assert!(report.contains("- Eng: 15 days to hire, 0 days avg process delay (2 cases)"));

        let table = render_case_table(&evaluate(&snapshot.cases, &CaseQuery::default(), 10));
        assert!(table.contains("| 2 |  | Eng | Completed | 20 | 2026-04-03 |"));
        assert!(table.contains("Page 1 of 1 (2 matching cases)"));
    }
}
