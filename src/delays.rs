use std::collections::HashMap;

use crate::aggregate::round_half_up;
use crate::models::{Case, Event, StageDelay};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Builds one stage delay per stage change inside each case.
///
/// Events are grouped by case, ordered by `event_date` and diffed pairwise.
/// A pair counts only when the stage name changes. Events without a case or a
/// date cannot be placed on a timeline and are skipped. `job_position` comes
/// from the matching case, if any.
pub fn derive_stage_delays(events: &[Event], cases: &[Case]) -> Vec<StageDelay> {
    let positions: HashMap<&str, &str> = cases
        .iter()
        .map(|case| (case.case_id.as_str(), case.job_position.as_str()))
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut timelines: HashMap<&str, Vec<&Event>> = HashMap::new();
    for event in events {
        let (Some(case_id), Some(_)) = (event.case_id.as_deref(), event.event_date) else {
            continue;
        };
        timelines
            .entry(case_id)
            .or_insert_with(|| {
                order.push(case_id);
                Vec::new()
            })
            .push(event);
    }

    let mut delays = Vec::new();
    for case_id in order {
        let Some(timeline) = timelines.get_mut(case_id) else {
            continue;
        };
        timeline.sort_by_key(|event| event.event_date);

        for pair in timeline.windows(2) {
            let (previous, next) = (pair[0], pair[1]);
            if previous.stage_name == next.stage_name {
                continue;
            }
            let (Some(started), Some(ended)) = (previous.event_date, next.event_date) else {
                continue;
            };
            let elapsed = (ended - started).num_milliseconds() as f64 / MILLIS_PER_DAY;
            let delay_days = round_half_up(elapsed).max(0.0);

            delays.push(StageDelay {
                id: format!("{}-{}", previous.event_id, next.event_id),
                case_id: Some(case_id.to_string()),
                department: next.department.clone(),
                job_position: positions
                    .get(case_id)
                    .filter(|position| !position.is_empty())
                    .map(|position| position.to_string()),
                from_stage: previous.stage_name.clone(),
                to_stage: next.stage_name.clone(),
                avg_delay_days: delay_days,
                max_delay_days: Some(delay_days),
                transition_count: 1,
            });
        }
    }

    delays
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap()
    }

    fn event(event_id: &str, case_id: &str, stage: &str, day: i64) -> Event {
        Event {
            id: event_id.to_string(),
            event_id: event_id.to_string(),
            case_id: Some(case_id.to_string()),
            event_type: "status change".to_string(),
            stage_name: stage.to_string(),
            event_date: Some(base() + Duration::days(day)),
            department: Some("Engineering".to_string()),
            duration_days: None,
            stage_order: None,
            assignee: None,
            created_at: base(),
        }
    }

    fn case(case_id: &str, position: &str) -> Case {
        Case {
            id: case_id.to_string(),
            case_id: case_id.to_string(),
            job_position: position.to_string(),
            department: Some("Engineering".to_string()),
            status: "In Progress".to_string(),
            time_to_hire: Some(20),
            start_date: None,
            completion_date: None,
            created_at: base(),
            created_at_defaulted: false,
            priority: None,
        }
    }

    #[test]
    fn orders_events_by_date_before_diffing() {
        let events = vec![
            event("3", "1", "Offer", 9),
            event("1", "1", "Applied", 0),
            event("2", "1", "Interview", 4),
        ];

        let delays = derive_stage_delays(&events, &[case("1", "Backend Engineer")]);
        assert_eq!(delays.len(), 2);
        assert_eq!(delays[0].from_stage, "Applied");
        assert_eq!(delays[0].to_stage, "Interview");
        assert_eq!(delays[0].avg_delay_days, 4.0);
        assert_eq!(delays[0].id, "1-2");
        assert_eq!(delays[1].from_stage, "Interview");
        assert_eq!(delays[1].to_stage, "Offer");
        assert_eq!(delays[1].avg_delay_days, 5.0);
        assert_eq!(delays[1].job_position.as_deref(), Some("Backend Engineer"));
        assert!(delays.iter().all(|delay| delay.transition_count == 1));
    }

    #[test]
    fn ignores_repeated_stages_and_other_cases() {
        let events = vec![
            event("1", "1", "Applied", 0),
            event("2", "2", "Applied", 1),
            event("3", "1", "Applied", 2),
            event("4", "2", "Screening", 3),
        ];

        let delays = derive_stage_delays(&events, &[]);
        assert_eq!(delays.len(), 1);
        assert_eq!(delays[0].case_id.as_deref(), Some("2"));
        assert_eq!(delays[0].avg_delay_days, 2.0);
        assert_eq!(delays[0].job_position, None);
    }

    #[test]
    fn skips_events_without_dates() {
        let mut undated = event("2", "1", "Interview", 0);
        undated.event_date = None;
        let events = vec![event("1", "1", "Applied", 0), undated];
        assert!(derive_stage_delays(&events, &[]).is_empty());
    }
}
