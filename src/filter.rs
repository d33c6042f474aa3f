use std::cmp::Ordering;
use std::collections::HashSet;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::models::{Case, FilterOptions};

/// Structured case filter. `None` leaves a dimension unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseFilter {
    pub department: Option<String>,
    pub job_position: Option<String>,
    pub status: Option<String>,
    pub time_to_hire_min: Option<u32>,
    pub time_to_hire_max: Option<u32>,
}

impl CaseFilter {
    pub fn is_unconstrained(&self) -> bool {
        self == &CaseFilter::default()
    }

    /// Exact match on categories, inclusive bounds on time-to-hire. A case
    /// without a time-to-hire fails any range bound.
    pub fn matches(&self, case: &Case) -> bool {
        if let Some(department) = &self.department {
            if case.department.as_deref() != Some(department.as_str()) {
                return false;
            }
        }
        if let Some(position) = &self.job_position {
            if &case.job_position != position {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if &case.status != status {
                return false;
            }
        }
        if self.time_to_hire_min.is_none() && self.time_to_hire_max.is_none() {
            return true;
        }
        let Some(days) = case.time_to_hire else {
            return false;
        };
        self.time_to_hire_min.map_or(true, |min| days >= min)
            && self.time_to_hire_max.map_or(true, |max| days <= max)
    }
}

/// Case-insensitive substring search over position, department, status and id.
/// The term is used as typed, so only an empty term matches everything.
pub fn matches_search(case: &Case, term: &str) -> bool {
    let needle = term.to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [
        Some(case.job_position.as_str()),
        case.department.as_deref(),
        Some(case.status.as_str()),
        Some(case.case_id.as_str()),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CaseId,
    JobPosition,
    Department,
    Status,
    TimeToHire,
    StartDate,
    CompletionDate,
    CreatedAt,
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            field: SortField::TimeToHire,
            direction: SortDirection::Desc,
        }
    }
}

impl SortState {
    /// Time-to-hire opens slowest first; every other field opens ascending.
    pub fn for_field(field: SortField) -> Self {
        let direction = match field {
            SortField::TimeToHire => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        Self { field, direction }
    }

    /// Same field flips the direction; a new field starts ascending.
    pub fn toggle(self, field: SortField) -> Self {
        if self.field == field {
            Self {
                field,
                direction: self.direction.flipped(),
            }
        } else {
            Self {
                field,
                direction: SortDirection::Asc,
            }
        }
    }

    pub fn compare(&self, a: &Case, b: &Case) -> Ordering {
        let ordering = match self.field {
            SortField::CaseId => text_cmp(&a.case_id, &b.case_id),
            SortField::JobPosition => text_cmp(&a.job_position, &b.job_position),
            SortField::Department => optional_text_cmp(a.department.as_deref(), b.department.as_deref()),
            SortField::Status => text_cmp(&a.status, &b.status),
            SortField::TimeToHire => a.time_to_hire.cmp(&b.time_to_hire),
            SortField::StartDate => a.start_date.cmp(&b.start_date),
            SortField::CompletionDate => a.completion_date.cmp(&b.completion_date),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Priority => optional_text_cmp(a.priority.as_deref(), b.priority.as_deref()),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Collation-style comparison: letters compare case-insensitively first and
/// only fall back to the raw bytes to break ties.
fn text_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn optional_text_cmp(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => text_cmp(a, b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseQuery {
    pub search: String,
    pub filter: CaseFilter,
    pub sort: SortState,
    /// One-based; 0 is read as the first page.
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CasePage {
    pub rows: Vec<Case>,
    pub total_matches: usize,
    pub page: usize,
    pub page_count: usize,
}

/// Filters, searches, sorts and slices out one page of cases.
pub fn evaluate(cases: &[Case], query: &CaseQuery, page_size: usize) -> CasePage {
    let mut matched: Vec<&Case> = cases
        .iter()
        .filter(|case| query.filter.matches(case))
        .filter(|case| matches_search(case, &query.search))
        .collect();
    matched.sort_by(|a, b| query.sort.compare(a, b));

    let page_size = page_size.max(1);
    let total_matches = matched.len();
    let page = query.page.max(1);
    let rows = matched
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .cloned()
        .collect();

    CasePage {
        rows,
        total_matches,
        page,
        page_count: total_matches.div_ceil(page_size),
    }
}

/// Distinct non-empty picker values in first-seen order.
pub fn filter_options(cases: &[Case]) -> FilterOptions {
    fn push_unique(seen: &mut HashSet<String>, values: &mut Vec<String>, value: &str) {
        if !value.is_empty() && seen.insert(value.to_string()) {
            values.push(value.to_string());
        }
    }

    let mut options = FilterOptions::default();
    let (mut departments, mut positions, mut statuses) =
        (HashSet::new(), HashSet::new(), HashSet::new());

    for case in cases {
        if let Some(department) = case.department.as_deref() {
            push_unique(&mut departments, &mut options.departments, department);
        }
        push_unique(&mut positions, &mut options.job_positions, &case.job_position);
        push_unique(&mut statuses, &mut options.statuses, &case.status);
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn case(case_id: &str, position: &str, department: &str, status: &str, days: u32) -> Case {
        Case {
            id: case_id.to_string(),
            case_id: case_id.to_string(),
            job_position: position.to_string(),
            department: Some(department.to_string()),
            status: status.to_string(),
            time_to_hire: Some(days),
            start_date: None,
            completion_date: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            created_at_defaulted: false,
            priority: None,
        }
    }

    fn sample() -> Vec<Case> {
        vec![
            case("101", "Backend Engineer", "Engineering", "Completed", 30),
            case("102", "Recruiter", "HR", "In Progress", 12),
            case("203", "account executive", "Sales", "Completed", 45),
            case("204", "Data Analyst", "Engineering", "Offer", 21),
        ]
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let cases = sample();
        let hits: Vec<&str> = cases
            .iter()
            .filter(|case| matches_search(case, "eng"))
            .map(|case| case.case_id.as_str())
            .collect();
        assert_eq!(hits, vec!["101", "204"]);

        assert!(matches_search(&cases[1], "progress"));
        assert!(matches_search(&cases[2], "20"));
        assert!(matches_search(&cases[2], ""));
        assert!(!matches_search(&cases[2], "   "));
        assert!(matches_search(&cases[1], "in progress"));
        assert!(!matches_search(&cases[0], "marketing"));
    }

    #[test]
    fn structured_filter_is_exact_and_inclusive() {
        let cases = sample();
        let filter = CaseFilter {
            department: Some("Engineering".to_string()),
            time_to_hire_min: Some(21),
            time_to_hire_max: Some(30),
            ..CaseFilter::default()
        };
        let hits: Vec<&str> = cases
            .iter()
            .filter(|case| filter.matches(case))
            .map(|case| case.case_id.as_str())
            .collect();
        assert_eq!(hits, vec!["101", "204"]);

        let partial = CaseFilter {
            department: Some("Eng".to_string()),
            ..CaseFilter::default()
        };
        assert!(cases.iter().all(|case| !partial.matches(case)));
        assert!(CaseFilter::default().is_unconstrained());
    }

    #[test]
    fn range_bound_excludes_cases_without_days() {
        let mut pending = sample().remove(0);
        pending.time_to_hire = None;
        let filter = CaseFilter {
            time_to_hire_max: Some(100),
            ..CaseFilter::default()
        };
        assert!(!filter.matches(&pending));
        assert!(CaseFilter::default().matches(&pending));
    }

    #[test]
    fn toggling_sort_flips_or_resets() {
        let state = SortState::default();
        assert_eq!(state.direction, SortDirection::Desc);

        let flipped = state.toggle(SortField::TimeToHire);
        assert_eq!(flipped.direction, SortDirection::Asc);

        let moved = flipped.toggle(SortField::Department).toggle(SortField::Status);
        assert_eq!(moved.field, SortField::Status);
        assert_eq!(moved.direction, SortDirection::Asc);
    }

    #[test]
    fn initial_direction_depends_on_field() {
        assert_eq!(SortState::for_field(SortField::TimeToHire), SortState::default());
        let position = SortState::for_field(SortField::JobPosition);
        assert_eq!(position.direction, SortDirection::Asc);
        assert_eq!(
            SortState::for_field(SortField::TimeToHire).toggle(SortField::TimeToHire).direction,
            SortDirection::Asc
        );
    }

    #[test]
    fn page_far_past_the_end_is_empty() {
        let query = CaseQuery {
            page: usize::MAX,
            ..CaseQuery::default()
        };
        let page = evaluate(&sample(), &query, 10);
        assert!(page.rows.is_empty());
        assert_eq!(page.total_matches, 4);
        assert_eq!(page.page, usize::MAX);
        assert_eq!(page.page_count, 1);

        let huge = evaluate(&sample(), &CaseQuery { page: 3, ..CaseQuery::default() }, usize::MAX);
        assert!(huge.rows.is_empty());
        assert_eq!(huge.page_count, 1);
    }

    #[test]
    fn evaluate_sorts_strings_ignoring_case() {
        let query = CaseQuery {
            sort: SortState {
                field: SortField::JobPosition,
                direction: SortDirection::Asc,
            },
            ..CaseQuery::default()
        };
        let page = evaluate(&sample(), &query, 10);
        let positions: Vec<&str> = page.rows.iter().map(|case| case.job_position.as_str()).collect();
        assert_eq!(
            positions,
            vec!["account executive", "Backend Engineer", "Data Analyst", "Recruiter"]
        );
    }

    #[test]
    fn evaluate_paginates_but_reports_all_matches() {
        let cases: Vec<Case> = (0..23)
            .map(|i| case(&i.to_string(), "Engineer", "Engineering", "Completed", i))
            .collect();
        let query = CaseQuery {
            page: 3,
            ..CaseQuery::default()
        };

        let page = evaluate(&cases, &query, 10);
        assert_eq!(page.total_matches, 23);
        assert_eq!(page.page_count, 3);
        assert_eq!(page.rows.len(), 3);
        let days: Vec<Option<u32>> = page.rows.iter().map(|case| case.time_to_hire).collect();
        assert_eq!(days, vec![Some(2), Some(1), Some(0)]);
    }

    #[test]
    fn evaluate_is_idempotent_over_prefiltered_input() {
        let query = CaseQuery {
            filter: CaseFilter {
                status: Some("Completed".to_string()),
                ..CaseFilter::default()
            },
            ..CaseQuery::default()
        };
        let once = evaluate(&sample(), &query, 10);
        let twice = evaluate(&once.rows, &query, 10);
        assert_eq!(once, twice);
    }

    #[test]
    fn filter_options_are_distinct_in_first_seen_order() {
        let mut cases = sample();
        cases.push(case("300", "", "HR", "Completed", 3));
        let options = filter_options(&cases);
        assert_eq!(options.departments, vec!["Engineering", "HR", "Sales"]);
        assert_eq!(options.statuses, vec!["Completed", "In Progress", "Offer"]);
        assert_eq!(options.job_positions.len(), 4);
    }
}
