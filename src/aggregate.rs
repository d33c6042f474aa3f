use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Months, NaiveDate, Utc};

use crate::models::{
    Case, DepartmentComparison, MonthlyTrend, PositionSummary, RespondentScore, Sentiment,
    SentimentSlice, SentimentTally, StageDelay, StageTransition, SurveyResponse,
};

pub const TRANSITION_SEPARATOR: &str = " → ";
pub const UNASSIGNED_LABEL: &str = "Unassigned";
pub const UNSPECIFIED_LABEL: &str = "Unspecified";
const MONTH_LABEL_FORMAT: &str = "%b %Y";

pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

pub fn round_to_tenth(value: f64) -> f64 {
    round_half_up(value * 10.0) / 10.0
}

pub fn department_label(department: Option<&str>) -> &str {
    department.unwrap_or(UNASSIGNED_LABEL)
}

pub fn transition_name(from_stage: &str, to_stage: &str) -> String {
    format!("{from_stage}{TRANSITION_SEPARATOR}{to_stage}")
}

/// Keyed buckets in first-seen key order.
struct Buckets<V> {
    index: HashMap<String, usize>,
    entries: Vec<(String, V)>,
}

impl<V> Buckets<V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let slot = *self.index.get(key)?;
        Some(&mut self.entries[slot].1)
    }

    fn entry_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        let slot = match self.index.get(key) {
            Some(slot) => *slot,
            None => {
                self.entries.push((key.to_string(), make()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[slot].1
    }

    fn into_entries(self) -> Vec<(String, V)> {
        self.entries
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RunningTotal {
    count: usize,
    sum: f64,
    max: f64,
}

impl RunningTotal {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.max = self.max.max(value);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedAverage {
    pub avg: f64,
    pub count: u64,
}

impl WeightedAverage {
    pub fn new(avg: f64, count: u64) -> Self {
        Self { avg, count }
    }

    pub fn merge(self, other: WeightedAverage) -> WeightedAverage {
        let count = self.count + other.count;
        if count == 0 {
            return self;
        }
        let avg = (self.avg * self.count as f64 + other.avg * other.count as f64) / count as f64;
        WeightedAverage { avg, count }
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

#[derive(Debug, Default)]
struct DepartmentStats {
    department: Option<String>,
    time_to_hire: RunningTotal,
    weighted_delay: f64,
    transitions: u64,
}

/// Delays only count towards departments with at least one timed case. A delay
/// without a department never matches, not even the `Unassigned` bucket.
pub fn department_comparison(cases: &[Case], delays: &[StageDelay]) -> Vec<DepartmentComparison> {
    let mut buckets: Buckets<DepartmentStats> = Buckets::new();

    for case in cases {
        let Some(days) = case.time_to_hire else {
            continue;
        };
        buckets
            .entry_or_insert_with(department_label(case.department.as_deref()), || {
                DepartmentStats {
                    department: case.department.clone(),
                    ..Default::default()
                }
            })
            .time_to_hire
            .add(f64::from(days));
    }

    for delay in delays {
        let Some(department) = delay.department.as_deref() else {
            continue;
        };
        let Some(stats) = buckets.get_mut(department) else {
            continue;
        };
        if stats.department.as_deref() == Some(department) {
            let count = u64::from(delay.transition_count);
            stats.weighted_delay += delay.avg_delay_days * count as f64;
            stats.transitions += count;
        }
    }

    let mut rows: Vec<DepartmentComparison> = buckets
        .into_entries()
        .into_iter()
        .map(|(name, stats)| DepartmentComparison {
            name,
            count: stats.time_to_hire.count,
            avg_time_to_hire: round_half_up(stats.time_to_hire.mean()) as i64,
            avg_process_delay: if stats.transitions > 0 {
                round_half_up(stats.weighted_delay / stats.transitions as f64) as i64
            } else {
                0
            },
        })
        .collect();

    rows.sort_by(|a, b| b.avg_time_to_hire.cmp(&a.avg_time_to_hire));
    rows
}

pub fn stage_transitions(delays: &[StageDelay], limit: usize) -> Vec<StageTransition> {
    let mut buckets: Buckets<(WeightedAverage, &StageDelay)> = Buckets::new();

    for delay in delays {
        let observed = WeightedAverage::new(delay.avg_delay_days, u64::from(delay.transition_count));
        let name = transition_name(&delay.from_stage, &delay.to_stage);
        let slot = buckets.entry_or_insert_with(&name, || (WeightedAverage::new(0.0, 0), delay));
        slot.0 = if slot.0.count == 0 {
            observed
        } else {
            slot.0.merge(observed)
        };
    }

    let mut rows: Vec<StageTransition> = buckets
        .into_entries()
        .into_iter()
        .map(|(name, (merged, first))| StageTransition {
            name,
            value: merged.avg,
            count: merged.count,
            from_stage: first.from_stage.clone(),
            to_stage: first.to_stage.clone(),
        })
        .collect();

    rows.sort_by(|a, b| descending(a.value, b.value));
    rows.truncate(limit);
    rows
}

/// Reconstructs the first day of the month a `"%b %Y"` label names.
pub fn month_start(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("1 {label}"), &format!("%d {MONTH_LABEL_FORMAT}")).ok()
}

pub fn monthly_trend(cases: &[Case], now: DateTime<Utc>, months: u32) -> Vec<MonthlyTrend> {
    let cutoff = now
        .checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut buckets: Buckets<RunningTotal> = Buckets::new();

    for case in cases {
        let Some(days) = case.time_to_hire else {
            continue;
        };
        if case.created_at < cutoff {
            continue;
        }
        let label = case.created_at.format(MONTH_LABEL_FORMAT).to_string();
        buckets
            .entry_or_insert_with(&label, RunningTotal::default)
            .add(f64::from(days));
    }

    let mut rows: Vec<MonthlyTrend> = buckets
        .into_entries()
        .into_iter()
        .map(|(month, totals)| MonthlyTrend {
            month,
            count: totals.count,
            avg_days: round_half_up(totals.mean()) as i64,
            max_days: totals.max as u32,
        })
        .collect();

    rows.sort_by_key(|row| month_start(&row.month));
    rows
}

pub fn position_summary(cases: &[Case], limit: usize) -> Vec<PositionSummary> {
    let mut buckets: Buckets<RunningTotal> = Buckets::new();

    for case in cases {
        let Some(days) = case.time_to_hire else {
            continue;
        };
        let name = if case.job_position.is_empty() {
            UNSPECIFIED_LABEL
        } else {
            case.job_position.as_str()
        };
        buckets
            .entry_or_insert_with(name, RunningTotal::default)
            .add(f64::from(days));
    }

    let mut rows: Vec<PositionSummary> = buckets
        .into_entries()
        .into_iter()
        .map(|(name, totals)| PositionSummary {
            name,
            count: totals.count,
            avg_time_to_hire: round_half_up(totals.mean()) as i64,
        })
        .collect();

    rows.sort_by(|a, b| b.avg_time_to_hire.cmp(&a.avg_time_to_hire));
    rows.truncate(limit);
    rows
}

pub fn respondent_scores(surveys: &[SurveyResponse]) -> Vec<RespondentScore> {
    let mut buckets: Buckets<RunningTotal> = Buckets::new();

    for survey in surveys {
        let name = survey.respondent_type.as_deref().unwrap_or(UNSPECIFIED_LABEL);
        buckets
            .entry_or_insert_with(name, RunningTotal::default)
            .add(survey.overall_score);
    }

    let mut rows: Vec<RespondentScore> = buckets
        .into_entries()
        .into_iter()
        .map(|(name, totals)| RespondentScore {
            name,
            count: totals.count,
            avg_score: round_to_tenth(totals.mean()),
        })
        .collect();

    rows.sort_by(|a, b| descending(a.avg_score, b.avg_score));
    rows
}

pub fn sentiment_tally(surveys: &[SurveyResponse]) -> SentimentTally {
    let mut tally = SentimentTally::default();
    for survey in surveys {
        match survey.sentiment {
            Sentiment::Positive => tally.positive += 1,
            Sentiment::Neutral => tally.neutral += 1,
            Sentiment::Negative => tally.negative += 1,
            Sentiment::Unknown => tally.unknown += 1,
        }
    }
    tally
}

/// Percentages are of the shown total, so empty categories drop out.
pub fn sentiment_breakdown(tally: &SentimentTally) -> Vec<SentimentSlice> {
    let shown: Vec<(Sentiment, usize)> = Sentiment::ALL
        .iter()
        .map(|sentiment| (*sentiment, tally.get(*sentiment)))
        .filter(|(_, count)| *count > 0)
        .collect();
    let total: usize = shown.iter().map(|(_, count)| count).sum();

    shown
        .into_iter()
        .map(|(sentiment, count)| {
            let percent = round_half_up(count as f64 / total as f64 * 100.0) as u32;
            SentimentSlice {
                name: sentiment.display_name().to_string(),
                value: count,
                percent,
                label: format!("{} {}%", sentiment.display_name(), percent),
            }
        })
        .collect()
}
