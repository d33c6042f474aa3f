use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::{Case, Event, Sentiment, StageDelay, SurveyResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Case,
    Event,
    SurveyResponse,
    StageDelay,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Case => "case",
            EntityKind::Event => "event",
            EntityKind::SurveyResponse => "survey response",
            EntityKind::StageDelay => "stage delay",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    #[error("{entity} row is not a JSON object")]
    NotAnObject { entity: EntityKind },

    #[error("{entity} row is missing required field `{field}`")]
    MissingField {
        entity: EntityKind,
        field: &'static str,
    },

    #[error("{entity} row has invalid `{field}`: {reason}")]
    InvalidField {
        entity: EntityKind,
        field: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Batch<T> {
    pub records: Vec<T>,
    pub rejected: Vec<NormalizeError>,
}

#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    now: DateTime<Utc>,
    strict_created_at: bool,
}

impl Normalizer {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            strict_created_at: false,
        }
    }

    /// Only applies to cases; events and surveys always fall back to `now`.
    pub fn strict_created_at(mut self, strict: bool) -> Self {
        self.strict_created_at = strict;
        self
    }

    pub fn case(&self, raw: &Value) -> Result<Case, NormalizeError> {
        let row = RawRow::new(EntityKind::Case, raw)?;
        let case_id = row.required_id("case_id", &["case_id"])?;
        let (created_at, created_at_defaulted) = self.created_at(&row)?;

        Ok(Case {
            id: row.id("id")?.unwrap_or_else(|| case_id.clone()),
            job_position: row.text("job_position", &["job_position"])?.unwrap_or_default(),
            department: row.text("department", &["department"])?,
            status: row
                .text("status", &["status", "hiring_status"])?
                .unwrap_or_default(),
            time_to_hire: row.whole_days("time_to_hire", &["time_to_hire"])?,
            start_date: row.timestamp("start_date", &["start_date"])?,
            completion_date: row.timestamp("completion_date", &["completion_date"])?,
            created_at,
            created_at_defaulted,
            priority: row.text("priority", &["priority"])?,
            case_id,
        })
    }

    pub fn event(&self, raw: &Value) -> Result<Event, NormalizeError> {
        let row = RawRow::new(EntityKind::Event, raw)?;
        let event_id = row.required_id("event_id", &["event_id"])?;
        let created_at = self.recorded_at(&row)?;

        Ok(Event {
            id: row.id("id")?.unwrap_or_else(|| event_id.clone()),
            case_id: row.identifier("case_id", &["case_id"])?,
            event_type: row
                .text("event_type", &["event_type", "activity"])?
                .unwrap_or_default(),
            stage_name: row
                .text("stage_name", &["stage_name", "status"])?
                .unwrap_or_default(),
            event_date: row.timestamp("event_date", &["event_date", "timestamp"])?,
            department: row.text("department", &["department"])?,
            duration_days: row.non_negative("duration_days", &["duration_days"])?,
            stage_order: row.integer("stage_order", &["stage_order"])?,
            assignee: row.text("assignee", &["assignee", "actor"])?,
            created_at,
            event_id,
        })
    }

    pub fn survey(&self, raw: &Value) -> Result<SurveyResponse, NormalizeError> {
        let row = RawRow::new(EntityKind::SurveyResponse, raw)?;
        let response_id = row.required_id("response_id", &["response_id"])?;
        let created_at = self.recorded_at(&row)?;
        let response_date = row
            .timestamp("response_date", &["response_date"])?
            .unwrap_or(created_at);

        Ok(SurveyResponse {
            id: row.id("id")?.unwrap_or_else(|| response_id.clone()),
            case_id: row.identifier("case_id", &["case_id"])?,
            respondent_type: row.text("respondent_type", &["respondent_type"])?,
            overall_score: row
                .number("overall_score", &["overall_score", "feedback_score"])?
                .unwrap_or(0.0),
            sentiment: Sentiment::from_label(row.text("sentiment", &["sentiment"])?.as_deref()),
            feedback_text: row.text("feedback_text", &["feedback_text", "comment"])?,
            response_date,
            created_at,
            response_id,
        })
    }

    pub fn stage_delay(&self, raw: &Value) -> Result<StageDelay, NormalizeError> {
        let row = RawRow::new(EntityKind::StageDelay, raw)?;
        let from_stage = row
            .text("from_stage", &["from_stage", "current_stage"])?
            .ok_or_else(|| row.missing("from_stage"))?;
        let to_stage = row
            .text("to_stage", &["to_stage", "next_stage"])?
            .ok_or_else(|| row.missing("to_stage"))?;
        let avg_delay_days = row
            .non_negative("avg_delay_days", &["avg_delay_days"])?
            .ok_or_else(|| row.missing("avg_delay_days"))?;
        let transition_count = match row.integer("transition_count", &["transition_count"])? {
            None => 1,
            Some(count) if count >= 1 => u32::try_from(count)
                .map_err(|_| row.invalid("transition_count", "exceeds u32 range"))?,
            Some(count) => {
                return Err(row.invalid(
                    "transition_count",
                    format!("must be positive, got {count}"),
                ))
            }
        };
        let department = row.text("department", &["department"])?;

        Ok(StageDelay {
            id: row.id("id")?.unwrap_or_else(|| {
                format!(
                    "{}:{}:{}",
                    department.as_deref().unwrap_or_default(),
                    from_stage,
                    to_stage
                )
            }),
            case_id: row.identifier("case_id", &["case_id"])?,
            job_position: row.text("job_position", &["job_position"])?,
            max_delay_days: row.non_negative("max_delay_days", &["max_delay_days"])?,
            department,
            from_stage,
            to_stage,
            avg_delay_days,
            transition_count,
        })
    }

    fn recorded_at(&self, row: &RawRow<'_>) -> Result<DateTime<Utc>, NormalizeError> {
        Ok(row
            .timestamp("created_at", &["created_at"])?
            .unwrap_or(self.now))
    }

    fn created_at(&self, row: &RawRow<'_>) -> Result<(DateTime<Utc>, bool), NormalizeError> {
        match row.timestamp("created_at", &["created_at"])? {
            Some(value) => Ok((value, false)),
            None if self.strict_created_at => Err(row.missing("created_at")),
            None => Ok((self.now, true)),
        }
    }
}

pub fn normalize_all<T, F>(rows: &[Value], mut normalize: F) -> Batch<T>
where
    F: FnMut(&Value) -> Result<T, NormalizeError>,
{
    let mut records = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for (index, raw) in rows.iter().enumerate() {
        match normalize(raw) {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(row = index, error = %err, "skipping malformed row");
                rejected.push(err);
            }
        }
    }

    Batch { records, rejected }
}

/// Parses RFC 3339, naive date-times (assumed UTC) and bare dates.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Postgres text output, e.g. "2026-01-05 10:00:00+00".
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

struct RawRow<'a> {
    entity: EntityKind,
    fields: &'a Map<String, Value>,
}

impl<'a> RawRow<'a> {
    fn new(entity: EntityKind, raw: &'a Value) -> Result<Self, NormalizeError> {
        raw.as_object()
            .map(|fields| Self { entity, fields })
            .ok_or(NormalizeError::NotAnObject { entity })
    }

    fn missing(&self, field: &'static str) -> NormalizeError {
        NormalizeError::MissingField {
            entity: self.entity,
            field,
        }
    }

    fn invalid(&self, field: &'static str, reason: impl Into<String>) -> NormalizeError {
        NormalizeError::InvalidField {
            entity: self.entity,
            field,
            reason: reason.into(),
        }
    }

    fn first(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|key| self.fields.get(*key))
            .find(|value| !value.is_null())
    }

    fn text(&self, field: &'static str, keys: &[&str]) -> Result<Option<String>, NormalizeError> {
        match self.first(keys) {
            None => Ok(None),
            Some(Value::String(text)) => {
                let trimmed = text.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Some(Value::Number(number)) => Ok(Some(number.to_string())),
            Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
            Some(other) => Err(self.invalid(field, format!("expected text, got {other}"))),
        }
    }

    fn identifier(
        &self,
        field: &'static str,
        keys: &[&str],
    ) -> Result<Option<String>, NormalizeError> {
        match self.first(keys) {
            None => Ok(None),
            Some(Value::String(text)) => {
                let trimmed = text.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Some(Value::Number(number)) => {
                if let Some(value) = number.as_i64() {
                    Ok(Some(value.to_string()))
                } else if let Some(value) = number.as_u64() {
                    Ok(Some(value.to_string()))
                } else {
                    match number.as_f64() {
                        Some(value) if value.is_finite() && value.fract() == 0.0 => {
                            Ok(Some(format!("{value:.0}")))
                        }
                        _ => Err(self.invalid(field, format!("non-integral id {number}"))),
                    }
                }
            }
            Some(other) => Err(self.invalid(field, format!("expected id, got {other}"))),
        }
    }

    fn required_id(&self, field: &'static str, keys: &[&str]) -> Result<String, NormalizeError> {
        self.identifier(field, keys)?
            .ok_or_else(|| self.missing(field))
    }

    fn id(&self, field: &'static str) -> Result<Option<String>, NormalizeError> {
        self.identifier(field, &[field])
    }

    fn number(&self, field: &'static str, keys: &[&str]) -> Result<Option<f64>, NormalizeError> {
        let value = match self.first(keys) {
            None => return Ok(None),
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(text)) if text.trim().is_empty() => return Ok(None),
            Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        match value {
            Some(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(self.invalid(field, "expected a finite number")),
        }
    }

    fn non_negative(
        &self,
        field: &'static str,
        keys: &[&str],
    ) -> Result<Option<f64>, NormalizeError> {
        match self.number(field, keys)? {
            Some(value) if value < 0.0 => {
                Err(self.invalid(field, format!("must not be negative, got {value}")))
            }
            other => Ok(other),
        }
    }

    fn integer(&self, field: &'static str, keys: &[&str]) -> Result<Option<i64>, NormalizeError> {
        match self.number(field, keys)? {
            None => Ok(None),
            Some(value) if value.fract() == 0.0 => Ok(Some(value as i64)),
            Some(value) => Err(self.invalid(field, format!("expected a whole number, got {value}"))),
        }
    }

    fn whole_days(&self, field: &'static str, keys: &[&str]) -> Result<Option<u32>, NormalizeError> {
        match self.integer(field, keys)? {
            None => Ok(None),
            Some(days) => u32::try_from(days)
                .map(Some)
                .map_err(|_| self.invalid(field, format!("must be a non-negative day count, got {days}"))),
        }
    }

    fn timestamp(
        &self,
        field: &'static str,
        keys: &[&str],
    ) -> Result<Option<DateTime<Utc>>, NormalizeError> {
        match self.first(keys) {
            None => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => parse_timestamp(text)
                .map(Some)
                .ok_or_else(|| self.invalid(field, format!("unparseable timestamp {text:?}"))),
            Some(other) => Err(self.invalid(field, format!("expected timestamp, got {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn case_maps_hiring_status_and_stringifies_id() {
        let raw = json!({
            "case_id": 1042,
            "job_position": "Data Engineer",
            "department": "Engineering",
            "hiring_status": "Completed",
            "time_to_hire": 34,
            "created_at": "2026-02-01T09:30:00Z"
        });

        let case = Normalizer::new(now()).case(&raw).unwrap();
        assert_eq!(case.case_id, "1042");
        assert_eq!(case.id, "1042");
        assert_eq!(case.status, "Completed");
        assert_eq!(case.time_to_hire, Some(34));
        assert!(!case.created_at_defaulted);
        assert_eq!(case.created_at, Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn status_wins_over_hiring_status() {
        let raw = json!({"case_id": "7", "status": "In Progress", "hiring_status": "Completed"});
        let case = Normalizer::new(now()).case(&raw).unwrap();
        assert_eq!(case.status, "In Progress");
    }

    #[test]
    fn missing_created_at_defaults_to_now_unless_strict() {
        let raw = json!({"case_id": 3, "department": null});
        let case = Normalizer::new(now()).case(&raw).unwrap();
        assert_eq!(case.created_at, now());
        assert!(case.created_at_defaulted);
        assert_eq!(case.department, None);
        assert_eq!(case.time_to_hire, None);

        let err = Normalizer::new(now())
            .strict_created_at(true)
            .case(&raw)
            .unwrap_err();
        assert_eq!(
            err,
            NormalizeError::MissingField {
                entity: EntityKind::Case,
                field: "created_at"
            }
        );
    }

    #[test]
    fn strict_mode_leaves_events_and_surveys_alone() {
        let normalizer = Normalizer::new(now()).strict_created_at(true);

        let event = normalizer
            .event(&json!({"event_id": 1, "case_id": 1, "status": "Applied"}))
            .unwrap();
        assert_eq!(event.created_at, now());

        let survey = normalizer
            .survey(&json!({"response_id": 1, "feedback_score": 8}))
            .unwrap();
        assert_eq!(survey.created_at, now());
        assert_eq!(survey.response_date, now());
    }

    #[test]
    fn missing_case_id_is_an_error() {
        let err = Normalizer::new(now())
            .case(&json!({"department": "HR", "time_to_hire": 5}))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::MissingField { field: "case_id", .. }));
    }

    #[test]
    fn non_numeric_time_to_hire_is_rejected() {
        let err = Normalizer::new(now())
            .case(&json!({"case_id": 1, "time_to_hire": "soon"}))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidField { field: "time_to_hire", .. }));

        let err = Normalizer::new(now())
            .case(&json!({"case_id": 1, "time_to_hire": -4}))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidField { field: "time_to_hire", .. }));
    }

    #[test]
    fn event_maps_activity_status_and_timestamp() {
        let raw = json!({
            "event_id": 55,
            "case_id": 1042,
            "activity": "Phone screen",
            "status": "Screening",
            "timestamp": "2026-01-10 08:00:00",
            "actor": "recruiter-3"
        });

        let event = Normalizer::new(now()).event(&raw).unwrap();
        assert_eq!(event.id, "55");
        assert_eq!(event.case_id.as_deref(), Some("1042"));
        assert_eq!(event.event_type, "Phone screen");
        assert_eq!(event.stage_name, "Screening");
        assert_eq!(event.assignee.as_deref(), Some("recruiter-3"));
        assert_eq!(
            event.event_date,
            Some(Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn survey_score_falls_back_to_feedback_score_then_zero() {
        let normalizer = Normalizer::new(now());
        let with_feedback = normalizer
            .survey(&json!({"response_id": 1, "feedback_score": 8, "sentiment": "POSITIVE", "comment": "smooth"}))
            .unwrap();
        assert_eq!(with_feedback.overall_score, 8.0);
        assert_eq!(with_feedback.sentiment, Sentiment::Positive);
        assert_eq!(with_feedback.feedback_text.as_deref(), Some("smooth"));

        let both = normalizer
            .survey(&json!({"response_id": 2, "overall_score": 6.5, "feedback_score": 9}))
            .unwrap();
        assert_eq!(both.overall_score, 6.5);

        let neither = normalizer.survey(&json!({"response_id": 3})).unwrap();
        assert_eq!(neither.overall_score, 0.0);
        assert_eq!(neither.sentiment, Sentiment::Unknown);
        assert_eq!(neither.response_date, now());
    }

    #[test]
    fn stage_delay_uses_stage_aliases_and_default_count() {
        let delay = Normalizer::new(now())
            .stage_delay(&json!({
                "current_stage": "Screening",
                "next_stage": "Interview",
                "avg_delay_days": 4.5,
                "department": "Sales"
            }))
            .unwrap();
        assert_eq!(delay.from_stage, "Screening");
        assert_eq!(delay.to_stage, "Interview");
        assert_eq!(delay.transition_count, 1);
        assert_eq!(delay.id, "Sales:Screening:Interview");
    }

    #[test]
    fn stage_delay_rejects_zero_transitions() {
        let err = Normalizer::new(now())
            .stage_delay(&json!({
                "from_stage": "A",
                "to_stage": "B",
                "avg_delay_days": 2,
                "transition_count": 0
            }))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidField { field: "transition_count", .. }));
    }

    #[test]
    fn batch_keeps_good_rows_and_reports_bad_ones() {
        let rows = vec![
            json!({"case_id": 1, "time_to_hire": 10}),
            json!("not a row"),
            json!({"time_to_hire": 3}),
            json!({"case_id": 2, "time_to_hire": 12}),
        ];
        let normalizer = Normalizer::new(now());
        let batch = normalize_all(&rows, |raw| normalizer.case(raw));

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.rejected.len(), 2);
        assert_eq!(
            batch.rejected[0],
            NormalizeError::NotAnObject {
                entity: EntityKind::Case
            }
        );
    }

    #[test]
    fn parses_common_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2026-01-05"), Some(expected));
        assert_eq!(parse_timestamp("2026-01-05T00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-01-05T01:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
