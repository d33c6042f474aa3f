use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::delays::derive_stage_delays;
use crate::filter::CaseFilter;
use crate::models::{Case, Event, StageDelay, SurveyResponse};
use crate::normalize::{normalize_all, NormalizeError, Normalizer};

/// Rows exactly as the store returns them, one array per collection.
///
/// `stage_delays` is `None` when the store has no precomputed delay view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSnapshot {
    #[serde(default)]
    pub cases: Vec<Value>,
    #[serde(default)]
    pub events: Vec<Value>,
    #[serde(default)]
    pub survey_responses: Vec<Value>,
    #[serde(default)]
    pub stage_delays: Option<Vec<Value>>,
}

/// Canonical collections ready for aggregation.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub cases: Vec<Case>,
    pub events: Vec<Event>,
    pub surveys: Vec<SurveyResponse>,
    pub stage_delays: Vec<StageDelay>,
}

#[derive(Debug, Clone)]
pub struct NormalizedSnapshot {
    pub snapshot: Snapshot,
    pub rejected: Vec<NormalizeError>,
}

impl RawSnapshot {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("snapshot {} is not valid JSON", path.display()))
    }

    pub fn normalize(&self, normalizer: &Normalizer) -> NormalizedSnapshot {
        let cases = normalize_all(&self.cases, |raw| normalizer.case(raw));
        let events = normalize_all(&self.events, |raw| normalizer.event(raw));
        let surveys = normalize_all(&self.survey_responses, |raw| normalizer.survey(raw));

        let mut rejected = Vec::new();
        rejected.extend(cases.rejected);
        rejected.extend(events.rejected);
        rejected.extend(surveys.rejected);

        let stage_delays = match &self.stage_delays {
            Some(rows) => {
                let delays = normalize_all(rows, |raw| normalizer.stage_delay(raw));
                rejected.extend(delays.rejected);
                delays.records
            }
            None => {
                info!("no precomputed stage delays, deriving them from events");
                derive_stage_delays(&events.records, &cases.records)
            }
        };

        NormalizedSnapshot {
            snapshot: Snapshot {
                cases: cases.records,
                events: events.records,
                surveys: surveys.records,
                stage_delays,
            },
            rejected,
        }
    }
}

impl Snapshot {
    /// Applies the case filter in memory; a no-op when the store already did.
    pub fn retain_cases(&mut self, filter: &CaseFilter) {
        if !filter.is_unconstrained() {
            self.cases.retain(|case| filter.matches(case));
        }
    }
}
