//! Structural quality scoring of the risk analysis report
//!
//! The score is a cheap structural heuristic (key count, value length,
//! recent-error penalty), not a semantic evaluation. It is isolated
//! behind `score` so a real evaluator can replace it later without
//! touching the arbiter's control logic.

use async_trait::async_trait;
use serde_json::Value;

use super::{Stage, StageError};
use crate::state::{ChatMessage, StatePatch, WorkflowState};

/// Score assigned when no report (or an empty one) is available
const EMPTY_REPORT_SCORE: u8 = 30;

/// How many trailing messages are checked for the error penalty
const PENALTY_WINDOW: usize = 3;

/// Points subtracted per recent message mentioning an error
const ERROR_PENALTY: f64 = 20.0;

/// Pure scoring over a risk analysis report.
///
/// Formula, kept exactly for behavioral parity:
/// - empty or absent report -> 30, no penalty applied
/// - else `min(100, 50 + 10 * key_count + 5 * detail)` where `detail` is
///   the summed stringified length of each top-level value divided by
///   1000, minus 20 per "error"-containing message among the last three,
///   clamped to [0, 100]
pub fn score(report: Option<&Value>, recent: &[ChatMessage]) -> u8 {
    let entries = match report.and_then(Value::as_object) {
        Some(map) if !map.is_empty() => map,
        _ => {
            tracing::warn!("No risk analysis report to evaluate, assigning floor score");
            return EMPTY_REPORT_SCORE;
        }
    };

    let key_count = entries.len() as f64;
    let detail: f64 = entries
        .values()
        .map(|v| stringified_len(v) as f64)
        .sum::<f64>()
        / 1000.0;

    let mut value = (50.0 + key_count * 10.0 + detail * 5.0).min(100.0);

    let recent_errors = recent
        .iter()
        .rev()
        .take(PENALTY_WINDOW)
        .filter(|m| m.content.to_lowercase().contains("error"))
        .count() as f64;
    if recent_errors > 0.0 {
        tracing::warn!(recent_errors, "Recent error messages detected, applying penalty");
    }
    value = (value - recent_errors * ERROR_PENALTY).clamp(0.0, 100.0);

    value as u8
}

/// Length of a value's string form: raw length for strings, compact JSON
/// encoding for everything else
fn stringified_len(value: &Value) -> usize {
    match value {
        Value::String(s) => s.len(),
        other => other.to_string().len(),
    }
}

/// Stage wrapper around [`score`]
#[derive(Debug, Default)]
pub struct CriticStage;

impl CriticStage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for CriticStage {
    fn name(&self) -> &'static str {
        "critic"
    }

    async fn run(&self, state: &WorkflowState) -> Result<StatePatch, StageError> {
        let quality_score = score(state.risk_analysis_report.as_ref(), &state.messages);

        let human_flag = state
            .risk_analysis_report
            .as_ref()
            .and_then(|r| r.get("human_input"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        tracing::info!(quality_score, human_input = human_flag, "Critic scoring complete");

        Ok(StatePatch {
            quality_score: Some(quality_score),
            human_input: Some(human_flag),
            ..Default::default()
        })
    }
}
