use chrono::{DateTime, Local};
use cuex_core::{Condition, EpochResult, RunOutcome, RunStatus};
use serde::Serialize;

/// Per-epoch figures for the JSON summary. Unlike the results table this includes
/// epochs without any reaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochSummary {
    pub epoch: usize,
    pub duration_secs: f64,
    pub elapsed_secs: f64,
    pub reactions: usize,
    pub mean_reaction_secs: Option<f64>,
    pub errors: u32,
    pub cues_shown: u32,
    pub unresolved_cue: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub participant: String,
    pub condition: Condition,
    pub started_at: DateTime<Local>,
    #[serde(flatten)]
    pub status: RunStatus,
    pub epochs: Vec<EpochSummary>,
}

impl From<&EpochResult> for EpochSummary {
    fn from(e: &EpochResult) -> Self {
        Self {
            epoch: e.epoch,
            duration_secs: e.duration.as_secs_f64(),
            elapsed_secs: e.elapsed.as_secs_f64(),
            reactions: e.reaction_times.len(),
            mean_reaction_secs: e.mean_reaction().map(|d| d.as_secs_f64()),
            errors: e.error_count,
            cues_shown: e.cues_shown,
            unresolved_cue: e.unresolved_cue,
        }
    }
}

impl From<&RunOutcome> for RunSummary {
    fn from(outcome: &RunOutcome) -> Self {
        Self {
            participant: outcome.participant.clone(),
            condition: outcome.condition,
            started_at: outcome.started_at,
            status: outcome.status,
            epochs: outcome.epochs.iter().map(EpochSummary::from).collect(),
        }
    }
}
