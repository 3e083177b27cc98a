use crate::condition::Condition;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One timed block of the run, fixed before the first epoch starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochConfig {
    /// 1-based epoch number
    pub index: usize,
    pub duration: Duration,
    pub condition: Condition,
}

/// Recorded result per epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochResult {
    pub participant: String,
    pub epoch: usize,
    /// Reaction times in the order the cues were resolved
    pub reaction_times: Vec<Duration>,
    pub error_count: u32,
    /// Configured epoch duration
    pub duration: Duration,
    pub cues_shown: u32,
    /// A cue was still on screen when the epoch ended
    pub unresolved_cue: bool,
    /// Time the epoch actually ran; shorter than `duration` only when aborted
    pub elapsed: Duration,
}

impl EpochResult {
    pub fn reaction_secs(&self) -> impl Iterator<Item = f64> + '_ {
        self.reaction_times.iter().map(Duration::as_secs_f64)
    }

    pub fn mean_reaction(&self) -> Option<Duration> {
        if self.reaction_times.is_empty() {
            return None;
        }
        let total: Duration = self.reaction_times.iter().sum();
        Some(total / self.reaction_times.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_reaction_of_empty_epoch_is_none() {
        let result = EpochResult {
            participant: "p".into(),
            epoch: 1,
            reaction_times: vec![],
            error_count: 3,
            duration: Duration::from_secs(10),
            cues_shown: 1,
            unresolved_cue: true,
            elapsed: Duration::from_secs(10),
        };
        assert_eq!(result.mean_reaction(), None);
    }

    #[test]
    fn reaction_secs_preserves_order() {
        let result = EpochResult {
            participant: "p".into(),
            epoch: 2,
            reaction_times: vec![Duration::from_millis(500), Duration::from_millis(300)],
            error_count: 0,
            duration: Duration::from_secs(5),
            cues_shown: 2,
            unresolved_cue: false,
            elapsed: Duration::from_secs(5),
        };
        let secs: Vec<f64> = result.reaction_secs().collect();
        assert_eq!(secs, vec![0.5, 0.3]);
        assert_eq!(result.mean_reaction(), Some(Duration::from_millis(400)));
    }
}
