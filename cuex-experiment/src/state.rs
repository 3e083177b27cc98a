use cuex_core::{CueEvent, EpochResult};
use std::time::Duration;

/// Mutable loop state of one epoch. A fresh value is created for every epoch, so nothing
/// carries over between epochs.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochState {
    pub epoch: usize,
    pub started_ns: u64,
    pub cue_visible: bool,
    /// Onset of the cue currently on screen
    pub cue_shown_ns: Option<u64>,
    /// Onset of the most recent cue this epoch, resolved or not
    pub last_cue_ns: Option<u64>,
    pub last_tick_ns: Option<u64>,
    pub reaction_times: Vec<Duration>,
    pub error_count: u32,
    pub cues_shown: u32,
}

impl EpochState {
    pub fn new(epoch: usize, started_ns: u64) -> Self {
        Self {
            epoch,
            started_ns,
            cue_visible: false,
            cue_shown_ns: None,
            last_cue_ns: None,
            last_tick_ns: None,
            reaction_times: Vec::new(),
            error_count: 0,
            cues_shown: 0,
        }
    }

    pub(crate) fn show_cue(&mut self, now_ns: u64) -> CueEvent {
        self.cue_visible = true;
        self.cue_shown_ns = Some(now_ns);
        self.last_cue_ns = Some(now_ns);
        self.cues_shown += 1;
        CueEvent {
            epoch: self.epoch,
            shown_at_ns: now_ns,
        }
    }

    /// Hides the visible cue and returns its onset
    pub fn clear_cue(&mut self) -> Option<u64> {
        self.cue_visible = false;
        self.cue_shown_ns.take()
    }

    pub fn finish(self, participant: &str, duration: Duration, elapsed: Duration) -> EpochResult {
        EpochResult {
            participant: participant.to_string(),
            epoch: self.epoch,
            reaction_times: self.reaction_times,
            error_count: self.error_count,
            duration,
            cues_shown: self.cues_shown,
            unresolved_cue: self.cue_visible,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finishing_with_visible_cue_marks_it_unresolved() {
        let mut state = EpochState::new(3, 100);
        let cue = state.show_cue(250);
        assert_eq!(cue.epoch, 3);
        let result = state.finish("p", Duration::from_secs(2), Duration::from_secs(2));
        assert!(result.unresolved_cue);
        assert_eq!(result.cues_shown, 1);
        assert_eq!(result.error_count, 0);
        assert!(result.reaction_times.is_empty());
    }

    #[test]
    fn clearing_keeps_last_cue_time_for_gap_checks() {
        let mut state = EpochState::new(1, 0);
        state.show_cue(42);
        assert_eq!(state.clear_cue(), Some(42));
        assert!(!state.cue_visible);
        assert_eq!(state.last_cue_ns, Some(42));
        assert_eq!(state.clear_cue(), None);
    }
}
