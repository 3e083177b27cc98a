use crate::state::EpochState;
use cuex_core::{ErrorEvent, EventLog, EventLogEntry, ReactionRecord};
use std::time::Duration;
use tracing::debug;

/// How an acknowledge press was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Reaction(ReactionRecord),
    Error(ErrorEvent),
}

/// Matches acknowledge presses against the visible cue
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseTracker {
    /// Write a `CueResolved` entry for each reaction; off keeps the log to shown/error only
    pub log_resolutions: bool,
}

impl ResponseTracker {
    pub fn new(log_resolutions: bool) -> Self {
        Self { log_resolutions }
    }

    /// Resolves one acknowledge press captured at `at_ns`. Every press lands in exactly one
    /// branch: a reaction when a cue is visible, an error otherwise.
    pub fn resolve(&self, state: &mut EpochState, at_ns: u64, log: &mut EventLog) -> Resolution {
        match state.clear_cue() {
            Some(shown_ns) => {
                // a press captured before the onset it is matched to counts as zero latency
                let reaction_time = Duration::from_nanos(at_ns.saturating_sub(shown_ns));
                state.reaction_times.push(reaction_time);
                if self.log_resolutions {
                    log.push(EventLogEntry::CueResolved {
                        epoch: state.epoch,
                        at_ns,
                        reaction_time,
                    });
                }
                debug!(
                    epoch = state.epoch,
                    reaction_ms = reaction_time.as_secs_f64() * 1e3,
                    "cue acknowledged"
                );
                Resolution::Reaction(ReactionRecord {
                    epoch: state.epoch,
                    reaction_time,
                })
            }
            None => {
                state.error_count += 1;
                let error = ErrorEvent {
                    epoch: state.epoch,
                    at_ns,
                };
                log.push(error);
                debug!(epoch = state.epoch, at_ns, "acknowledge without cue");
                Resolution::Error(error)
            }
        }
    }
}
