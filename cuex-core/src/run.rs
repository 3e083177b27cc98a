use crate::condition::Condition;
use crate::epoch::EpochResult;
use crate::event::EventLog;
use chrono::{DateTime, Local, TimeDelta};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Stopped by the participant or operator during `epoch`
    Aborted { epoch: usize },
}

/// Everything a run produced, handed to the exporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub participant: String,
    pub condition: Condition,
    /// Wall-clock instant of timestamp zero
    pub clock_origin: DateTime<Local>,
    /// Wall-clock instant the run started, used to name artifacts
    pub started_at: DateTime<Local>,
    pub epochs: Vec<EpochResult>,
    pub events: EventLog,
    pub status: RunStatus,
}

impl RunOutcome {
    /// Converts a monotonic timestamp into local wall-clock time
    pub fn wall_time(&self, at_ns: u64) -> DateTime<Local> {
        let offset = TimeDelta::nanoseconds(i64::try_from(at_ns).unwrap_or(i64::MAX));
        self.clock_origin + offset
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn total_reactions(&self) -> usize {
        self.epochs.iter().map(|e| e.reaction_times.len()).sum()
    }

    pub fn total_errors(&self) -> u32 {
        self.epochs.iter().map(|e| e.error_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn wall_time_offsets_from_clock_origin() {
        let origin = Local.with_ymd_and_hms(2024, 5, 14, 10, 0, 0).unwrap();
        let outcome = RunOutcome {
            participant: "p".into(),
            condition: Condition::Random,
            clock_origin: origin,
            started_at: origin,
            epochs: vec![],
            events: EventLog::new(),
            status: RunStatus::Completed,
        };
        let t = outcome.wall_time(1_500_250_000);
        assert_eq!(
            t.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            "2024-05-14 10:00:01.500250"
        );
        assert!(outcome.is_complete());
        assert_eq!(outcome.total_reactions(), 0);
    }
}
