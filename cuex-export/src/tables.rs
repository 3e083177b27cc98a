use cuex_core::{EpochResult, RunOutcome};
use serde::Serialize;
use std::io::Write;

pub const RESULTS_HEADER: [&str; 5] = [
    "Participant",
    "Epoch",
    "Reaction Time",
    "Errors",
    "Epoch Duration",
];
pub const EVENTS_HEADER: [&str; 3] = ["Event Type", "Epoch", "Timestamp"];
/// Local wall-clock time with microseconds
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One reaction of one epoch; the epoch's error count and duration repeat on every row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow<'a> {
    pub participant: &'a str,
    pub epoch: usize,
    pub reaction_time: f64,
    pub errors: u32,
    pub epoch_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub event_type: &'static str,
    pub epoch: usize,
    pub timestamp: String,
}

/// Flattens epochs into rows. Epochs without reactions contribute nothing.
pub fn result_rows(epochs: &[EpochResult]) -> impl Iterator<Item = ResultRow<'_>> {
    epochs.iter().flat_map(|epoch| {
        epoch.reaction_secs().map(move |reaction_time| ResultRow {
            participant: &epoch.participant,
            epoch: epoch.epoch,
            reaction_time,
            errors: epoch.error_count,
            epoch_duration: epoch.duration.as_secs_f64(),
        })
    })
}

pub fn event_rows(outcome: &RunOutcome) -> impl Iterator<Item = EventRow> + '_ {
    outcome.events.iter().map(|entry| EventRow {
        event_type: entry.label(),
        epoch: entry.epoch(),
        timestamp: outcome
            .wall_time(entry.at_ns())
            .format(TIMESTAMP_FORMAT)
            .to_string(),
    })
}

/// Writes the results table. The header is written even when there are no rows.
pub fn write_results<W: Write>(writer: W, epochs: &[EpochResult]) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(RESULTS_HEADER)?;
    for row in result_rows(epochs) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_events<W: Write>(writer: W, outcome: &RunOutcome) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(EVENTS_HEADER)?;
    for row in event_rows(outcome) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use cuex_core::{Condition, CueEvent, ErrorEvent, EventLog, RunStatus};
    use std::time::Duration;

    fn epoch(epoch: usize, reactions: &[u64], errors: u32, secs: u64) -> EpochResult {
        EpochResult {
            participant: "P01".to_string(),
            epoch,
            reaction_times: reactions.iter().map(|&ms| Duration::from_millis(ms)).collect(),
            error_count: errors,
            duration: Duration::from_secs(secs),
            cues_shown: reactions.len() as u32,
            unresolved_cue: false,
            elapsed: Duration::from_secs(secs),
        }
    }

    fn to_string(write: impl FnOnce(&mut Vec<u8>) -> csv::Result<()>) -> String {
        let mut buf = Vec::new();
        write(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn each_reaction_becomes_a_row_carrying_epoch_totals() {
        let epochs = [epoch(1, &[300, 500], 2, 10), epoch(2, &[], 4, 10)];
        let out = to_string(|buf| write_results(buf, &epochs));
        assert_eq!(
            out,
            "Participant,Epoch,Reaction Time,Errors,Epoch Duration\n\
             P01,1,0.3,2,10.0\n\
             P01,1,0.5,2,10.0\n"
        );
    }

    #[test]
    fn header_is_written_without_rows() {
        let out = to_string(|buf| write_results(buf, &[epoch(1, &[], 7, 5)]));
        assert_eq!(out, "Participant,Epoch,Reaction Time,Errors,Epoch Duration\n");
    }

    #[test]
    fn events_carry_label_epoch_and_wall_time() {
        let origin = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let mut events = EventLog::new();
        events.push(CueEvent {
            epoch: 1,
            shown_at_ns: 1_500_000_000,
        });
        events.push(ErrorEvent {
            epoch: 2,
            at_ns: 61_000_250_000,
        });
        let outcome = RunOutcome {
            participant: "P01".to_string(),
            condition: Condition::Random,
            clock_origin: origin,
            started_at: origin,
            epochs: Vec::new(),
            events,
            status: RunStatus::Completed,
        };

        let out = to_string(|buf| write_events(buf, &outcome));
        assert_eq!(
            out,
            "Event Type,Epoch,Timestamp\n\
             green_screen,1,2024-05-01 09:30:01.500000\n\
             error,2,2024-05-01 09:31:01.000250\n"
        );
    }
}
