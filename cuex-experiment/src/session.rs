use crate::config::ExperimentPlan;
use crate::cue::{CueGenerator, CuePolicy};
use crate::state::EpochState;
use crate::tracker::ResponseTracker;
use anyhow::{Context, Result};
use chrono::Local;
use cuex_core::{
    ActionKind, Condition, EpochConfig, EpochResult, EventLog, InputAction, RunOutcome, RunStatus,
    Screen,
};
use cuex_timing::Timer;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of waiting for the participant to start an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Begin { at_ns: u64 },
    /// Abort requested or the input source closed
    Closed,
}

/// Source of timestamped participant actions
pub trait InputSource {
    /// Blocks until a begin or abort action arrives. Anything else received meanwhile is
    /// discarded.
    fn wait_for_begin(&mut self, epoch: usize) -> Result<Gate>;

    /// Appends every action captured up to `now_ns` to `out` without blocking
    fn poll(&mut self, now_ns: u64, out: &mut Vec<InputAction>) -> Result<()>;
}

/// Display side effects of state transitions
pub trait Presenter {
    fn present(&mut self, screen: &Screen) -> Result<()>;
}

/// Background audio bracketing each epoch. Failures are the implementation's to report;
/// the experiment runs on without sound.
pub trait Soundtrack {
    fn start(&mut self, condition: Condition);
    fn stop(&mut self);
}

/// No audio
#[derive(Debug, Default, Clone, Copy)]
pub struct Silence;

impl Soundtrack for Silence {
    fn start(&mut self, _condition: Condition) {}
    fn stop(&mut self) {}
}

/// Drives all epochs of a run: begin gate, timed tick loop, result aggregation
pub struct Session<T: Timer, P: CuePolicy> {
    plan: ExperimentPlan,
    timer: T,
    generator: CueGenerator<P>,
    tracker: ResponseTracker,
    tick_interval: Duration,
}

enum EpochEnd {
    Elapsed,
    Aborted,
}

impl<T: Timer, P: CuePolicy> Session<T, P> {
    pub fn new(plan: ExperimentPlan, timer: T, policy: P) -> Self {
        let generator = CueGenerator::new(policy, plan.timing.min_gap());
        let tracker = ResponseTracker::new(plan.log_resolved_cues);
        let tick_interval = plan.timing.tick_interval();
        Self {
            plan,
            timer,
            generator,
            tracker,
            tick_interval,
        }
    }

    pub fn plan(&self) -> &ExperimentPlan {
        &self.plan
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Runs every epoch in order. An abort finalizes the current epoch with what it has
    /// and returns an outcome marked `Aborted`, so partial data can still be exported.
    pub fn run<F, S>(&mut self, frontend: &mut F, soundtrack: &mut S) -> Result<RunOutcome>
    where
        F: InputSource + Presenter,
        S: Soundtrack,
    {
        let started_at = Local::now();
        let total = self.plan.epochs.len();
        let mut events = EventLog::new();
        let mut epochs = Vec::with_capacity(total);
        let mut status = RunStatus::Completed;

        info!(
            participant = %self.plan.participant,
            condition = %self.plan.condition,
            epochs = total,
            "run started"
        );

        for config in self.plan.epochs.clone() {
            frontend
                .present(&Screen::BeginPrompt {
                    epoch: config.index,
                    total,
                })
                .context("presenting epoch prompt")?;

            match frontend.wait_for_begin(config.index)? {
                Gate::Begin { at_ns } => {
                    debug!(epoch = config.index, at_ns, "begin signal");
                }
                Gate::Closed => {
                    warn!(epoch = config.index, "run aborted before epoch start");
                    status = RunStatus::Aborted {
                        epoch: config.index,
                    };
                    break;
                }
            }

            soundtrack.start(config.condition);
            let outcome = self.run_epoch(&config, frontend, &mut events);
            soundtrack.stop();
            let (result, end) = outcome?;

            info!(
                epoch = result.epoch,
                reactions = result.reaction_times.len(),
                errors = result.error_count,
                cues = result.cues_shown,
                mean_reaction_ms = result
                    .mean_reaction()
                    .map(|d| d.as_secs_f64() * 1e3)
                    .unwrap_or(f64::NAN),
                "epoch complete"
            );
            epochs.push(result);

            if let EpochEnd::Aborted = end {
                warn!(epoch = config.index, "run aborted mid-epoch");
                status = RunStatus::Aborted {
                    epoch: config.index,
                };
                break;
            }
        }

        frontend
            .present(&Screen::Complete)
            .context("presenting completion screen")?;

        Ok(RunOutcome {
            participant: self.plan.participant.clone(),
            condition: self.plan.condition,
            clock_origin: self.timer.origin_wall(),
            started_at,
            epochs,
            events,
            status,
        })
    }

    fn run_epoch<F>(
        &mut self,
        config: &EpochConfig,
        frontend: &mut F,
        events: &mut EventLog,
    ) -> Result<(EpochResult, EpochEnd)>
    where
        F: InputSource + Presenter,
    {
        frontend
            .present(&Screen::Neutral)
            .context("clearing display")?;
        let mut shown = Screen::Neutral;

        self.timer.reset_frames();
        let start = self.timer.now();
        let mut state = EpochState::new(config.index, start);
        let mut actions = Vec::new();
        let mut end = EpochEnd::Elapsed;
        let mut next_tick = start;

        loop {
            let now = self.timer.now();
            if self.timer.elapsed(start) >= config.duration {
                break;
            }

            actions.clear();
            frontend.poll(now, &mut actions)?;
            for action in &actions {
                match action.kind {
                    ActionKind::Acknowledge if action.at_ns >= start => {
                        self.tracker.resolve(&mut state, action.at_ns, events);
                    }
                    // nothing after the abort belongs to this epoch
                    ActionKind::Abort => {
                        end = EpochEnd::Aborted;
                        break;
                    }
                    ActionKind::Acknowledge | ActionKind::Begin => {}
                }
            }
            if let EpochEnd::Aborted = end {
                break;
            }

            self.generator.tick(&mut state, now, events);

            let wanted = if state.cue_visible {
                Screen::Cue
            } else {
                Screen::Neutral
            };
            if wanted != shown {
                frontend.present(&wanted).context("presenting cue state")?;
                shown = wanted;
            }

            next_tick += self.tick_interval.as_nanos() as u64;
            let after = self.timer.now();
            if next_tick > after {
                self.timer.sleep(Duration::from_nanos(next_tick - after));
            } else {
                // overran the tick budget; resynchronize instead of bursting
                next_tick = after;
            }
            let tick_time = self.timer.elapsed(now);
            self.timer.record_frame(tick_time);
        }

        let elapsed = self.timer.elapsed(start).min(config.duration);
        let stats = self.timer.calibration_stats();
        debug!(
            epoch = config.index,
            ticks = stats.samples,
            tick_rate_hz = stats.effective_fps,
            jitter_ms = stats.jitter_ns / 1e6,
            "tick timing"
        );

        let result = state.finish(&self.plan.participant, config.duration, elapsed);
        Ok((result, end))
    }
}
