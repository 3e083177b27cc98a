use crate::config::{CueTiming, PeriodicWindow, RandomMode};
use crate::state::EpochState;
use cuex_core::{Condition, CueEvent, EventLog};
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// What a cue policy sees on each tick. All timestamps are ns since the clock origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickContext {
    pub now_ns: u64,
    pub epoch_start_ns: u64,
    pub previous_tick_ns: Option<u64>,
    pub last_cue_ns: Option<u64>,
}

impl TickContext {
    pub fn since_previous_tick(&self) -> Duration {
        Duration::from_nanos(
            self.previous_tick_ns
                .map_or(0, |t| self.now_ns.saturating_sub(t)),
        )
    }

    pub fn since_epoch_start(&self) -> Duration {
        Duration::from_nanos(self.now_ns.saturating_sub(self.epoch_start_ns))
    }
}

/// Decides whether a cue may fire on a tick. Only consulted while no cue is visible and
/// the minimum gap has elapsed.
pub trait CuePolicy {
    fn should_fire(&mut self, ctx: &TickContext) -> bool;
}

impl<P: CuePolicy + ?Sized> CuePolicy for Box<P> {
    fn should_fire(&mut self, ctx: &TickContext) -> bool {
        (**self).should_fire(ctx)
    }
}

#[derive(Debug, Clone)]
pub struct RandomCue<R: Rng> {
    rng: R,
    mode: RandomMode,
}

impl<R: Rng> RandomCue<R> {
    pub fn new(mode: RandomMode, rng: R) -> Self {
        Self { rng, mode }
    }

    /// Probability of firing on this tick
    pub fn fire_probability(&self, ctx: &TickContext) -> f64 {
        match self.mode {
            RandomMode::PerTick { probability } => probability,
            RandomMode::Poisson { rate_hz } => {
                let dt = ctx.since_previous_tick().as_secs_f64();
                1.0 - (-rate_hz * dt).exp()
            }
        }
    }
}

impl<R: Rng> CuePolicy for RandomCue<R> {
    fn should_fire(&mut self, ctx: &TickContext) -> bool {
        let p = self.fire_probability(ctx);
        self.rng.random::<f64>() < p
    }
}

/// Beat-aligned cues: fire while the beat index since epoch start is even
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicCue {
    beat_interval: Duration,
    window: PeriodicWindow,
}

impl PeriodicCue {
    pub fn new(beat_interval: Duration, window: PeriodicWindow) -> Self {
        Self {
            beat_interval,
            window,
        }
    }

    /// Index of the beat containing `at_ns`, counted from the epoch start
    pub fn beat_index(&self, at_ns: u64, epoch_start_ns: u64) -> u64 {
        let beat_ns = self.beat_interval.as_nanos().max(1);
        (u128::from(at_ns.saturating_sub(epoch_start_ns)) / beat_ns) as u64
    }
}

impl CuePolicy for PeriodicCue {
    fn should_fire(&mut self, ctx: &TickContext) -> bool {
        let beat = self.beat_index(ctx.now_ns, ctx.epoch_start_ns);
        if beat % 2 != 0 {
            return false;
        }
        match (self.window, ctx.last_cue_ns) {
            (PeriodicWindow::OncePerWindow, Some(last)) if last >= ctx.epoch_start_ns => {
                self.beat_index(last, ctx.epoch_start_ns) != beat
            }
            _ => true,
        }
    }
}

/// The policy selected by the run's condition
#[derive(Debug, Clone)]
pub enum ConditionPolicy<R: Rng> {
    Random(RandomCue<R>),
    Periodic(PeriodicCue),
}

impl<R: Rng> ConditionPolicy<R> {
    pub fn new(condition: Condition, timing: &CueTiming, rng: R) -> Self {
        match condition {
            Condition::Random => ConditionPolicy::Random(RandomCue::new(timing.random, rng)),
            Condition::Periodic => ConditionPolicy::Periodic(PeriodicCue::new(
                timing.beat_interval(),
                timing.periodic_window,
            )),
        }
    }
}

impl<R: Rng> CuePolicy for ConditionPolicy<R> {
    fn should_fire(&mut self, ctx: &TickContext) -> bool {
        match self {
            ConditionPolicy::Random(p) => p.should_fire(ctx),
            ConditionPolicy::Periodic(p) => p.should_fire(ctx),
        }
    }
}

/// Turns "no cue visible" into "cue visible" when the policy and the minimum gap allow it
#[derive(Debug, Clone)]
pub struct CueGenerator<P: CuePolicy> {
    policy: P,
    min_gap: Duration,
}

impl<P: CuePolicy> CueGenerator<P> {
    pub fn new(policy: P, min_gap: Duration) -> Self {
        Self { policy, min_gap }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Runs one generator check. On fire the cue is stamped at `now_ns`, the state marks
    /// it visible and a `CueShown` entry is appended to `log`.
    pub fn tick(
        &mut self,
        state: &mut EpochState,
        now_ns: u64,
        log: &mut EventLog,
    ) -> Option<CueEvent> {
        let ctx = TickContext {
            now_ns,
            epoch_start_ns: state.started_ns,
            previous_tick_ns: state.last_tick_ns,
            last_cue_ns: state.last_cue_ns,
        };
        state.last_tick_ns = Some(now_ns);

        if state.cue_visible {
            return None;
        }
        let gap_open = ctx.last_cue_ns.is_none_or(|last| {
            Duration::from_nanos(now_ns.saturating_sub(last)) > self.min_gap
        });
        if !gap_open || !self.policy.should_fire(&ctx) {
            return None;
        }

        let cue = state.show_cue(now_ns);
        log.push(cue);
        debug!(epoch = cue.epoch, at_ns = cue.shown_at_ns, "cue shown");
        Some(cue)
    }
}
