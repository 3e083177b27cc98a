use crate::session::{Gate, InputSource, Presenter};
use anyhow::Result;
use cuex_core::{ActionKind, InputAction, Screen};
use cuex_timing::{ManualTimer, Timer};
use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;

/// Replays a fixed list of timestamped actions against a [`ManualTimer`].
///
/// `wait_for_begin` moves the clock to the next `Begin` timestamp and consumes it. `poll`
/// hands out every action stamped up to `now_ns`, a stray `Begin` included, the way a live
/// keyboard would; a `Begin` still in the future waits for the next prompt.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    actions: VecDeque<InputAction>,
    timer: ManualTimer,
    presented: Vec<Screen>,
}

impl ScriptedInput {
    pub fn new(timer: ManualTimer, actions: impl IntoIterator<Item = InputAction>) -> Self {
        let mut actions: Vec<_> = actions.into_iter().collect();
        actions.sort_by_key(|a| a.at_ns);
        Self {
            actions: actions.into(),
            timer,
            presented: Vec::new(),
        }
    }

    /// Every screen handed to `present`, in order
    pub fn presented(&self) -> &[Screen] {
        &self.presented
    }

    pub fn remaining(&self) -> usize {
        self.actions.len()
    }
}

impl InputSource for ScriptedInput {
    fn wait_for_begin(&mut self, _epoch: usize) -> Result<Gate> {
        while let Some(action) = self.actions.pop_front() {
            self.timer.advance_to(action.at_ns);
            match action.kind {
                ActionKind::Begin => return Ok(Gate::Begin { at_ns: action.at_ns }),
                ActionKind::Abort => return Ok(Gate::Closed),
                ActionKind::Acknowledge => {}
            }
        }
        Ok(Gate::Closed)
    }

    fn poll(&mut self, now_ns: u64, out: &mut Vec<InputAction>) -> Result<()> {
        while self.actions.front().is_some_and(|a| a.at_ns <= now_ns) {
            out.extend(self.actions.pop_front());
        }
        Ok(())
    }
}

impl Presenter for ScriptedInput {
    fn present(&mut self, screen: &Screen) -> Result<()> {
        self.presented.push(*screen);
        Ok(())
    }
}

/// Behaviour of a [`SimulatedParticipant`]
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantModel {
    /// Fastest possible reaction
    pub min_reaction: Duration,
    /// Uniform spread added on top of `min_reaction`
    pub reaction_jitter: Duration,
    /// Spontaneous presses per second without a cue
    pub false_alarm_rate_hz: f64,
    /// Pause between the begin prompt and the begin press
    pub begin_delay: Duration,
}

impl Default for ParticipantModel {
    fn default() -> Self {
        Self {
            min_reaction: Duration::from_millis(220),
            reaction_jitter: Duration::from_millis(180),
            false_alarm_rate_hz: 0.05,
            begin_delay: Duration::from_millis(800),
        }
    }
}

/// A synthetic participant for dry runs: reacts to each cue it is shown after a random
/// latency and occasionally presses with nothing on screen.
pub struct SimulatedParticipant<R: Rng> {
    model: ParticipantModel,
    rng: R,
    timer: ManualTimer,
    pending_reaction: Option<u64>,
    next_false_alarm: Option<u64>,
}

impl<R: Rng> SimulatedParticipant<R> {
    /// `timer` must share its clock with the session timer
    pub fn new(model: ParticipantModel, rng: R, timer: ManualTimer) -> Self {
        Self {
            model,
            rng,
            timer,
            pending_reaction: None,
            next_false_alarm: None,
        }
    }

    fn sample_reaction(&mut self) -> Duration {
        let jitter = self.model.reaction_jitter.as_secs_f64();
        let spread = if jitter > 0.0 {
            self.rng.random_range(0.0..jitter)
        } else {
            0.0
        };
        self.model.min_reaction + Duration::from_secs_f64(spread)
    }

    fn schedule_false_alarm(&mut self, from_ns: u64) {
        let rate = self.model.false_alarm_rate_hz;
        self.next_false_alarm = (rate > 0.0).then(|| {
            let u: f64 = self.rng.random();
            let wait = -(1.0 - u).ln() / rate;
            from_ns.saturating_add(Duration::from_secs_f64(wait.min(1e6)).as_nanos() as u64)
        });
    }
}

impl<R: Rng> InputSource for SimulatedParticipant<R> {
    fn wait_for_begin(&mut self, _epoch: usize) -> Result<Gate> {
        self.timer.advance(self.model.begin_delay);
        let at_ns = self.timer.now();
        self.pending_reaction = None;
        self.schedule_false_alarm(at_ns);
        Ok(Gate::Begin { at_ns })
    }

    fn poll(&mut self, now_ns: u64, out: &mut Vec<InputAction>) -> Result<()> {
        if let Some(at) = self.pending_reaction.filter(|&at| at <= now_ns) {
            out.push(InputAction::acknowledge(at));
            self.pending_reaction = None;
        }
        if let Some(at) = self.next_false_alarm.filter(|&at| at <= now_ns) {
            out.push(InputAction::acknowledge(at));
            self.schedule_false_alarm(at);
        }
        out.sort_by_key(|a| a.at_ns);
        Ok(())
    }
}

impl<R: Rng> Presenter for SimulatedParticipant<R> {
    fn present(&mut self, screen: &Screen) -> Result<()> {
        if screen.is_cue() && self.pending_reaction.is_none() {
            let latency = self.sample_reaction();
            self.pending_reaction =
                Some(self.timer.now().saturating_add(latency.as_nanos() as u64));
        }
        Ok(())
    }
}
