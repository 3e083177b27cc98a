use cuex_core::{Condition, EventLogEntry, InputAction, RunStatus, Screen};
use cuex_experiment::{
    ConditionPolicy, CuePolicy, CueTiming, ExperimentConfig, ExperimentPlan, PeriodicCue,
    PeriodicWindow, ScriptedInput, Session, Silence, TickContext,
};
use cuex_timing::ManualTimer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;

const MS: u64 = 1_000_000;

/// Fires at fixed offsets from each epoch's start
struct FireAt(Vec<Duration>);

impl CuePolicy for FireAt {
    fn should_fire(&mut self, ctx: &TickContext) -> bool {
        let since = ctx.since_epoch_start();
        self.0.iter().any(|&offset| {
            let due = ctx.epoch_start_ns + offset.as_nanos() as u64;
            since >= offset && ctx.last_cue_ns.is_none_or(|last| last < due)
        })
    }
}

struct Always;

impl CuePolicy for Always {
    fn should_fire(&mut self, _ctx: &TickContext) -> bool {
        true
    }
}

struct Never;

impl CuePolicy for Never {
    fn should_fire(&mut self, _ctx: &TickContext) -> bool {
        false
    }
}

fn plan(condition: Condition, durations: &[f64], min_gap_secs: f64) -> ExperimentPlan {
    ExperimentConfig {
        participant: "P01".to_string(),
        condition,
        epoch_durations_secs: durations.to_vec(),
        timing: CueTiming {
            min_gap_secs,
            ..CueTiming::default()
        },
        log_resolved_cues: false,
    }
    .validate()
    .unwrap()
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn reaction_time_is_press_minus_onset() {
    let timer = ManualTimer::new();
    let mut input = ScriptedInput::new(
        timer.clone(),
        [InputAction::begin(0), InputAction::acknowledge(700 * MS)],
    );
    let mut session = Session::new(
        plan(Condition::Random, &[2.0], 1.0),
        timer.clone(),
        FireAt(vec![ms(500)]),
    );

    let outcome = session.run(&mut input, &mut Silence).unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.epochs.len(), 1);
    let epoch = &outcome.epochs[0];
    assert_eq!(epoch.reaction_times, vec![ms(200)]);
    assert_eq!(epoch.error_count, 0);
    assert_eq!(epoch.cues_shown, 1);
    assert!(!epoch.unresolved_cue);
    assert_eq!(epoch.elapsed, Duration::from_secs(2));
    assert_eq!(
        outcome.events.entries(),
        &[EventLogEntry::CueShown {
            epoch: 1,
            at_ns: 500 * MS
        }]
    );
    assert_eq!(
        input.presented(),
        &[
            Screen::BeginPrompt { epoch: 1, total: 1 },
            Screen::Neutral,
            Screen::Cue,
            Screen::Neutral,
            Screen::Complete,
        ]
    );
}

#[test]
fn epochs_do_not_share_cue_state() {
    let timer = ManualTimer::new();
    let mut input = ScriptedInput::new(
        timer.clone(),
        [
            InputAction::begin(0),
            // between epochs: discarded
            InputAction::acknowledge(3_000 * MS),
            InputAction::begin(5_000 * MS),
            InputAction::acknowledge(5_050 * MS),
        ],
    );
    let mut session = Session::new(
        plan(Condition::Random, &[1.0, 1.0], 1.0),
        timer.clone(),
        FireAt(vec![ms(100)]),
    );

    let outcome = session.run(&mut input, &mut Silence).unwrap();
    let [first, second] = outcome.epochs.as_slice() else {
        panic!("expected two epochs, got {}", outcome.epochs.len());
    };

    assert!(first.unresolved_cue);
    assert!(first.reaction_times.is_empty());
    assert_eq!(first.error_count, 0);

    // the epoch 1 cue is gone; a press before epoch 2's own cue is an error
    assert_eq!(second.error_count, 1);
    assert!(second.reaction_times.is_empty());
    assert!(second.unresolved_cue);

    assert_eq!(
        outcome.events.entries(),
        &[
            EventLogEntry::CueShown {
                epoch: 1,
                at_ns: 100 * MS
            },
            EventLogEntry::ErrorOccurred {
                epoch: 2,
                at_ns: 5_050 * MS
            },
            EventLogEntry::CueShown {
                epoch: 2,
                at_ns: 5_100 * MS
            },
        ]
    );
}

#[test]
fn at_most_one_cue_is_outstanding() {
    let timer = ManualTimer::new();
    let mut input = ScriptedInput::new(timer.clone(), [InputAction::begin(0)]);
    let mut session = Session::new(plan(Condition::Random, &[1.0], 0.0), timer, Always);

    let outcome = session.run(&mut input, &mut Silence).unwrap();
    assert_eq!(outcome.epochs[0].cues_shown, 1);
    assert_eq!(outcome.events.len(), 1);
}

#[test]
fn every_press_resolves_to_reaction_or_error() {
    let timer = ManualTimer::new();
    let presses = (1..10).map(|i| InputAction::acknowledge(i * 100 * MS));
    let mut input = ScriptedInput::new(
        timer.clone(),
        std::iter::once(InputAction::begin(0)).chain(presses),
    );
    let mut session = Session::new(plan(Condition::Random, &[1.0], 0.0), timer, Always);

    let outcome = session.run(&mut input, &mut Silence).unwrap();
    let epoch = &outcome.epochs[0];
    assert_eq!(epoch.reaction_times, vec![ms(100); 9]);
    assert_eq!(epoch.error_count, 0);
    assert_eq!(epoch.cues_shown, 10);
    assert!(epoch.unresolved_cue);
}

#[test]
fn presses_without_cue_are_counted_and_logged() {
    let timer = ManualTimer::new();
    let mut input = ScriptedInput::new(
        timer.clone(),
        [
            InputAction::begin(0),
            InputAction::acknowledge(10 * MS),
            InputAction::acknowledge(20 * MS),
            InputAction::acknowledge(20 * MS),
        ],
    );
    let mut session = Session::new(plan(Condition::Random, &[0.5], 1.0), timer, Never);

    let outcome = session.run(&mut input, &mut Silence).unwrap();
    assert_eq!(outcome.epochs[0].error_count, 3);
    assert_eq!(outcome.events.count_errors(1), 3);
    assert!(outcome.events.iter().all(|e| e.label() == "error"));
}

#[test]
fn periodic_runs_are_reproducible_and_beat_aligned() {
    let run = || {
        let timer = ManualTimer::new();
        let presses = (1..40).map(|i| InputAction::acknowledge(i * 250 * MS));
        let mut input = ScriptedInput::new(
            timer.clone(),
            std::iter::once(InputAction::begin(0)).chain(presses),
        );
        let plan = plan(Condition::Periodic, &[10.0], 1.0);
        let policy =
            ConditionPolicy::new(plan.condition, &plan.timing, StdRng::seed_from_u64(0));
        let mut session = Session::new(plan, timer, policy);
        session.run(&mut input, &mut Silence).unwrap()
    };

    let a = run();
    let b = run();
    assert_eq!(a.events, b.events);
    assert_eq!(a.epochs[0].cues_shown, b.epochs[0].cues_shown);

    let beats = PeriodicCue::new(Duration::from_secs_f64(0.4286), PeriodicWindow::EveryTick);
    let onsets: Vec<u64> = a
        .events
        .iter()
        .filter(|e| e.label() == "green_screen")
        .map(|e| e.at_ns())
        .collect();
    assert!(onsets.len() > 1);
    assert!(onsets.iter().all(|&t| beats.beat_index(t, 0) % 2 == 0));
    assert!(onsets.windows(2).all(|w| w[1] - w[0] > 1_000 * MS));
}

#[test]
fn random_cue_stays_up_until_answered() {
    let timer = ManualTimer::new();
    let mut input = ScriptedInput::new(timer.clone(), [InputAction::begin(0)]);
    let plan = plan(Condition::Random, &[60.0], 1.0);
    let policy = ConditionPolicy::new(plan.condition, &plan.timing, StdRng::seed_from_u64(42));
    let mut session = Session::new(plan, timer, policy);

    let outcome = session.run(&mut input, &mut Silence).unwrap();
    // nobody answers, so only the first cue can ever appear
    assert_eq!(outcome.epochs[0].cues_shown, 1);
    assert!(outcome.epochs[0].unresolved_cue);
}

#[test]
fn abort_keeps_partial_epoch() {
    let timer = ManualTimer::new();
    let mut input = ScriptedInput::new(
        timer.clone(),
        [
            InputAction::begin(0),
            InputAction::acknowledge(300 * MS),
            InputAction::abort(1_500 * MS),
        ],
    );
    let mut session = Session::new(
        plan(Condition::Random, &[2.0, 2.0], 1.0),
        timer,
        FireAt(vec![ms(100)]),
    );

    let outcome = session.run(&mut input, &mut Silence).unwrap();
    assert_eq!(outcome.status, RunStatus::Aborted { epoch: 1 });
    assert_eq!(outcome.epochs.len(), 1);
    assert_eq!(outcome.epochs[0].reaction_times, vec![ms(200)]);
    assert_eq!(outcome.epochs[0].elapsed, ms(1_500));
    assert_eq!(input.presented().last(), Some(&Screen::Complete));
}

#[test]
fn presses_after_abort_are_not_scored() {
    let timer = ManualTimer::new();
    let mut input = ScriptedInput::new(
        timer.clone(),
        [
            InputAction::begin(0),
            // same capture time: delivered in one batch, abort first
            InputAction::abort(500 * MS),
            InputAction::acknowledge(500 * MS),
        ],
    );
    let mut session = Session::new(
        plan(Condition::Random, &[2.0], 1.0),
        timer,
        FireAt(vec![ms(100)]),
    );

    let outcome = session.run(&mut input, &mut Silence).unwrap();
    assert_eq!(outcome.status, RunStatus::Aborted { epoch: 1 });
    let epoch = &outcome.epochs[0];
    assert!(epoch.reaction_times.is_empty());
    assert_eq!(epoch.error_count, 0);
    assert!(epoch.unresolved_cue);
    assert_eq!(epoch.elapsed, ms(500));
}

#[test]
fn stray_enter_during_epoch_is_ignored() {
    let timer = ManualTimer::new();
    let mut input = ScriptedInput::new(
        timer.clone(),
        [
            InputAction::begin(0),
            InputAction::begin(300 * MS),
            InputAction::acknowledge(600 * MS),
            InputAction::begin(10_000 * MS),
        ],
    );
    let mut session = Session::new(
        plan(Condition::Random, &[2.0, 2.0], 1.0),
        timer,
        FireAt(vec![ms(100)]),
    );

    let outcome = session.run(&mut input, &mut Silence).unwrap();
    assert!(outcome.is_complete());
    let [first, second] = outcome.epochs.as_slice() else {
        panic!("expected two epochs, got {}", outcome.epochs.len());
    };
    assert_eq!(first.reaction_times, vec![ms(500)]);
    assert_eq!(first.error_count, 0);
    assert!(second.unresolved_cue);
    // epoch 2 waits for its own prompt press
    assert_eq!(
        outcome.events.entries(),
        &[
            EventLogEntry::CueShown {
                epoch: 1,
                at_ns: 100 * MS
            },
            EventLogEntry::CueShown {
                epoch: 2,
                at_ns: 10_100 * MS
            },
        ]
    );
}

#[test]
fn closing_before_begin_aborts_without_epoch_data() {
    let timer = ManualTimer::new();
    let mut input = ScriptedInput::new(timer.clone(), [InputAction::begin(0)]);
    let mut session = Session::new(
        plan(Condition::Periodic, &[0.2, 0.2], 1.0),
        timer,
        FireAt(vec![]),
    );

    let outcome = session.run(&mut input, &mut Silence).unwrap();
    assert_eq!(outcome.status, RunStatus::Aborted { epoch: 2 });
    assert_eq!(outcome.epochs.len(), 1);
    assert!(!outcome.is_complete());
}

#[test]
fn resolved_cues_are_logged_when_enabled() {
    let timer = ManualTimer::new();
    let mut input = ScriptedInput::new(
        timer.clone(),
        [InputAction::begin(0), InputAction::acknowledge(400 * MS)],
    );
    let mut plan = plan(Condition::Random, &[1.0], 1.0);
    plan.log_resolved_cues = true;
    let mut session = Session::new(plan, timer, FireAt(vec![ms(100)]));

    let outcome = session.run(&mut input, &mut Silence).unwrap();
    let labels: Vec<_> = outcome.events.iter().map(|e| e.label()).collect();
    assert_eq!(labels, vec!["green_screen", "response"]);
}
