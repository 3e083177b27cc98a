mod app;
mod cli;
mod config;

use anyhow::{bail, Context, Result};
use app::WindowFrontend;
use clap::Parser;
use cli::Cli;
use config::AppConfig;
use cuex_audio::BackgroundAudio;
use cuex_core::{Condition, RunOutcome, RunStatus};
use cuex_experiment::{
    ConditionPolicy, ExperimentPlan, ParticipantModel, Session, Silence, SimulatedParticipant,
};
use cuex_export::{export_run, ExportOptions};
use cuex_render::load_font;
use cuex_timing::{HighPrecisionTimer, ManualTimer};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    let mut settings = AppConfig::load_or_default(&cli.config)?;
    if cli.windowed {
        settings.display.fullscreen = false;
    }
    let plan = cli
        .experiment_config(&settings)
        .and_then(|cfg| cfg.validate())
        .context("invalid experiment configuration")?;

    let outcome = if cli.simulate {
        run_simulated(plan, cli.seed)?
    } else {
        run_windowed(plan, &settings, cli.seed)?
    };

    let options = ExportOptions {
        output_dir: cli.output_dir(&settings),
        summary: settings.output.summary,
    };
    let paths = export_run(&outcome, &options)?;
    println!("Results saved to {}", paths.results.display());
    println!("Event log saved to {}", paths.events.display());

    if let RunStatus::Aborted { epoch } = outcome.status {
        bail!("run aborted during epoch {epoch}; partial results were saved");
    }
    Ok(())
}

fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter `{directives}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}

fn rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
}

fn run_windowed(
    plan: ExperimentPlan,
    settings: &AppConfig,
    seed: Option<u64>,
) -> Result<RunOutcome> {
    let mut audio = BackgroundAudio::new(settings.audio.volume);
    let track = match plan.condition {
        Condition::Periodic => &settings.audio.periodic_track,
        Condition::Random => &settings.audio.random_track,
    };
    if let Some(path) = track {
        audio.load(plan.condition, path)?;
    }

    let font = load_font(settings.display.font.as_deref())?;
    let timer = HighPrecisionTimer::new();
    let mut frontend = WindowFrontend::new(
        timer.clone(),
        settings.display.clone(),
        font,
        plan.epochs.len(),
    )?;

    let policy = ConditionPolicy::new(plan.condition, &plan.timing, rng(seed));
    let mut session = Session::new(plan, timer, policy);
    let outcome = session.run(&mut frontend, &mut audio)?;

    if outcome.is_complete() {
        let hold = Duration::try_from_secs_f64(settings.display.complete_hold_secs)
            .unwrap_or(Duration::ZERO);
        frontend.linger(hold)?;
    }
    Ok(outcome)
}

/// Full run against a synthetic participant on a simulated clock; finishes instantly
fn run_simulated(plan: ExperimentPlan, seed: Option<u64>) -> Result<RunOutcome> {
    let timer = ManualTimer::new();
    let mut participant = SimulatedParticipant::new(
        ParticipantModel::default(),
        rng(seed.map(|s| s.wrapping_add(1))),
        timer.clone(),
    );
    let policy = ConditionPolicy::new(plan.condition, &plan.timing, rng(seed));
    let mut session = Session::new(plan, timer, policy);

    info!("simulated run");
    let outcome = session.run(&mut participant, &mut Silence)?;
    for epoch in &outcome.epochs {
        info!(
            epoch = epoch.epoch,
            cues = epoch.cues_shown,
            reactions = epoch.reaction_times.len(),
            errors = epoch.error_count,
            "simulated epoch"
        );
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuex_experiment::{CueTiming, ExperimentConfig};

    fn plan(condition: Condition) -> ExperimentPlan {
        ExperimentConfig {
            participant: "sim".to_string(),
            condition,
            epoch_durations_secs: vec![20.0, 20.0],
            timing: CueTiming::default(),
            log_resolved_cues: false,
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn simulated_run_completes_and_exports() {
        let outcome = run_simulated(plan(Condition::Random), Some(9)).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.epochs.len(), 2);
        assert!(outcome.total_reactions() > 0);
        for epoch in &outcome.epochs {
            // a false alarm can beat the scheduled reaction, never follow it
            assert!(epoch.reaction_times.iter().all(|rt| *rt < Duration::from_millis(400)));
            assert_eq!(
                epoch.cues_shown as usize,
                epoch.reaction_times.len() + usize::from(epoch.unresolved_cue)
            );
        }

        let dir = tempfile::tempdir().unwrap();
        let options = ExportOptions {
            output_dir: dir.path().to_path_buf(),
            summary: true,
        };
        let paths = export_run(&outcome, &options).unwrap();
        let rows = std::fs::read_to_string(paths.results).unwrap().lines().count();
        assert_eq!(rows, 1 + outcome.total_reactions());
    }

    #[test]
    fn seeded_simulation_is_reproducible() {
        let a = run_simulated(plan(Condition::Periodic), Some(3)).unwrap();
        let b = run_simulated(plan(Condition::Periodic), Some(3)).unwrap();
        assert_eq!(a.epochs, b.epochs);
        assert_eq!(a.events, b.events);
    }
}
