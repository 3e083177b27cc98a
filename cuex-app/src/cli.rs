use crate::config::AppConfig;
use clap::Parser;
use cuex_core::Condition;
use cuex_experiment::{parse_epoch_durations, ConfigError, ExperimentConfig};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "cuex")]
#[command(about = "Timed cue/response reaction-time experiment")]
#[command(version)]
pub struct Cli {
    /// Participant name, used in the results and file names
    #[arg(short, long)]
    pub participant: String,

    /// Cue condition: periodic (beats) or random (no-beats)
    #[arg(short, long)]
    pub condition: Condition,

    /// Epoch durations in seconds (comma-separated or repeated)
    #[arg(short = 'e', long = "epoch", value_delimiter = ',', required = true)]
    pub durations: Vec<String>,

    /// Expected number of epochs, checked against the durations given
    #[arg(long = "epochs")]
    pub epoch_count: Option<String>,

    /// TOML settings file; created with defaults if missing
    #[arg(long, default_value = "cuex.toml")]
    pub config: PathBuf,

    /// Directory for the results files (overrides the config file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Run with a synthetic participant on a simulated clock instead of a window
    #[arg(long)]
    pub simulate: bool,

    /// Seed for the cue generator (and the synthetic participant)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use a window instead of fullscreen
    #[arg(long)]
    pub windowed: bool,

    /// Log every resolved cue as a `response` event
    #[arg(long)]
    pub log_responses: bool,

    /// Log filter, e.g. `debug` or `cuex_experiment=trace` (default: RUST_LOG, else info)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn experiment_config(&self, settings: &AppConfig) -> Result<ExperimentConfig, ConfigError> {
        let durations = parse_epoch_durations(&self.durations, self.epoch_count.as_deref())?;
        Ok(ExperimentConfig {
            participant: self.participant.clone(),
            condition: self.condition,
            epoch_durations_secs: durations,
            timing: settings.timing.clone(),
            log_resolved_cues: self.log_responses || settings.output.log_resolved_cues,
        })
    }

    pub fn output_dir(&self, settings: &AppConfig) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| settings.output.directory.clone())
    }
}
