use cuex_core::{Condition, EpochConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rejections raised before any epoch starts
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("participant name must not be empty")]
    EmptyParticipant,
    #[error("at least one epoch duration is required")]
    NoEpochs,
    #[error("number of epochs `{0}` is not a positive whole number")]
    InvalidEpochCount(String),
    #[error("{expected} epochs requested but {given} durations given")]
    EpochCountMismatch { expected: usize, given: usize },
    #[error("epoch {epoch} duration `{value}` is not a number")]
    NotANumber { epoch: usize, value: String },
    #[error("epoch {epoch} duration must be a positive number of seconds, got {value}")]
    NonPositiveDuration { epoch: usize, value: f64 },
    #[error("invalid timing setting `{field}`: {reason}")]
    InvalidTiming {
        field: &'static str,
        reason: String,
    },
}

/// How the RANDOM condition decides to fire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum RandomMode {
    /// Elapsed-time hazard: P(fire during Δt) = 1 - exp(-rate_hz * Δt)
    Poisson { rate_hz: f64 },
    /// One Bernoulli draw per tick, so the cue rate scales with the tick rate
    PerTick { probability: f64 },
}

impl Default for RandomMode {
    fn default() -> Self {
        RandomMode::Poisson { rate_hz: 1.0 }
    }
}

/// Whether a qualifying (even) beat window may fire more than once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeriodicWindow {
    /// Any tick inside an even window may fire, subject only to the minimum gap
    #[default]
    EveryTick,
    /// At most one cue per even window
    OncePerWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CueTiming {
    /// Beat length of the rhythmic track (0.4286 s = 140 BPM)
    pub beat_interval_secs: f64,
    /// A new cue needs strictly more than this since the previous one
    pub min_gap_secs: f64,
    pub tick_interval_ms: f64,
    pub periodic_window: PeriodicWindow,
    pub random: RandomMode,
}

impl Default for CueTiming {
    fn default() -> Self {
        Self {
            beat_interval_secs: 0.4286,
            min_gap_secs: 1.0,
            tick_interval_ms: 1.0,
            periodic_window: PeriodicWindow::default(),
            random: RandomMode::default(),
        }
    }
}

impl CueTiming {
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::InvalidTiming {
                field,
                reason: reason.into(),
            }
        }

        let beat = Duration::try_from_secs_f64(self.beat_interval_secs)
            .map_err(|_| invalid("beat_interval_secs", "must be a positive number of seconds"))?;
        if beat.is_zero() {
            return Err(invalid("beat_interval_secs", "must be at least 1 ns"));
        }
        Duration::try_from_secs_f64(self.min_gap_secs)
            .map_err(|_| invalid("min_gap_secs", "must be zero or a positive number of seconds"))?;
        if !(self.tick_interval_ms.is_finite() && self.tick_interval_ms > 0.0) {
            return Err(invalid("tick_interval_ms", "must be a positive number"));
        }
        if self.tick_interval().is_zero() {
            return Err(invalid("tick_interval_ms", "must be at least 1 ns"));
        }
        match self.random {
            RandomMode::Poisson { rate_hz } if !(rate_hz.is_finite() && rate_hz >= 0.0) => {
                Err(invalid("random.rate_hz", "must be zero or positive"))
            }
            RandomMode::PerTick { probability } if !(0.0..=1.0).contains(&probability) => {
                Err(invalid("random.probability", "must lie in [0, 1]"))
            }
            _ => Ok(()),
        }
    }

    pub fn beat_interval(&self) -> Duration {
        saturating_secs(self.beat_interval_secs)
    }

    pub fn min_gap(&self) -> Duration {
        saturating_secs(self.min_gap_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_nanos((self.tick_interval_ms * 1e6).round() as u64)
    }
}

/// Unvalidated values clamp instead of panicking
fn saturating_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

/// Settings collected from the operator before the run
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub participant: String,
    pub condition: Condition,
    pub epoch_durations_secs: Vec<f64>,
    pub timing: CueTiming,
    /// Also write a `response` entry to the event log for every resolved cue
    pub log_resolved_cues: bool,
}

/// A validated, immutable run plan
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentPlan {
    pub participant: String,
    pub condition: Condition,
    pub epochs: Vec<EpochConfig>,
    pub timing: CueTiming,
    pub log_resolved_cues: bool,
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<ExperimentPlan, ConfigError> {
        let participant = self.participant.trim();
        if participant.is_empty() {
            return Err(ConfigError::EmptyParticipant);
        }
        if self.epoch_durations_secs.is_empty() {
            return Err(ConfigError::NoEpochs);
        }
        self.timing.validate()?;

        let epochs = self
            .epoch_durations_secs
            .iter()
            .enumerate()
            .map(|(i, &secs)| {
                let index = i + 1;
                let duration = Duration::try_from_secs_f64(secs)
                    .ok()
                    .filter(|d| !d.is_zero())
                    .ok_or(ConfigError::NonPositiveDuration {
                        epoch: index,
                        value: secs,
                    })?;
                Ok(EpochConfig {
                    index,
                    duration,
                    condition: self.condition,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(ExperimentPlan {
            participant: participant.to_string(),
            condition: self.condition,
            epochs,
            timing: self.timing.clone(),
            log_resolved_cues: self.log_resolved_cues,
        })
    }
}

/// Parses operator-entered durations, optionally cross-checked against an entered epoch count
pub fn parse_epoch_durations<S: AsRef<str>>(
    entries: &[S],
    epoch_count: Option<&str>,
) -> Result<Vec<f64>, ConfigError> {
    let durations = entries
        .iter()
        .map(AsRef::as_ref)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(i, raw)| {
            raw.parse::<f64>().map_err(|_| ConfigError::NotANumber {
                epoch: i + 1,
                value: raw.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if durations.is_empty() {
        return Err(ConfigError::NoEpochs);
    }

    if let Some(raw) = epoch_count {
        let expected = raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| ConfigError::InvalidEpochCount(raw.to_string()))?;
        if expected != durations.len() {
            return Err(ConfigError::EpochCountMismatch {
                expected,
                given: durations.len(),
            });
        }
    }

    Ok(durations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(participant: &str, durations: Vec<f64>) -> ExperimentConfig {
        ExperimentConfig {
            participant: participant.to_string(),
            condition: Condition::Periodic,
            epoch_durations_secs: durations,
            timing: CueTiming::default(),
            log_resolved_cues: false,
        }
    }

    #[test]
    fn valid_config_produces_indexed_epochs() {
        let plan = config("  Ada ", vec![10.0, 2.5]).validate().unwrap();
        assert_eq!(plan.participant, "Ada");
        assert_eq!(plan.epochs.len(), 2);
        assert_eq!(plan.epochs[0].index, 1);
        assert_eq!(plan.epochs[1].index, 2);
        assert_eq!(plan.epochs[1].duration, Duration::from_millis(2500));
        assert!(plan.epochs.iter().all(|e| e.condition == Condition::Periodic));
    }

    #[test]
    fn empty_participant_is_rejected() {
        assert_eq!(
            config("   ", vec![1.0]).validate(),
            Err(ConfigError::EmptyParticipant)
        );
    }

    #[test]
    fn non_positive_durations_are_rejected() {
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let err = config("p", vec![5.0, bad]).validate().unwrap_err();
            assert!(
                matches!(err, ConfigError::NonPositiveDuration { epoch: 2, .. }),
                "{bad} gave {err:?}"
            );
        }
        assert_eq!(config("p", vec![]).validate(), Err(ConfigError::NoEpochs));
    }

    #[test]
    fn invalid_timing_is_rejected() {
        let mut cfg = config("p", vec![1.0]);
        cfg.timing.random = RandomMode::PerTick { probability: 1.5 };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidTiming {
                field: "random.probability",
                ..
            })
        ));

        let mut cfg = config("p", vec![1.0]);
        cfg.timing.beat_interval_secs = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn timing_outside_duration_range_is_rejected() {
        let cases: [(&str, fn(&mut CueTiming)); 5] = [
            ("min_gap_secs", |t| t.min_gap_secs = 1e20),
            ("beat_interval_secs", |t| t.beat_interval_secs = 1e20),
            ("beat_interval_secs", |t| t.beat_interval_secs = 1e-12),
            ("tick_interval_ms", |t| t.tick_interval_ms = 1e-7),
            ("tick_interval_ms", |t| t.tick_interval_ms = f64::INFINITY),
        ];
        for (field, tweak) in cases {
            let mut timing = CueTiming::default();
            tweak(&mut timing);
            let err = timing.validate().unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidTiming { field: f, .. } if f == field),
                "{timing:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn smallest_accepted_tick_is_one_nanosecond() {
        let timing = CueTiming {
            tick_interval_ms: 1e-6,
            ..CueTiming::default()
        };
        assert_eq!(timing.validate(), Ok(()));
        assert_eq!(timing.tick_interval(), Duration::from_nanos(1));
    }

    #[test]
    fn accessors_clamp_unvalidated_values() {
        let timing = CueTiming {
            min_gap_secs: 1e20,
            beat_interval_secs: -1.0,
            ..CueTiming::default()
        };
        assert_eq!(timing.min_gap(), Duration::MAX);
        assert_eq!(timing.beat_interval(), Duration::ZERO);
    }

    #[test]
    fn parses_durations_and_checks_count() {
        assert_eq!(
            parse_epoch_durations(&["60", " 90.5 "], Some("2")),
            Ok(vec![60.0, 90.5])
        );
        assert_eq!(
            parse_epoch_durations(&["60", "abc"], None),
            Err(ConfigError::NotANumber {
                epoch: 2,
                value: "abc".into()
            })
        );
        assert_eq!(
            parse_epoch_durations(&["60"], Some("two")),
            Err(ConfigError::InvalidEpochCount("two".into()))
        );
        assert_eq!(
            parse_epoch_durations(&["60"], Some("3")),
            Err(ConfigError::EpochCountMismatch {
                expected: 3,
                given: 1
            })
        );
        assert_eq!(
            parse_epoch_durations::<&str>(&[], None),
            Err(ConfigError::NoEpochs)
        );
    }

    #[test]
    fn timing_deserializes_from_toml_with_defaults() {
        let timing: CueTiming = toml::from_str(
            r#"
            min_gap_secs = 0.5
            periodic_window = "once-per-window"

            [random]
            mode = "per-tick"
            probability = 0.05
            "#,
        )
        .unwrap();
        assert_eq!(timing.min_gap_secs, 0.5);
        assert_eq!(timing.beat_interval_secs, 0.4286);
        assert_eq!(timing.periodic_window, PeriodicWindow::OncePerWindow);
        assert_eq!(timing.random, RandomMode::PerTick { probability: 0.05 });
    }
}
