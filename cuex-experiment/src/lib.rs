pub mod config;
pub mod cue;
pub mod script;
pub mod session;
pub mod state;
pub mod tracker;
pub use config::{
    parse_epoch_durations, ConfigError, CueTiming, ExperimentConfig, ExperimentPlan,
    PeriodicWindow, RandomMode,
};
pub use cue::{ConditionPolicy, CueGenerator, CuePolicy, PeriodicCue, RandomCue, TickContext};
pub use script::{ParticipantModel, ScriptedInput, SimulatedParticipant};
pub use session::{Gate, InputSource, Presenter, Session, Silence, Soundtrack};
pub use state::EpochState;
pub use tracker::{Resolution, ResponseTracker};
