pub mod condition;
pub mod epoch;
pub mod event;
pub mod input;
pub mod run;
pub mod screen;

pub use condition::{Condition, ParseConditionError};
pub use epoch::{EpochConfig, EpochResult};
pub use event::{CueEvent, ErrorEvent, EventLog, EventLogEntry, ReactionRecord};
pub use input::{ActionKind, InputAction};
pub use run::{RunOutcome, RunStatus};
pub use screen::Screen;
