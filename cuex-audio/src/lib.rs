mod mix;
mod output;
mod track;

pub use mix::{fill_looped, LoopCursor};
pub use output::BackgroundAudio;
pub use track::{AudioError, Track};
