/// Discrete participant actions understood by the session loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Start the next epoch (ENTER)
    Begin,
    /// Respond to a cue (SPACE)
    Acknowledge,
    /// Stop the run early (ESC or window close)
    Abort,
}

/// A key press with the time it was captured, in nanoseconds since the clock origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputAction {
    pub kind: ActionKind,
    pub at_ns: u64,
}

impl InputAction {
    pub fn new(kind: ActionKind, at_ns: u64) -> Self {
        Self { kind, at_ns }
    }

    pub fn begin(at_ns: u64) -> Self {
        Self::new(ActionKind::Begin, at_ns)
    }

    pub fn acknowledge(at_ns: u64) -> Self {
        Self::new(ActionKind::Acknowledge, at_ns)
    }

    pub fn abort(at_ns: u64) -> Self {
        Self::new(ActionKind::Abort, at_ns)
    }
}
