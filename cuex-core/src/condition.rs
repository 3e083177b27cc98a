use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy governing when cues appear during an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    /// Beat-aligned cues over a rhythmic track
    Periodic,
    /// Stochastic cues over a non-rhythmic track
    Random,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Periodic => "periodic",
            Condition::Random => "random",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown condition `{0}` (expected `periodic`/`beats` or `random`/`no-beats`)")]
pub struct ParseConditionError(pub String);

impl FromStr for Condition {
    type Err = ParseConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "periodic" | "beats" => Ok(Condition::Periodic),
            "random" | "no-beats" => Ok(Condition::Random),
            other => Err(ParseConditionError(other.to_string())),
        }
    }
}
