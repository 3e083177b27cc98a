use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Where one run's artifacts go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub results: PathBuf,
    pub events: PathBuf,
    pub summary: PathBuf,
}

/// Builds `experiment_{results,events,summary}_<participant>_<YYYYmmdd_HHMMSS>` paths
pub fn artifact_paths(dir: &Path, participant: &str, stamp: DateTime<Local>) -> ArtifactPaths {
    let suffix = format!(
        "{}_{}",
        sanitize_participant(participant),
        stamp.format("%Y%m%d_%H%M%S")
    );
    ArtifactPaths {
        results: dir.join(format!("experiment_results_{suffix}.csv")),
        events: dir.join(format!("experiment_events_{suffix}.csv")),
        summary: dir.join(format!("experiment_summary_{suffix}.json")),
    }
}

/// Reduces a participant name to characters that are safe in a file name
pub fn sanitize_participant(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.chars().all(|c| c == '_') {
        "participant".to_string()
    } else {
        cleaned
    }
}
