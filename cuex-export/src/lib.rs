mod paths;
mod summary;
mod tables;

pub use paths::{artifact_paths, sanitize_participant, ArtifactPaths};
pub use summary::{EpochSummary, RunSummary};
pub use tables::{
    event_rows, result_rows, write_events, write_results, EventRow, ResultRow, EVENTS_HEADER,
    RESULTS_HEADER, TIMESTAMP_FORMAT,
};

use cuex_core::RunOutcome;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("cannot create {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("cannot write {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    /// Also write the JSON per-epoch summary
    pub summary: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            summary: true,
        }
    }
}

/// Writes the results table, the event log and (optionally) the summary for one run.
/// Returns the paths that were written.
pub fn export_run(
    outcome: &RunOutcome,
    options: &ExportOptions,
) -> Result<ArtifactPaths, ExportError> {
    fs::create_dir_all(&options.output_dir).map_err(|source| ExportError::Io {
        path: options.output_dir.clone(),
        source,
    })?;
    let paths = artifact_paths(&options.output_dir, &outcome.participant, outcome.started_at);

    write_results(create_new(&paths.results)?, &outcome.epochs).map_err(|source| {
        ExportError::Csv {
            path: paths.results.clone(),
            source,
        }
    })?;
    write_events(create_new(&paths.events)?, outcome).map_err(|source| ExportError::Csv {
        path: paths.events.clone(),
        source,
    })?;
    if options.summary {
        let file = create_new(&paths.summary)?;
        serde_json::to_writer_pretty(file, &RunSummary::from(outcome)).map_err(|source| {
            ExportError::Json {
                path: paths.summary.clone(),
                source,
            }
        })?;
    }

    info!(
        results = %paths.results.display(),
        events = %paths.events.display(),
        rows = outcome.total_reactions(),
        "run exported"
    );
    Ok(paths)
}

/// Opens `path` for writing, failing if it already exists
fn create_new(path: &Path) -> Result<File, ExportError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
}
