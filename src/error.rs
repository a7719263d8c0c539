//! Error conditions raised by the pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Typed failures that callers may want to tell apart.
///
/// Library functions return [`crate::Result`]; these variants travel inside
/// the `anyhow::Error` and can be recovered with `downcast_ref`.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input missing/unreadable, or an output location that cannot be written
    #[error("cannot access {}: {source}", path.display())]
    DataAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A report needs a column the cleaned table does not have
    #[error("{report} needs column '{column}', which is not in the input")]
    MissingColumn {
        report: &'static str,
        column: &'static str,
    },

    /// Drawing or encoding a chart failed
    #[error("failed to render {}: {message}", path.display())]
    Chart { path: PathBuf, message: String },
}

impl PipelineError {
    pub fn data_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::DataAccess {
            path: path.into(),
            source,
        }
    }
}
