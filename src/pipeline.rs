//! Orchestration of one full pipeline run

use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::data::load_and_clean;
use crate::report::{Report, ReportOptions};
use crate::summary::{save_summary, Summary, SUMMARY_FILE};

/// A report the orchestrator decided not to run
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    pub report: Report,
    pub reason: String,
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub out_dir: PathBuf,
    pub summary: Summary,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<Skipped>,
}

/// Load, summarize and run every report in the fixed order.
///
/// The first error aborts the run; files written by earlier steps stay on
/// disk. A report whose columns are absent is skipped with a reason instead.
pub fn run_pipeline(config: &PipelineConfig) -> crate::Result<RunReport> {
    let layout = config.layout();
    layout.prepare()?;

    let load_start = Instant::now();
    let frame = load_and_clean(config)?;
    info!(
        rows = frame.height(),
        input = %config.input.display(),
        "loaded transactions"
    );
    debug!(elapsed_ms = load_start.elapsed().as_millis() as u64, "load and clean");

    let summary = save_summary(&frame, &layout)?;
    let mut written = vec![layout.table(SUMMARY_FILE)];
    let mut skipped = Vec::new();

    let options = ReportOptions::from(config);
    for report in Report::ALL {
        if let Err(condition) = frame.require(report.name(), report.required_columns()) {
            if report.is_optional() {
                info!(%report, reason = %condition, "skipping report");
            } else {
                warn!(%report, reason = %condition, "skipping report");
            }
            skipped.push(Skipped {
                report,
                reason: condition.to_string(),
            });
            continue;
        }

        let start = Instant::now();
        written.extend(report.run(&frame, &layout, &options)?);
        debug!(%report, elapsed_ms = start.elapsed().as_millis() as u64, "report done");
    }

    Ok(RunReport {
        out_dir: layout.root().to_path_buf(),
        summary,
        written,
        skipped,
    })
}
