//! Revenue by customer age group

use std::path::{Path, PathBuf};
use tracing::info;

use crate::aggregate::mean_by;
use crate::config::OutputLayout;
use crate::data::{clean, read_csv};
use crate::export::{write_table, Table};
use crate::viz;

pub const AGE: &str = "Age";
pub const PURCHASE: &str = "Purchase";

const REPORT: &str = "revenue by age";

/// Mean purchase per age group, in order of first appearance
pub fn revenue_by_age(
    input: &Path,
    layout: &OutputLayout,
    render_charts: bool,
) -> crate::Result<Vec<PathBuf>> {
    layout.prepare()?;

    let frame = clean(read_csv(input)?, &[PURCHASE.to_string()])?;
    frame.require(REPORT, &[AGE, PURCHASE])?;
    info!(rows = frame.height(), input = %input.display(), "loaded purchases");

    let means = mean_by(&frame, AGE, PURCHASE)?;
    let mut written = Vec::new();

    if render_charts {
        let bars: Vec<(String, f64)> = means
            .iter()
            .map(|(age, mean)| (age.clone(), mean.unwrap_or(0.0)))
            .collect();
        let path = layout.plot("revenue_by_age.png");
        viz::horizontal_bar_chart(&path, "Revenue by Age", "Revenue by age", &bars)?;
        written.push(path);
    }

    let table = Table::new()
        .text(AGE, means.iter().map(|(age, _)| Some(age.clone())).collect())
        .number(PURCHASE, means.iter().map(|(_, mean)| *mean).collect());
    let path = layout.table("revenue_by_age.csv");
    write_table(table, &path)?;
    written.push(path);

    Ok(written)
}
