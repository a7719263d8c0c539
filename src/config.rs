//! Pipeline configuration and output directory layout

use crate::error::PipelineError;
use std::path::{Path, PathBuf};

/// Default location of the transaction file
pub const DEFAULT_INPUT: &str = "grocery_chain_data.csv";

/// Default output root; charts go to its `plots/` subdirectory
pub const DEFAULT_OUT_DIR: &str = "grocery_charts_outputs";

/// Columns coerced to numbers by the cleaner when present
pub const DEFAULT_NUMERIC_COLUMNS: [&str; 6] = [
    "quantity",
    "unit_price",
    "total_amount",
    "discount_amount",
    "final_amount",
    "loyalty_points",
];

/// Everything one run needs, passed explicitly into [`crate::run_pipeline`]
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to the input CSV file
    pub input: PathBuf,
    /// Output root directory
    pub out_dir: PathBuf,
    /// Columns to coerce to `f64`
    pub numeric_columns: Vec<String>,
    /// Upper bound on rows drawn for the discount scatter plot
    pub sample_size: usize,
    /// Seed for the scatter plot sampler
    pub seed: u64,
    /// When false only CSV tables are written
    pub render_charts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            numeric_columns: DEFAULT_NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
            sample_size: 800,
            seed: 1,
            render_charts: true,
        }
    }
}

impl PipelineConfig {
    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.out_dir)
    }
}

/// Resolves artifact names to paths under the output root
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    plots: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let plots = root.join("plots");
        Self { root, plots }
    }

    /// Create `<out>` and `<out>/plots`
    pub fn prepare(&self) -> crate::Result<()> {
        std::fs::create_dir_all(&self.plots)
            .map_err(|e| PipelineError::data_access(&self.plots, e))?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub fn plot(&self, file_name: &str) -> PathBuf {
        self.plots.join(file_name)
    }
}
