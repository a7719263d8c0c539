//! Command-line interface definitions and argument parsing

use clap::Parser;
use std::path::PathBuf;

use crate::config::{PipelineConfig, DEFAULT_INPUT, DEFAULT_OUT_DIR};

/// Sales charts and summary tables for grocery transaction data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Directory for CSV tables; charts go to its plots/ subdirectory
    #[arg(short, long, default_value = DEFAULT_OUT_DIR)]
    pub out_dir: PathBuf,

    /// Maximum number of rows drawn in the discount scatter plot
    #[arg(long, default_value = "800")]
    pub sample_size: usize,

    /// Seed for the scatter plot sample
    #[arg(long, default_value = "1")]
    pub seed: u64,

    /// Write CSV tables only, skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Revenue-by-age mode: chart mean purchase per age group from this CSV
    /// Example: --age-revenue walmart.csv
    #[arg(long, value_name = "CSV")]
    pub age_revenue: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build the pipeline configuration for this invocation
    pub fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            input: self.input.clone(),
            out_dir: self.out_dir.clone(),
            sample_size: self.sample_size,
            seed: self.seed,
            render_charts: !self.no_charts,
            ..PipelineConfig::default()
        }
    }
}
