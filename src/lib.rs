//! grocery-charts: exploratory sales analytics for grocery transaction data
//!
//! Loads a transaction CSV with Polars, cleans dates and numeric columns,
//! writes summary metrics and aggregate tables as CSV, and renders the
//! matching charts with Plotters.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod data;
pub mod demographics;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod report;
pub mod summary;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use config::{OutputLayout, PipelineConfig};
pub use data::{load_and_clean, SalesFrame};
pub use demographics::revenue_by_age;
pub use error::PipelineError;
pub use pipeline::{run_pipeline, RunReport, Skipped};
pub use report::Report;
pub use summary::Summary;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
