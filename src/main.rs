//! grocery-charts: summary tables and charts for a grocery transaction CSV
//!
//! This is the main entrypoint that wires the CLI to the pipeline and the
//! revenue-by-age mode.

use anyhow::Result;
use clap::Parser;
use grocery_charts::{revenue_by_age, run_pipeline, Args};
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Some(ref input) = args.age_revenue {
        run_age_mode(&args, input)?;
    } else {
        run_full_pipeline(&args)?;
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only the completion line
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Run the revenue-by-age chart for a demographic purchases file
fn run_age_mode(args: &Args, input: &Path) -> Result<()> {
    let config = args.to_config();
    let start_time = Instant::now();

    let written = revenue_by_age(input, &config.layout(), config.render_charts)?;

    if args.verbose {
        for path in &written {
            println!("  wrote {}", path.display());
        }
        println!("  Processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    }
    println!("Revenue by age written to: {}", config.out_dir.display());

    Ok(())
}

/// Run the full summary and chart pipeline
fn run_full_pipeline(args: &Args) -> Result<()> {
    let config = args.to_config();
    let start_time = Instant::now();

    let report = run_pipeline(&config)?;

    if args.verbose {
        println!("=== Summary ===");
        for (name, value) in report.summary.rows() {
            match value {
                Some(value) => println!("  {name}: {value:.2}"),
                None => println!("  {name}: n/a"),
            }
        }
        for skipped in &report.skipped {
            println!("  skipped {}: {}", skipped.report, skipped.reason);
        }
        println!(
            "  {} files written in {:.2}s",
            report.written.len(),
            start_time.elapsed().as_secs_f64()
        );
    }
    println!("Charts and CSV outputs written to: {}", report.out_dir.display());

    Ok(())
}
