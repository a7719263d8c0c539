//! The chart and table reports generated from the cleaned table
//!
//! Each [`Report`] declares the columns it reads so the orchestrator can
//! decide up front whether to run it or skip it.

use std::fmt;
use std::path::PathBuf;
use tracing::info;

use crate::aggregate::{
    discount_points, monthly_totals, rank_descending, store_month_pivot, sum_by, weekday_profile,
    KeyedTotal,
};
use crate::config::{OutputLayout, PipelineConfig};
use crate::data::{
    SalesFrame, AISLE, DISCOUNT_AMOUNT, FINAL_AMOUNT, PRODUCT_NAME, STORE_NAME, WEEKDAY,
    YEAR_MONTH,
};
use crate::export::{write_table, Table};
use crate::viz::{self, Axes};

pub const TOP_STORES: usize = 12;
pub const TOP_AISLES: usize = 12;
pub const TOP_PRODUCTS: usize = 15;
pub const HEATMAP_STORES: usize = 12;

/// Settings the reports read from the run configuration
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub sample_size: usize,
    pub seed: u64,
    pub render_charts: bool,
}

impl From<&PipelineConfig> for ReportOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            sample_size: config.sample_size,
            seed: config.seed,
            render_charts: config.render_charts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    MonthlySales,
    StoreRanking,
    AisleShare,
    ProductRanking,
    WeekdayPattern,
    DiscountScatter,
    StoreMonthHeatmap,
}

impl Report {
    /// Run order used by the pipeline
    pub const ALL: [Report; 7] = [
        Report::MonthlySales,
        Report::StoreRanking,
        Report::AisleShare,
        Report::ProductRanking,
        Report::WeekdayPattern,
        Report::DiscountScatter,
        Report::StoreMonthHeatmap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Report::MonthlySales => "monthly sales",
            Report::StoreRanking => "store ranking",
            Report::AisleShare => "aisle share",
            Report::ProductRanking => "product ranking",
            Report::WeekdayPattern => "weekday pattern",
            Report::DiscountScatter => "discount scatter",
            Report::StoreMonthHeatmap => "store-month heatmap",
        }
    }

    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Report::MonthlySales => &[YEAR_MONTH, FINAL_AMOUNT],
            Report::StoreRanking => &[STORE_NAME, FINAL_AMOUNT],
            Report::AisleShare => &[AISLE, FINAL_AMOUNT],
            Report::ProductRanking => &[PRODUCT_NAME, FINAL_AMOUNT],
            Report::WeekdayPattern => &[WEEKDAY, FINAL_AMOUNT],
            Report::DiscountScatter => &[DISCOUNT_AMOUNT, FINAL_AMOUNT],
            Report::StoreMonthHeatmap => &[STORE_NAME, YEAR_MONTH, FINAL_AMOUNT],
        }
    }

    /// Whether a missing column is an expected input shape rather than a gap
    pub fn is_optional(self) -> bool {
        matches!(self, Report::AisleShare)
    }

    /// Write this report's table and chart, returning the files written
    pub fn run(
        self,
        frame: &SalesFrame,
        layout: &OutputLayout,
        options: &ReportOptions,
    ) -> crate::Result<Vec<PathBuf>> {
        let mut out = Outputs::new(layout, options.render_charts);

        match self {
            Report::MonthlySales => monthly_sales(frame, &mut out)?,
            Report::StoreRanking => store_ranking(frame, &mut out)?,
            Report::AisleShare => aisle_share(frame, &mut out)?,
            Report::ProductRanking => product_ranking(frame, &mut out)?,
            Report::WeekdayPattern => weekday_pattern(frame, &mut out)?,
            Report::DiscountScatter => discount_scatter(frame, options, &mut out)?,
            Report::StoreMonthHeatmap => store_month_heatmap(frame, &mut out)?,
        }

        Ok(out.written)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tracks what one report wrote
struct Outputs<'a> {
    layout: &'a OutputLayout,
    render_charts: bool,
    written: Vec<PathBuf>,
}

impl<'a> Outputs<'a> {
    fn new(layout: &'a OutputLayout, render_charts: bool) -> Self {
        Self {
            layout,
            render_charts,
            written: Vec::new(),
        }
    }

    fn table(&mut self, file_name: &str, table: Table) -> crate::Result<()> {
        let path = self.layout.table(file_name);
        write_table(table, &path)?;
        info!(path = %path.display(), "wrote table");
        self.written.push(path);
        Ok(())
    }

    fn chart<F>(&mut self, file_name: &str, draw: F) -> crate::Result<()>
    where
        F: FnOnce(&std::path::Path) -> crate::Result<()>,
    {
        if !self.render_charts {
            return Ok(());
        }
        let path = self.layout.plot(file_name);
        draw(&path)?;
        info!(path = %path.display(), "wrote chart");
        self.written.push(path);
        Ok(())
    }
}

fn ranking_table(key: &str, rows: &[KeyedTotal]) -> Table {
    Table::new()
        .text(key, rows.iter().map(|(k, _)| Some(k.clone())).collect())
        .number(FINAL_AMOUNT, rows.iter().map(|(_, v)| Some(*v)).collect())
}

fn top(rows: &[KeyedTotal], n: usize) -> &[KeyedTotal] {
    &rows[..rows.len().min(n)]
}

fn monthly_sales(frame: &SalesFrame, out: &mut Outputs<'_>) -> crate::Result<()> {
    let months = monthly_totals(frame)?;
    let labels: Vec<String> = months.iter().map(|m| m.label.clone()).collect();
    let values: Vec<Option<f64>> = months.iter().map(|m| Some(m.total)).collect();

    out.chart("monthly_sales.png", |path| {
        let axes = Axes { x: "Month", y: "Sales" };
        viz::line_chart(path, "Monthly Sales (Final Amount)", axes, &labels, &values)
    })?;

    let table = Table::new()
        .text(
            YEAR_MONTH,
            months
                .iter()
                .map(|m| Some(m.month.format("%Y-%m-%d").to_string()))
                .collect(),
        )
        .number(FINAL_AMOUNT, values.clone());
    out.table("monthly_sales.csv", table)
}

fn store_ranking(frame: &SalesFrame, out: &mut Outputs<'_>) -> crate::Result<()> {
    let ranked = rank_descending(sum_by(frame, STORE_NAME)?);

    out.chart("top_stores.png", |path| {
        let axes = Axes { x: "Store", y: "Sales" };
        viz::bar_chart(path, "Top 12 Stores by Sales", axes, top(&ranked, TOP_STORES))
    })?;
    out.table("sales_by_store.csv", ranking_table(STORE_NAME, &ranked))
}

fn aisle_share(frame: &SalesFrame, out: &mut Outputs<'_>) -> crate::Result<()> {
    let ranked = rank_descending(sum_by(frame, AISLE)?);

    out.chart("aisle_pie_top12.png", |path| {
        viz::pie_chart(path, "Sales Share by Aisle (Top 12)", top(&ranked, TOP_AISLES))
    })?;
    out.table("sales_by_aisle.csv", ranking_table(AISLE, &ranked))
}

fn product_ranking(frame: &SalesFrame, out: &mut Outputs<'_>) -> crate::Result<()> {
    let ranked = rank_descending(sum_by(frame, PRODUCT_NAME)?);

    out.chart("top_products.png", |path| {
        viz::horizontal_bar_chart(
            path,
            "Top 15 Products by Sales",
            "Sales",
            top(&ranked, TOP_PRODUCTS),
        )
    })?;
    out.table("sales_by_product.csv", ranking_table(PRODUCT_NAME, &ranked))
}

fn weekday_pattern(frame: &SalesFrame, out: &mut Outputs<'_>) -> crate::Result<()> {
    let profile = weekday_profile(frame)?;
    let labels: Vec<String> = profile.iter().map(|(day, _)| day.to_string()).collect();
    let values: Vec<Option<f64>> = profile.iter().map(|(_, total)| *total).collect();

    out.chart("sales_by_weekday.png", |path| {
        let axes = Axes { x: "Weekday", y: "Sales" };
        viz::line_chart(path, "Sales by Weekday", axes, &labels, &values)
    })?;

    let table = Table::new()
        .text(WEEKDAY, labels.iter().cloned().map(Some).collect())
        .number(FINAL_AMOUNT, values);
    out.table("sales_by_weekday.csv", table)
}

fn discount_scatter(
    frame: &SalesFrame,
    options: &ReportOptions,
    out: &mut Outputs<'_>,
) -> crate::Result<()> {
    let points = discount_points(frame, options.sample_size, options.seed)?;

    out.chart("discount_vs_final_scatter.png", |path| {
        let axes = Axes {
            x: "Discount Amount",
            y: "Final Amount",
        };
        viz::scatter_plot(path, "Discount Amount vs Final Amount (Sample)", axes, &points)
    })
}

fn store_month_heatmap(frame: &SalesFrame, out: &mut Outputs<'_>) -> crate::Result<()> {
    let pivot = store_month_pivot(frame)?.top(HEATMAP_STORES);

    out.chart("store_month_heatmap.png", |path| {
        viz::heatmap(path, "Heatmap: Top 12 Stores vs Month (Sales)", &pivot)
    })?;

    let mut table = Table::new().text(STORE_NAME, pivot.stores.iter().cloned().map(Some).collect());
    for (m, month) in pivot.months.iter().enumerate() {
        table = table.number(month, pivot.cells.iter().map(|row| Some(row[m])).collect());
    }
    out.table("store_month_pivot_top12.csv", table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clean;
    use polars::prelude::*;
    use tempfile::tempdir;

    fn frame() -> SalesFrame {
        let df = df!(
            "transaction_date" => ["2024-01-01", "2024-01-02", "2024-02-05", "2024-02-06"],
            "store_name" => ["B", "A", "B", "A"],
            "product_name" => ["Milk", "Bread", "Milk", "Eggs"],
            "discount_amount" => ["1", "0", "2", "0"],
            "final_amount" => ["10", "30", "20", "5"]
        )
        .unwrap();
        let numeric = vec!["discount_amount".to_string(), "final_amount".to_string()];
        clean(df, &numeric).unwrap()
    }

    fn options() -> ReportOptions {
        ReportOptions {
            sample_size: 800,
            seed: 1,
            render_charts: false,
        }
    }

    #[test]
    fn test_every_report_declares_final_amount() {
        for report in Report::ALL {
            assert!(report.required_columns().contains(&FINAL_AMOUNT), "{report}");
        }
        assert!(Report::AisleShare.is_optional());
        assert!(!Report::StoreRanking.is_optional());
    }

    #[test]
    fn test_store_ranking_table() {
        let temp_dir = tempdir().unwrap();
        let layout = OutputLayout::new(temp_dir.path());
        layout.prepare().unwrap();

        let written = Report::StoreRanking.run(&frame(), &layout, &options()).unwrap();
        assert_eq!(written, vec![layout.table("sales_by_store.csv")]);

        let csv = std::fs::read_to_string(layout.table("sales_by_store.csv")).unwrap();
        assert_eq!(csv, "store_name,final_amount\nA,35.0\nB,30.0\n");
    }

    #[test]
    fn test_monthly_table_uses_month_start() {
        let temp_dir = tempdir().unwrap();
        let layout = OutputLayout::new(temp_dir.path());
        layout.prepare().unwrap();

        Report::MonthlySales.run(&frame(), &layout, &options()).unwrap();

        let csv = std::fs::read_to_string(layout.table("monthly_sales.csv")).unwrap();
        assert_eq!(csv, "year_month,final_amount\n2024-01-01,40.0\n2024-02-01,25.0\n");
    }

    #[test]
    fn test_heatmap_table_columns_are_months() {
        let temp_dir = tempdir().unwrap();
        let layout = OutputLayout::new(temp_dir.path());
        layout.prepare().unwrap();

        Report::StoreMonthHeatmap.run(&frame(), &layout, &options()).unwrap();

        let csv = std::fs::read_to_string(layout.table("store_month_pivot_top12.csv")).unwrap();
        assert_eq!(csv, "store_name,2024-01,2024-02\nA,30.0,5.0\nB,10.0,20.0\n");
    }

    #[test]
    fn test_chart_rows_are_capped_but_tables_are_not() {
        let ranked: Vec<KeyedTotal> = (0..16)
            .map(|i| (format!("P{i:02}"), 100.0 - i as f64))
            .collect();

        let charted = top(&ranked, TOP_PRODUCTS);
        assert_eq!(charted.len(), 15);
        assert_eq!(charted, &ranked[..15]);
        assert_eq!(top(&ranked[..3], TOP_STORES).len(), 3);

        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("ranking.csv");
        write_table(ranking_table(PRODUCT_NAME, &ranked), &path).unwrap();
        let csv = std::fs::read_to_string(&path).unwrap();
        assert_eq!(csv.lines().count(), 17);
        assert_eq!(csv.lines().last(), Some("P15,85.0"));
    }

    #[test]
    fn test_scatter_without_charts_writes_nothing() {
        let temp_dir = tempdir().unwrap();
        let layout = OutputLayout::new(temp_dir.path());
        layout.prepare().unwrap();

        let written = Report::DiscountScatter.run(&frame(), &layout, &options()).unwrap();
        assert!(written.is_empty());
    }
}
