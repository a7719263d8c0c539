//! Scalar summary metrics over the cleaned table

use tracing::info;

use crate::config::OutputLayout;
use crate::data::{SalesFrame, FINAL_AMOUNT, QUANTITY};
use crate::export::{write_table, Table};

pub const SUMMARY_FILE: &str = "summary_metrics.csv";

/// The five headline metrics; `None` means "no value"
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_sales: Option<f64>,
    pub total_transactions: usize,
    pub total_quantity: Option<f64>,
    pub avg_transaction_value: Option<f64>,
    pub median_transaction_value: Option<f64>,
}

impl Summary {
    pub fn compute(frame: &SalesFrame) -> crate::Result<Self> {
        let amounts = optional_column(frame, FINAL_AMOUNT)?;
        let quantities = optional_column(frame, QUANTITY)?;

        let present: Vec<f64> = amounts.iter().flatten().flatten().copied().collect();

        Ok(Self {
            total_sales: amounts.as_deref().map(null_aware_sum),
            total_transactions: frame.height(),
            total_quantity: quantities.as_deref().map(null_aware_sum),
            avg_transaction_value: mean(&present),
            median_transaction_value: median(&present),
        })
    }

    /// Metric name/value pairs in output order
    pub fn rows(&self) -> [(&'static str, Option<f64>); 5] {
        [
            ("total_sales", self.total_sales),
            ("total_transactions", Some(self.total_transactions as f64)),
            ("total_quantity", self.total_quantity),
            ("avg_transaction_value", self.avg_transaction_value),
            ("median_transaction_value", self.median_transaction_value),
        ]
    }
}

/// Compute the summary and write it as `summary_metrics.csv`
pub fn save_summary(frame: &SalesFrame, layout: &OutputLayout) -> crate::Result<Summary> {
    let summary = Summary::compute(frame)?;

    let rows = summary.rows();
    let table = Table::new()
        .text("metric", rows.iter().map(|(name, _)| Some(name.to_string())).collect())
        .number("value", rows.iter().map(|(_, value)| *value).collect());

    let path = layout.table(SUMMARY_FILE);
    write_table(table, &path)?;
    info!(path = %path.display(), "wrote summary metrics");

    Ok(summary)
}

fn optional_column(frame: &SalesFrame, name: &str) -> crate::Result<Option<Vec<Option<f64>>>> {
    if frame.has_column(name) {
        Ok(Some(frame.numbers(name)?))
    } else {
        Ok(None)
    }
}

/// Sum of the present values; `0.0` when there are none
fn null_aware_sum(values: &[Option<f64>]) -> f64 {
    values.iter().flatten().fold(0.0, |acc, v| acc + v)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Midpoint statistic; averages the two middle values for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clean;
    use polars::prelude::*;
    use tempfile::tempdir;

    fn frame_with_amounts(amounts: &[Option<&str>]) -> SalesFrame {
        let df = df!(
            "store_name" => vec!["A"; amounts.len()],
            "final_amount" => amounts.to_vec()
        )
        .unwrap();
        clean(df, &["final_amount".to_string()]).unwrap()
    }

    #[test]
    fn test_summary_ignores_missing_values() {
        let frame = frame_with_amounts(&[Some("10"), Some("20"), Some("oops")]);
        let summary = Summary::compute(&frame).unwrap();

        assert_eq!(summary.total_sales, Some(30.0));
        assert_eq!(summary.total_transactions, 3);
        assert_eq!(summary.avg_transaction_value, Some(15.0));
        assert_eq!(summary.median_transaction_value, Some(15.0));
        // No quantity column at all
        assert_eq!(summary.total_quantity, None);
    }

    #[test]
    fn test_summary_all_missing_has_no_mean() {
        let frame = frame_with_amounts(&[None, Some("x")]);
        let summary = Summary::compute(&frame).unwrap();

        assert_eq!(summary.total_sales, Some(0.0));
        assert_eq!(summary.total_transactions, 2);
        assert_eq!(summary.avg_transaction_value, None);
        assert_eq!(summary.median_transaction_value, None);
    }

    #[test]
    fn test_all_missing_column_sums_to_positive_zero() {
        let frame = frame_with_amounts(&[Some(""), Some("zz")]);
        let temp_dir = tempdir().unwrap();
        let layout = OutputLayout::new(temp_dir.path());
        layout.prepare().unwrap();

        let summary = save_summary(&frame, &layout).unwrap();
        let total = summary.total_sales.unwrap();
        assert_eq!(total, 0.0);
        assert!(total.is_sign_positive());

        let written = std::fs::read_to_string(layout.table(SUMMARY_FILE)).unwrap();
        assert!(written.lines().any(|line| line == "total_sales,0.0"), "{written}");
    }

    #[test]
    fn test_header_only_table_sums_to_zero() {
        let df = df!(
            "quantity" => Vec::<&str>::new(),
            "final_amount" => Vec::<&str>::new()
        )
        .unwrap();
        let numeric = vec!["quantity".to_string(), "final_amount".to_string()];
        let summary = Summary::compute(&clean(df, &numeric).unwrap()).unwrap();

        assert_eq!(summary.total_transactions, 0);
        assert!(summary.total_sales.unwrap().is_sign_positive());
        assert!(summary.total_quantity.unwrap().is_sign_positive());
        assert_eq!(summary.avg_transaction_value, None);
    }

    #[test]
    fn test_median() {
        assert_eq!(super::median(&[]), None);
        assert_eq!(super::median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(super::median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_save_summary_writes_metric_rows() {
        let frame = frame_with_amounts(&[Some("10"), Some("20"), None]);
        let temp_dir = tempdir().unwrap();
        let layout = OutputLayout::new(temp_dir.path());
        layout.prepare().unwrap();

        save_summary(&frame, &layout).unwrap();

        let written = std::fs::read_to_string(layout.table(SUMMARY_FILE)).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "metric,value");
        assert_eq!(lines[1], "total_sales,30.0");
        assert_eq!(lines[2], "total_transactions,3.0");
        assert_eq!(lines[3], "total_quantity,");
        assert_eq!(lines[4], "avg_transaction_value,15.0");
        assert_eq!(lines[5], "median_transaction_value,15.0");
    }
}
