//! Aggregate views over the cleaned table
//!
//! Grouping runs through Polars lazy frames; the grouped results are pulled
//! into plain vectors so ordering rules (chronological months, stable
//! descending rankings, canonical weekdays) are applied explicitly.

use chrono::NaiveDate;
use polars::prelude::{col, IntoLazy};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeSet, HashMap};

use crate::data::{
    month_start, text_column, SalesFrame, DISCOUNT_AMOUNT, FINAL_AMOUNT, STORE_NAME, WEEKDAY,
    WEEKDAYS, YEAR_MONTH,
};

/// A group key with its summed final amount
pub type KeyedTotal = (String, f64);

/// One calendar month of sales
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTotal {
    pub month: NaiveDate,
    pub label: String,
    pub total: f64,
}

/// Store × month matrix of summed final amounts
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub stores: Vec<String>,
    pub months: Vec<String>,
    /// `cells[store][month]`, zero where a store had no sales that month
    pub cells: Vec<Vec<f64>>,
}

impl Pivot {
    pub fn row_total(&self, store: usize) -> f64 {
        self.cells[store].iter().sum()
    }

    /// Keep the `n` stores with the largest row totals.
    ///
    /// Ties keep the alphabetical store order of the full pivot.
    pub fn top(&self, n: usize) -> Pivot {
        let mut order: Vec<usize> = (0..self.stores.len()).collect();
        order.sort_by(|&a, &b| self.row_total(b).total_cmp(&self.row_total(a)));
        order.truncate(n);

        Pivot {
            stores: order.iter().map(|&i| self.stores[i].clone()).collect(),
            months: self.months.clone(),
            cells: order.iter().map(|&i| self.cells[i].clone()).collect(),
        }
    }

    pub fn max_cell(&self) -> f64 {
        self.cells
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }
}

/// Sum `final_amount` per key
///
/// # Arguments
/// * `frame` - Cleaned transaction table
/// * `key` - Grouping column; rows with a null key are dropped
///
/// # Returns
/// * `(key, total)` pairs in ascending key order; all-null groups total `0.0`
pub fn sum_by(frame: &SalesFrame, key: &str) -> crate::Result<Vec<KeyedTotal>> {
    let grouped = frame
        .frame()
        .clone()
        .lazy()
        .filter(col(key).is_not_null())
        .group_by([col(key)])
        .agg([col(FINAL_AMOUNT).sum()])
        .collect()?;

    let keys = text_column(&grouped, key)?;
    let totals = grouped.column(FINAL_AMOUNT)?.f64()?;

    let mut rows: Vec<KeyedTotal> = keys
        .into_iter()
        .zip(totals.into_iter())
        .filter_map(|(k, v)| k.map(|k| (k, v.unwrap_or(0.0))))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(rows)
}

/// Sort descending by total; equal totals keep ascending key order
pub fn rank_descending(mut totals: Vec<KeyedTotal>) -> Vec<KeyedTotal> {
    totals.sort_by(|a, b| a.0.cmp(&b.0));
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));
    totals
}

/// Sales per `year_month`, ordered by the month's first day
pub fn monthly_totals(frame: &SalesFrame) -> crate::Result<Vec<MonthlyTotal>> {
    let mut months: Vec<MonthlyTotal> = sum_by(frame, YEAR_MONTH)?
        .into_iter()
        .filter_map(|(label, total)| {
            month_start(&label).map(|month| MonthlyTotal {
                month,
                label,
                total,
            })
        })
        .collect();
    months.sort_by_key(|m| m.month);

    Ok(months)
}

/// Sales per weekday in Monday→Sunday order; absent days are `None`
pub fn weekday_profile(frame: &SalesFrame) -> crate::Result<Vec<(&'static str, Option<f64>)>> {
    let totals: HashMap<String, f64> = sum_by(frame, WEEKDAY)?.into_iter().collect();

    Ok(WEEKDAYS
        .iter()
        .map(|&day| (day, totals.get(day).copied()))
        .collect())
}

/// Pivot stores against months
///
/// # Arguments
/// * `frame` - Cleaned table with `store_name`, `year_month` and `final_amount`
///
/// # Returns
/// * `Pivot` with stores ascending, months chronological and absent
///   combinations filled with zero
pub fn store_month_pivot(frame: &SalesFrame) -> crate::Result<Pivot> {
    let grouped = frame
        .frame()
        .clone()
        .lazy()
        .filter(col(STORE_NAME).is_not_null().and(col(YEAR_MONTH).is_not_null()))
        .group_by([col(STORE_NAME), col(YEAR_MONTH)])
        .agg([col(FINAL_AMOUNT).sum()])
        .collect()?;

    let stores = text_column(&grouped, STORE_NAME)?;
    let months = text_column(&grouped, YEAR_MONTH)?;
    let totals = grouped.column(FINAL_AMOUNT)?.f64()?;

    let mut cells_by_key: HashMap<(String, String), f64> = HashMap::new();
    for ((store, month), total) in stores.into_iter().zip(months).zip(totals.into_iter()) {
        if let (Some(store), Some(month)) = (store, month) {
            cells_by_key.insert((store, month), total.unwrap_or(0.0));
        }
    }

    let stores: Vec<String> = cells_by_key
        .keys()
        .map(|(store, _)| store.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut months: Vec<String> = cells_by_key
        .keys()
        .map(|(_, month)| month.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    months.sort_by_key(|label| month_start(label));

    let cells = stores
        .iter()
        .map(|store| {
            months
                .iter()
                .map(|month| {
                    cells_by_key
                        .get(&(store.clone(), month.clone()))
                        .copied()
                        .unwrap_or(0.0)
                })
                .collect()
        })
        .collect();

    Ok(Pivot {
        stores,
        months,
        cells,
    })
}

/// Reproducible sample of at most `n` row indices, returned in row order
pub fn sample_indices(len: usize, n: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = rand::seq::index::sample(&mut rng, len, n.min(len)).into_vec();
    picked.sort_unstable();
    picked
}

/// Sampled (discount, final amount) pairs
///
/// # Arguments
/// * `frame` - Cleaned table with `discount_amount` and `final_amount`
/// * `sample_size` - Maximum number of rows drawn
/// * `seed` - Seed for the sampling RNG
///
/// # Returns
/// * Pairs in row order; sampled rows missing either value are dropped
pub fn discount_points(
    frame: &SalesFrame,
    sample_size: usize,
    seed: u64,
) -> crate::Result<Vec<(f64, f64)>> {
    let discounts = frame.numbers(DISCOUNT_AMOUNT)?;
    let finals = frame.numbers(FINAL_AMOUNT)?;

    Ok(sample_indices(frame.height(), sample_size, seed)
        .into_iter()
        .filter_map(|i| Some((discounts[i]?, finals[i]?)))
        .collect())
}

/// Mean of `value` per `key`, keys in order of first appearance
pub fn mean_by(
    frame: &SalesFrame,
    key: &str,
    value: &str,
) -> crate::Result<Vec<(String, Option<f64>)>> {
    let grouped = frame
        .frame()
        .clone()
        .lazy()
        .filter(col(key).is_not_null())
        .group_by_stable([col(key)])
        .agg([col(value).mean()])
        .collect()?;

    let keys = text_column(&grouped, key)?;
    let means = grouped.column(value)?.f64()?;

    Ok(keys
        .into_iter()
        .zip(means.into_iter())
        .filter_map(|(k, v)| k.map(|k| (k, v)))
        .collect())
}
