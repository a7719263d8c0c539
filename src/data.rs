//! Data loading and cleaning using Polars

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Weekday};
use polars::prelude::*;
use std::path::Path;

use crate::config::PipelineConfig;
use crate::error::PipelineError;

pub const TRANSACTION_DATE: &str = "transaction_date";
pub const DATE: &str = "date";
pub const YEAR_MONTH: &str = "year_month";
pub const WEEKDAY: &str = "weekday";
pub const STORE_NAME: &str = "store_name";
pub const PRODUCT_NAME: &str = "product_name";
pub const AISLE: &str = "aisle";
pub const QUANTITY: &str = "quantity";
pub const DISCOUNT_AMOUNT: &str = "discount_amount";
pub const FINAL_AMOUNT: &str = "final_amount";

/// Canonical weekday order used by the weekday report
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const DATETIME_FORMATS: [&str; 10] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// The cleaned transaction table shared read-only by every report
#[derive(Debug, Clone)]
pub struct SalesFrame {
    df: DataFrame,
}

impl SalesFrame {
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.get_column_index(name).is_some()
    }

    /// Fails with [`PipelineError::MissingColumn`] on the first absent column
    pub fn require(
        &self,
        report: &'static str,
        columns: &[&'static str],
    ) -> std::result::Result<(), PipelineError> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(&column) => Err(PipelineError::MissingColumn { report, column }),
            None => Ok(()),
        }
    }

    /// Values of a cleaned numeric column, `None` where missing
    pub fn numbers(&self, name: &str) -> crate::Result<Vec<Option<f64>>> {
        Ok(self.df.column(name)?.f64()?.into_iter().collect())
    }

}

/// Values of any column rendered as text, `None` where missing
pub(crate) fn text_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Load the configured CSV file and clean it
///
/// # Arguments
/// * `config` - Run configuration; `input` and `numeric_columns` are read
///
/// # Returns
/// * `SalesFrame` with calendar columns derived and numeric columns coerced
pub fn load_and_clean(config: &PipelineConfig) -> crate::Result<SalesFrame> {
    let df = read_csv(&config.input)?;
    clean(df, &config.numeric_columns)
}

/// Read a CSV file with every column as text
pub fn read_csv(path: &Path) -> crate::Result<DataFrame> {
    let file = std::fs::File::open(path).map_err(|e| PipelineError::data_access(path, e))?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file)
        .finish()?;

    Ok(df)
}

/// Parse the transaction date and coerce numeric columns
///
/// # Arguments
/// * `df` - Raw table, typically every column as text
/// * `numeric_columns` - Columns to coerce to `f64`
///
/// # Returns
/// * `SalesFrame` where unparsable cells are null and absent columns stay absent
pub fn clean(mut df: DataFrame, numeric_columns: &[String]) -> crate::Result<SalesFrame> {
    if df.get_column_index(TRANSACTION_DATE).is_some() {
        derive_calendar_columns(&mut df)?;
    }

    for name in numeric_columns {
        if df.get_column_index(name).is_some() {
            coerce_numeric(&mut df, name)?;
        }
    }

    Ok(SalesFrame { df })
}

fn derive_calendar_columns(df: &mut DataFrame) -> crate::Result<()> {
    let raw = df.column(TRANSACTION_DATE)?.cast(&DataType::String)?;
    let parsed: Vec<Option<NaiveDateTime>> = raw
        .str()?
        .into_iter()
        .map(|v| v.and_then(parse_timestamp))
        .collect();

    let dates: Vec<Option<NaiveDate>> = parsed.iter().map(|ts| ts.map(|ts| ts.date())).collect();
    let months: Vec<Option<String>> = parsed
        .iter()
        .map(|ts| ts.map(|ts| ts.format("%Y-%m").to_string()))
        .collect();
    let weekdays: Vec<Option<&str>> = parsed
        .iter()
        .map(|ts| ts.map(|ts| weekday_name(ts.weekday())))
        .collect();

    let timestamps = DatetimeChunked::from_naive_datetime_options(
        TRANSACTION_DATE.into(),
        parsed.iter().copied(),
        TimeUnit::Milliseconds,
    );
    df.with_column(timestamps.into_series())?;
    df.with_column(DateChunked::from_naive_date_options(DATE.into(), dates).into_series())?;
    df.with_column(Series::new(YEAR_MONTH.into(), months))?;
    df.with_column(Series::new(WEEKDAY.into(), weekdays))?;

    Ok(())
}

fn coerce_numeric(df: &mut DataFrame, name: &str) -> crate::Result<()> {
    let raw = df.column(name)?.cast(&DataType::String)?;
    let values: Vec<Option<f64>> = raw
        .str()?
        .into_iter()
        .map(|v| v.and_then(parse_number))
        .collect();

    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

/// Parse a number, treating blanks, junk and non-finite values as missing
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parse a transaction timestamp in any of the accepted layouts.
///
/// Offsets are dropped and the wall-clock time is kept.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// English weekday name, independent of locale
pub fn weekday_name(day: Weekday) -> &'static str {
    WEEKDAYS[day.num_days_from_monday() as usize]
}

/// First day of a `YYYY-MM` label (also accepts an unpadded month)
pub fn month_start(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", label.trim()), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "transaction_date,store_name,product_name,quantity,final_amount").unwrap();
        writeln!(file, "2024-01-01 09:15:00,North,Milk,2,5.50").unwrap();
        writeln!(file, "2024-01-06T18:00:00,North,Bread,abc,3.25").unwrap();
        writeln!(file, "not a date,South,Eggs,1,").unwrap();
        writeln!(file, "2024-02-29,South,Milk,4,n/a").unwrap();
        file
    }

    fn config_for(file: &NamedTempFile) -> PipelineConfig {
        PipelineConfig {
            input: file.path().to_path_buf(),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_load_and_clean() {
        let test_file = create_test_csv();
        let frame = load_and_clean(&config_for(&test_file)).unwrap();

        assert_eq!(frame.height(), 4);
        assert!(frame.has_column(YEAR_MONTH));
        assert!(frame.has_column(WEEKDAY));
        assert!(frame.has_column(DATE));
        assert!(!frame.has_column(AISLE));
    }

    #[test]
    fn test_numeric_coercion_never_fails() {
        let test_file = create_test_csv();
        let frame = load_and_clean(&config_for(&test_file)).unwrap();

        assert_eq!(
            frame.numbers(QUANTITY).unwrap(),
            vec![Some(2.0), None, Some(1.0), Some(4.0)]
        );
        assert_eq!(
            frame.numbers(FINAL_AMOUNT).unwrap(),
            vec![Some(5.5), Some(3.25), None, None]
        );
    }

    #[test]
    fn test_calendar_columns() {
        let test_file = create_test_csv();
        let frame = load_and_clean(&config_for(&test_file)).unwrap();

        let months = text_column(frame.frame(), YEAR_MONTH).unwrap();
        assert_eq!(
            months,
            vec![
                Some("2024-01".to_string()),
                Some("2024-01".to_string()),
                None,
                Some("2024-02".to_string()),
            ]
        );

        let weekdays = text_column(frame.frame(), WEEKDAY).unwrap();
        assert_eq!(weekdays[0].as_deref(), Some("Monday"));
        assert_eq!(weekdays[1].as_deref(), Some("Saturday"));
        assert_eq!(weekdays[2], None);
        assert_eq!(weekdays[3].as_deref(), Some("Thursday"));
    }

    #[test]
    fn test_missing_input_is_data_access_error() {
        let config = PipelineConfig {
            input: "definitely/not/here.csv".into(),
            ..PipelineConfig::default()
        };
        let err = load_and_clean(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::DataAccess { .. })
        ));
    }

    #[test]
    fn test_require_reports_first_missing_column() {
        let test_file = create_test_csv();
        let frame = load_and_clean(&config_for(&test_file)).unwrap();

        assert!(frame.require("stores", &[STORE_NAME, FINAL_AMOUNT]).is_ok());
        match frame.require("aisles", &[AISLE, FINAL_AMOUNT]) {
            Err(PipelineError::MissingColumn { column, .. }) => assert_eq!(column, AISLE),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-09 14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-09T14:30"), Some(expected));
        assert_eq!(parse_timestamp("03/09/2024 14:30"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-09T14:30:00+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-09"),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("2024-13-40"), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("twelve"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_month_start_orders_unpadded_labels() {
        let sept = month_start("2024-9").unwrap();
        let oct = month_start("2024-10").unwrap();
        assert!(sept < oct);
        assert_eq!(month_start("garbage"), None);
    }
}
