//! Historical market dataset
//!
//! Loads the daily CSV export and derives `year` and `profit` eagerly so every
//! consumer sees the same derived columns.

use crate::error::AgentError;
use crate::models::Record;
use crate::Result;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DATE_COLUMN: &str = "dt";
pub const INDEX_COLUMN: &str = "sp500";
pub const PRIOR_COLUMN: &str = "prev_day";

/// Auxiliary indicators every row must carry.
pub const INDICATOR_COLUMNS: [&str; 10] = [
    "vix",
    "sp500_volume",
    "djia",
    "djia_volume",
    "hsi",
    "ads",
    "us3m",
    "joblessness",
    "epu",
    "GPRD",
];

/// Ordered feature set used to predict the primary index.
pub const FEATURE_COLUMNS: [&str; 11] = [
    "vix",
    "sp500_volume",
    "djia",
    "djia_volume",
    "hsi",
    "ads",
    "us3m",
    "joblessness",
    "epu",
    "GPRD",
    PRIOR_COLUMN,
];

const MISSING_MARKERS: [&str; 5] = ["", "na", "nan", "null", "n/a"];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Immutable daily time series.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Load a dataset from a CSV file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            AgentError::DataLoad(format!("cannot open {}: {}", path.display(), e))
        })?;

        let dataset = Self::from_reader(file)?;
        if dataset.is_empty() {
            warn!(path = %path.display(), "Dataset has no rows");
        }

        info!(
            path = %path.display(),
            rows = dataset.len(),
            years = dataset.years().len(),
            "Dataset loaded"
        );

        Ok(dataset)
    }

    /// Parse CSV rows with a header line.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| AgentError::DataLoad(format!("unreadable header: {}", e)))?
            .clone();

        let column = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| AgentError::DataLoad(format!("missing required column '{}'", name)))
        };

        let date_idx = column(DATE_COLUMN)?;
        let index_idx = column(INDEX_COLUMN)?;
        let prior_idx = column(PRIOR_COLUMN)?;
        let indicator_idx = INDICATOR_COLUMNS
            .iter()
            .map(|name| column(name).map(|idx| (*name, idx)))
            .collect::<Result<Vec<_>>>()?;

        let mut records = Vec::new();
        let mut unparsable = 0usize;

        for (row_number, row) in csv_reader.records().enumerate() {
            let row = row.map_err(|e| {
                AgentError::DataLoad(format!("row {}: {}", row_number + 1, e))
            })?;

            let field = |idx: usize| row.get(idx).unwrap_or_default();

            let date = parse_date(field(date_idx)).ok_or_else(|| {
                AgentError::DataLoad(format!(
                    "row {}: unparsable date '{}'",
                    row_number + 1,
                    field(date_idx)
                ))
            })?;

            let mut number = |idx: usize, name: &str| -> f64 {
                parse_cell(field(idx)).unwrap_or_else(|| {
                    if unparsable == 0 {
                        warn!(
                            row = row_number + 1,
                            column = name,
                            value = field(idx),
                            "Unparsable numeric cell read as missing"
                        );
                    }
                    unparsable += 1;
                    f64::NAN
                })
            };

            let index_value = number(index_idx, INDEX_COLUMN);
            let prior_index_value = number(prior_idx, PRIOR_COLUMN);

            let mut indicators = BTreeMap::new();
            for (name, idx) in &indicator_idx {
                indicators.insert(name.to_string(), number(*idx, *name));
            }

            records.push(Record::new(date, index_value, prior_index_value, indicators));
        }

        if unparsable > 0 {
            warn!(cells = unparsable, "Dataset has unparsable numeric cells");
        }
        debug!(rows = records.len(), "Parsed dataset rows");

        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.records.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    pub fn contains_year(&self, year: i32) -> bool {
        self.records.iter().any(|r| r.year == year)
    }

    pub fn records_in_year(&self, year: i32) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |r| r.year == year)
    }

    /// Records grouped by year, ascending.
    pub fn by_year(&self) -> BTreeMap<i32, Vec<&Record>> {
        let mut groups: BTreeMap<i32, Vec<&Record>> = BTreeMap::new();
        for record in &self.records {
            groups.entry(record.year).or_default().push(record);
        }
        groups
    }

    /// Feature matrix (one row per record) in `FEATURE_COLUMNS` order plus
    /// the primary index as target. Rows with a missing feature or target
    /// are left out.
    pub fn training_matrix(&self) -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut features = Vec::with_capacity(self.records.len());
        let mut target = Vec::with_capacity(self.records.len());

        for record in &self.records {
            let row: Vec<f64> = FEATURE_COLUMNS
                .iter()
                .map(|name| {
                    if *name == PRIOR_COLUMN {
                        record.prior_index_value
                    } else {
                        record.indicator(name).unwrap_or(f64::NAN)
                    }
                })
                .collect();

            if !record.index_value.is_finite() || row.iter().any(|v| !v.is_finite()) {
                continue;
            }

            features.push(row);
            target.push(record.index_value);
        }

        let skipped = self.records.len() - target.len();
        if skipped > 0 {
            debug!(skipped, "Rows with missing values left out of training");
        }

        (features, target)
    }
}

/// Numeric cell; empty cells and the usual missing-value markers read as NaN.
/// `None` when the text is not a number at all.
fn parse_cell(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if MISSING_MARKERS.iter().any(|m| raw.eq_ignore_ascii_case(m)) {
        return Some(f64::NAN);
    }
    raw.parse::<f64>().ok()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const HEADER: &str =
        "dt,sp500,prev_day,vix,sp500_volume,djia,djia_volume,hsi,ads,us3m,joblessness,epu,GPRD";

    pub(crate) fn csv_row(date: &str, sp500: f64, prev: f64, djia: f64, hsi: f64) -> String {
        format!(
            "{},{},{},15.0,3000000,{},250000,{},0.1,1.5,4.0,120.0,95.0",
            date, sp500, prev, djia, hsi
        )
    }

    /// Build a small in-memory dataset through the CSV path.
    pub(crate) fn dataset_from_rows(rows: &[String]) -> Dataset {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        Dataset::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_load_derives_columns() {
        let ds = dataset_from_rows(&[
            csv_row("2019-01-02", 2510.0, 2506.0, 23346.0, 25130.0),
            csv_row("2020-01-02", 3257.0, 3230.0, 28868.0, 28543.0),
        ]);

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.years(), vec![2019, 2020]);
        assert_eq!(ds.records()[0].year, 2019);
        assert!((ds.records()[1].profit - 27.0).abs() < 1e-9);
        assert_eq!(ds.records()[0].indicator("djia"), Some(23346.0));
    }

    #[test]
    fn test_missing_column_is_data_load_error() {
        let text = "dt,sp500,prev_day\n2020-01-02,3257.0,3230.0\n";
        let err = Dataset::from_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(err, AgentError::DataLoad(_)));
        assert!(err.to_string().contains("vix"));
    }

    #[test]
    fn test_unparsable_date_is_data_load_error() {
        let ds = Dataset::from_reader(
            format!("{}\n{}", HEADER, csv_row("yesterday", 1.0, 1.0, 1.0, 1.0)).as_bytes(),
        );
        assert!(matches!(ds, Err(AgentError::DataLoad(_))));
    }

    #[test]
    fn test_missing_file_is_data_load_error() {
        let err = Dataset::load("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, AgentError::DataLoad(_)));
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(parse_date("2021-06-30"), NaiveDate::from_ymd_opt(2021, 6, 30));
        assert_eq!(parse_date("06/30/2021"), NaiveDate::from_ymd_opt(2021, 6, 30));
        assert_eq!(
            parse_date("2021-06-30 00:00:00"),
            NaiveDate::from_ymd_opt(2021, 6, 30)
        );
        assert_eq!(parse_date("30.06.2021"), None);
    }

    #[test]
    fn test_training_matrix_orders_features() {
        let ds = dataset_from_rows(&[csv_row("2020-01-02", 3257.0, 3230.0, 28868.0, 28543.0)]);
        let (x, y) = ds.training_matrix();

        assert_eq!(x[0].len(), FEATURE_COLUMNS.len());
        assert_eq!(x[0][2], 28868.0);
        assert_eq!(x[0][10], 3230.0);
        assert_eq!(y, vec![3257.0]);
    }

    #[test]
    fn test_blank_and_na_cells_load_as_missing() {
        let ds = dataset_from_rows(&[
            "2020-01-02,3257.0,3230.0,,3000000,28868,250000,28543,0.1,1.5,4.0,120.0,95.0"
                .to_string(),
            "2020-01-03,NA,3257.0,14.0,3000000,28634,250000,28452,0.1,1.5,4.0,120.0,95.0"
                .to_string(),
            csv_row("2020-01-06", 3246.0, 3234.0, 28703.0, 28226.0),
        ]);

        assert_eq!(ds.len(), 3);
        assert!(ds.records()[0].indicator("vix").unwrap().is_nan());
        assert!(ds.records()[1].index_value.is_nan());
        assert!(ds.records()[1].profit.is_nan());

        let (x, y) = ds.training_matrix();
        assert_eq!(x.len(), 1);
        assert_eq!(y, vec![3246.0]);
    }

    #[test]
    fn test_non_numeric_cell_is_missing_not_fatal() {
        let ds = dataset_from_rows(&[
            "2020-01-02,3257.0,3230.0,n/a,3000000,28868,250000,abc,0.1,1.5,4.0,120.0,95.0"
                .to_string(),
        ]);

        assert_eq!(ds.records()[0].index_value, 3257.0);
        assert!(ds.records()[0].indicator("hsi").unwrap().is_nan());
        assert!(ds.training_matrix().1.is_empty());
    }
}
