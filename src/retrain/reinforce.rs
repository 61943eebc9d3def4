//! Interest-year reinforcement of the training data.

use crate::dataset::Dataset;
use crate::models::{InteractionRecord, Record};
use crate::query::extract_years;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};

/// Times each interest-year row appears before de-duplication.
const REINFORCEMENT_COPIES: usize = 3;

/// Training copy of the dataset biased toward the years users asked about.
#[derive(Debug, Clone)]
pub struct ReinforcedDataset {
    pub dataset: Dataset,
    pub interest_years: Vec<i32>,
    /// Row count after appending the extra copies, before de-duplication.
    pub candidate_rows: usize,
}

/// Years mentioned in questions whose intent is reinforcement-eligible.
pub fn interest_years(records: &[InteractionRecord]) -> BTreeSet<i32> {
    records
        .iter()
        .filter(|r| r.intent.is_reinforcement_eligible())
        .flat_map(|r| extract_years(&r.user_input))
        .collect()
}

/// Append two extra copies of every interest-year row, then drop exact
/// duplicate rows keeping the first occurrence.
///
/// Because the copies are identical to their originals, de-duplication
/// removes them again; only rows that were already unique survive.
pub fn reinforce(dataset: &Dataset, years: &BTreeSet<i32>) -> ReinforcedDataset {
    if years.is_empty() {
        return ReinforcedDataset {
            dataset: dataset.clone(),
            interest_years: Vec::new(),
            candidate_rows: dataset.len(),
        };
    }

    let extra: Vec<&Record> = dataset
        .records()
        .iter()
        .filter(|r| years.contains(&r.year))
        .collect();

    let candidates: Vec<&Record> = dataset
        .records()
        .iter()
        .chain((1..REINFORCEMENT_COPIES).flat_map(|_| extra.iter().copied()))
        .collect();

    let candidate_rows = candidates.len();

    let mut seen = HashSet::with_capacity(candidate_rows);
    let records: Vec<Record> = candidates
        .into_iter()
        .filter(|r| seen.insert(RowKey::of(r)))
        .cloned()
        .collect();

    ReinforcedDataset {
        dataset: Dataset::from_records(records),
        interest_years: years.iter().copied().collect(),
        candidate_rows,
    }
}

/// Column-for-column identity of a row. Floats compare by value, with all
/// zeros equal and all NaNs equal.
#[derive(Debug, PartialEq, Eq, Hash)]
struct RowKey {
    date: NaiveDate,
    values: Vec<u64>,
    names: Vec<String>,
}

impl RowKey {
    fn of(record: &Record) -> Self {
        let mut values = vec![bits(record.index_value), bits(record.prior_index_value)];
        values.extend(record.indicators.values().map(|v| bits(*v)));

        Self {
            date: record.date,
            values,
            names: record.indicators.keys().cloned().collect(),
        }
    }
}

fn bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}
