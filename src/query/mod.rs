//! Query handler
//!
//! Deterministic analytics over the dataset, one routine per intent.
//! Every branch returns a formatted answer; missing data degrades to an
//! informative message instead of an error.

pub mod stats;

use crate::dataset::Dataset;
use crate::models::{Intent, Record};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

/// Yearly mean of the primary index a year must exceed for `years_above_avg`.
pub const ABOVE_AVERAGE_THRESHOLD: f64 = 4000.0;

pub const COMPARE_PROMPT: &str =
    "📉 To compare averages, please ask about two years like 'Compare 2015 and 2020'.";

pub const NOT_UNDERSTOOD: &str = "🤔 I couldn't confidently understand your question. \
Try asking about average, gain, drop, or volatility.";

const NO_DATA: &str = "📉 No market data is available.";

lazy_static! {
    static ref YEAR_PATTERN: Regex = Regex::new(r"(20\d{2}|19\d{2})").unwrap();
}

/// Calendar years mentioned in `text`, left to right, duplicates kept.
pub fn extract_years(text: &str) -> Vec<i32> {
    YEAR_PATTERN
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Produce the answer for an already-classified question.
pub fn answer(intent: Intent, text: &str, dataset: &Dataset) -> String {
    let years = extract_years(text);
    let first_year = years.first().copied();

    match intent {
        Intent::MostProfit => most_profit(first_year, dataset),
        Intent::BestYearGain => best_year_gain(dataset),
        Intent::WorstDay => worst_day(first_year, dataset),
        Intent::AverageSp500 => average_index(first_year, dataset),
        Intent::CompareAverages | Intent::CompareYearsAvg => compare_averages(&years, dataset),
        Intent::YearsAboveAvg => years_above_average(dataset, ABOVE_AVERAGE_THRESHOLD),
        Intent::MostVolatileYear => most_volatile_year(dataset),
        Intent::RecommendStock => recommend_index(first_year, dataset),
        Intent::Unknown => NOT_UNDERSTOOD.to_string(),
    }
}

// =============================
// Extremes
// =============================

/// First record holding the extreme profit, so ties resolve to the earliest row.
fn extreme_profit<'a, I>(records: I, prefer: fn(f64, f64) -> bool) -> Option<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter(|r| r.profit.is_finite())
        .fold(None::<&Record>, |best, r| match best {
            Some(b) if !prefer(r.profit, b.profit) => Some(b),
            _ => Some(r),
        })
}

fn greater(a: f64, b: f64) -> bool {
    a > b
}

fn less(a: f64, b: f64) -> bool {
    a < b
}

/// Restrict to `year` only when the dataset actually holds it.
fn year_in_dataset(year: Option<i32>, dataset: &Dataset) -> Option<i32> {
    year.filter(|y| dataset.contains_year(*y))
}

fn most_profit(year: Option<i32>, dataset: &Dataset) -> String {
    if let Some(year) = year_in_dataset(year, dataset) {
        if let Some(row) = extreme_profit(dataset.records_in_year(year), greater) {
            return format!(
                "📈 On {}, S&P 500 had the biggest gain of {:.2} in {}.",
                row.date, row.profit, year
            );
        }
    }

    match extreme_profit(dataset.records(), greater) {
        Some(row) => format!("📈 Strongest daily gain: {:.2} on {}.", row.profit, row.date),
        None => NO_DATA.to_string(),
    }
}

fn worst_day(year: Option<i32>, dataset: &Dataset) -> String {
    if let Some(year) = year_in_dataset(year, dataset) {
        if let Some(row) = extreme_profit(dataset.records_in_year(year), less) {
            return format!("📉 Worst drop in {}: {:.2} on {}.", year, row.profit, row.date);
        }
    }

    match extreme_profit(dataset.records(), less) {
        Some(row) => format!("📉 Worst drop ever: {:.2} on {}.", row.profit, row.date),
        None => NO_DATA.to_string(),
    }
}

fn best_year_gain(dataset: &Dataset) -> String {
    let best = dataset
        .by_year()
        .into_iter()
        .filter_map(|(year, rows)| extreme_profit(rows, greater).map(|r| (year, r.profit)))
        .fold(None, |best: Option<(i32, f64)>, (year, gain)| match best {
            Some((_, top)) if gain <= top => best,
            _ => Some((year, gain)),
        });

    match best {
        Some((year, gain)) => format!(
            "📈 Best year for single-day gain: {} with {:.2} gain.",
            year, gain
        ),
        None => NO_DATA.to_string(),
    }
}

// =============================
// Averages
// =============================

fn year_average(year: i32, dataset: &Dataset) -> Option<f64> {
    stats::mean(dataset.records_in_year(year).map(|r| r.index_value))
}

fn yearly_averages(dataset: &Dataset) -> BTreeMap<i32, f64> {
    dataset
        .by_year()
        .into_iter()
        .filter_map(|(year, rows)| {
            stats::mean(rows.iter().map(|r| r.index_value)).map(|avg| (year, avg))
        })
        .collect()
}

fn average_index(year: Option<i32>, dataset: &Dataset) -> String {
    match year {
        Some(year) => match year_average(year, dataset) {
            Some(avg) => format!("📊 Average S&P 500 in {} was {:.2}.", year, avg),
            None => format!("📉 No data for year {}.", year),
        },
        None => {
            let years = dataset.years();
            let avg = stats::mean(dataset.records().iter().map(|r| r.index_value));
            match (years.first(), years.last(), avg) {
                (Some(first), Some(last), Some(avg)) => format!(
                    "📊 Average S&P 500 across {}-{} was {:.2}.",
                    first, last, avg
                ),
                _ => NO_DATA.to_string(),
            }
        }
    }
}

fn compare_averages(years: &[i32], dataset: &Dataset) -> String {
    let (y1, y2) = match years {
        [y1, y2, ..] => (*y1, *y2),
        _ => return COMPARE_PROMPT.to_string(),
    };

    match (year_average(y1, dataset), year_average(y2, dataset)) {
        (Some(avg1), Some(avg2)) => format!(
            "📊 Avg S&P 500:\n  {}: {:.2}\n  {}: {:.2}\n  Difference: {:.2}.",
            y1,
            avg1,
            y2,
            avg2,
            (avg1 - avg2).abs()
        ),
        (None, _) => format!("📉 No data for year {}.", y1),
        (_, None) => format!("📉 No data for year {}.", y2),
    }
}

fn years_above_average(dataset: &Dataset, threshold: f64) -> String {
    let qualifying: Vec<String> = years_above(dataset, threshold)
        .iter()
        .map(i32::to_string)
        .collect();

    let listed = if qualifying.is_empty() {
        "none".to_string()
    } else {
        qualifying.join(", ")
    };

    format!("📆 Years where average S&P 500 > {}: {}", threshold, listed)
}

/// Years whose mean index strictly exceeds `threshold`, ascending.
pub fn years_above(dataset: &Dataset, threshold: f64) -> Vec<i32> {
    yearly_averages(dataset)
        .into_iter()
        .filter(|(_, avg)| *avg > threshold)
        .map(|(year, _)| year)
        .collect()
}

// =============================
// Volatility & Returns
// =============================

fn most_volatile_year(dataset: &Dataset) -> String {
    let top = dataset
        .by_year()
        .into_iter()
        .filter_map(|(year, rows)| {
            stats::sample_std(rows.iter().map(|r| r.profit)).map(|std| (year, std))
        })
        .fold(None, |best: Option<(i32, f64)>, (year, std)| match best {
            Some((_, top)) if std <= top => best,
            _ => Some((year, std)),
        });

    match top {
        Some((year, std)) => format!("📊 Most volatile year: {} (std dev: {:.2}).", year, std),
        None => "📉 Not enough data to measure volatility.".to_string(),
    }
}

/// Mean daily return per comparison index, in display order.
pub fn index_returns(records: &[&Record]) -> Vec<(&'static str, Option<f64>)> {
    let primary = stats::mean(
        records
            .iter()
            .filter_map(|r| stats::ratio(r.profit, r.prior_index_value)),
    );

    let indicator_return = |name: &str| {
        let series: Vec<f64> = records
            .iter()
            .map(|r| r.indicator(name).unwrap_or(f64::NAN))
            .collect();
        stats::mean(stats::pct_change(&series))
    };

    vec![
        ("S&P 500", primary),
        ("DJIA", indicator_return("djia")),
        ("HSI", indicator_return("hsi")),
    ]
}

fn recommend_index(year: Option<i32>, dataset: &Dataset) -> String {
    if let Some(y) = year {
        if !dataset.contains_year(y) {
            return format!("📉 No data for year {}.", y);
        }
    }

    let records: Vec<&Record> = match year {
        Some(y) => dataset.records_in_year(y).collect(),
        None => dataset.records().iter().collect(),
    };

    let returns = index_returns(&records);

    let best = returns
        .iter()
        .filter_map(|(name, ret)| ret.map(|r| (*name, r)))
        .fold(None::<(&str, f64)>, |best, (name, ret)| match best {
            Some((_, top)) if ret <= top => best,
            _ => Some((name, ret)),
        });

    let Some((best, _)) = best else {
        return "📉 Not enough data to compare index returns.".to_string();
    };

    let scope = year.map(|y| format!(" in {}", y)).unwrap_or_default();

    let mut out = format!(
        "📈 Based on daily returns{}, '{}' performed best.\nReturns:\n",
        scope, best
    );
    for (name, ret) in &returns {
        match ret {
            Some(r) => out.push_str(&format!("  {}: {:.4}\n", name, r)),
            None => out.push_str(&format!("  {}: n/a\n", name)),
        }
    }
    out.push_str(&format!("✅ Suggested Index: {}", best));

    out
}
