//! Core data models for the market reasoning agent

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

//
// ================= Intent =================
//

/// Closed set of question intents. Produced only by the classifier.
///
/// Deserializing a label outside the set yields `Unknown`, so a log written
/// by another version still reads back whole.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    #[serde(rename = "average_sp500")]
    AverageSp500,
    CompareAverages,
    CompareYearsAvg,
    MostProfit,
    WorstDay,
    RecommendStock,
    MostVolatileYear,
    YearsAboveAvg,
    BestYearGain,
    Unknown,
}

impl Intent {
    /// Candidate labels in the order they are offered to the ranker.
    pub const ALL: [Intent; 10] = [
        Intent::AverageSp500,
        Intent::CompareAverages,
        Intent::CompareYearsAvg,
        Intent::MostProfit,
        Intent::WorstDay,
        Intent::RecommendStock,
        Intent::MostVolatileYear,
        Intent::YearsAboveAvg,
        Intent::BestYearGain,
        Intent::Unknown,
    ];

    /// Intents whose referenced years feed back into retraining.
    pub const REINFORCEMENT_ELIGIBLE: [Intent; 5] = [
        Intent::RecommendStock,
        Intent::MostProfit,
        Intent::WorstDay,
        Intent::AverageSp500,
        Intent::CompareAverages,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Intent::AverageSp500 => "average_sp500",
            Intent::CompareAverages => "compare_averages",
            Intent::CompareYearsAvg => "compare_years_avg",
            Intent::MostProfit => "most_profit",
            Intent::WorstDay => "worst_day",
            Intent::RecommendStock => "recommend_stock",
            Intent::MostVolatileYear => "most_volatile_year",
            Intent::YearsAboveAvg => "years_above_avg",
            Intent::BestYearGain => "best_year_gain",
            Intent::Unknown => "unknown",
        }
    }

    /// Parse a ranker label. Anything outside the closed set is `None`.
    pub fn from_label(label: &str) -> Option<Intent> {
        let label = label.trim();
        Intent::ALL.iter().copied().find(|i| i.label() == label)
    }

    pub fn labels() -> Vec<&'static str> {
        Intent::ALL.iter().map(Intent::label).collect()
    }

    pub fn is_reinforcement_eligible(&self) -> bool {
        Intent::REINFORCEMENT_ELIGIBLE.contains(self)
    }
}

impl<'de> Deserialize<'de> for Intent {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(Intent::from_label(&label).unwrap_or(Intent::Unknown))
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

//
// ================= Dataset Row =================
//

/// One trading day of the time series.
///
/// `year` and `profit` are derived at construction and never diverge from
/// `date` / `index_value - prior_index_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub date: NaiveDate,
    pub index_value: f64,
    pub prior_index_value: f64,
    pub year: i32,
    pub profit: f64,
    pub indicators: BTreeMap<String, f64>,
}

impl Record {
    pub fn new(
        date: NaiveDate,
        index_value: f64,
        prior_index_value: f64,
        indicators: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            date,
            index_value,
            prior_index_value,
            year: date.year(),
            profit: index_value - prior_index_value,
            indicators,
        }
    }

    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).copied()
    }
}

//
// ================= Interaction Log =================
//

/// One logged question/answer exchange. Never mutated once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRecord {
    pub user_input: String,
    pub intent: Intent,
    pub response: String,
}

impl InteractionRecord {
    pub fn new(user_input: impl Into<String>, intent: Intent, response: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            intent,
            response: response.into(),
        }
    }
}
