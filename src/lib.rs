//! Market Reasoning Agent
//!
//! A question-answering assistant over historical S&P 500 data that:
//! - Classifies free-text questions into a closed set of intents
//! - Answers each intent with a deterministic query over the dataset
//! - Logs every interaction to a JSON file
//! - Retrains a regression model whenever the log grows, weighting the
//!   years users asked about
//!
//! CHAT LOOP:
//! INPUT → CLASSIFY → ANSWER → LOG
//!
//! RETRAIN LOOP:
//! POLL → REINFORCE → FIT → PERSIST

pub mod audit;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod huggingface;
pub mod model;
pub mod models;
pub mod query;
pub mod retrain;
pub mod session;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use audit::InteractionLog;
pub use classifier::{IntentClassifier, KeywordRanker, ZeroShotRanker};
pub use config::Config;
pub use dataset::Dataset;
pub use retrain::{PollOutcome, RetrainScheduler};
pub use session::ChatSession;
