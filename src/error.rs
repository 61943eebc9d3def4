//! Error types for the market reasoning agent

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Core Pipeline Errors
    // =============================

    /// Fatal at startup: nothing can be answered without a dataset.
    #[error("Data load error: {0}")]
    DataLoad(String),

    /// Non-fatal: callers treat a corrupt log as an empty one.
    #[error("Interaction log corrupted: {0}")]
    LogCorruption(String),

    #[error("Classification failure: {0}")]
    Classification(String),

    #[error("Retraining cycle error: {0}")]
    RetrainingCycle(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
