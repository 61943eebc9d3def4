//! Environment configuration shared by the chatbot and the retrainer.

use crate::error::AgentError;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CLASSIFIER_MODEL: &str = "facebook/bart-large-mnli";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub log_path: PathBuf,
    pub model_path: PathBuf,
    pub classifier: ClassifierConfig,
    pub retrain: RetrainConfig,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Hugging Face token; without one the keyword ranker is used.
    pub api_token: Option<String>,
    pub model: String,
    /// Full inference URL, overriding the hosted endpoint for `model`.
    pub endpoint: Option<String>,
    pub cache: bool,
}

#[derive(Debug, Clone)]
pub struct RetrainConfig {
    pub poll_interval: Duration,
    pub max_depth: usize,
    pub validation_fraction: f64,
    /// Fixed seed for the hold-out split; random when unset.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("stock_data.csv"),
            log_path: PathBuf::from("question_log.json"),
            model_path: PathBuf::from("sp500_reasoning_model.json"),
            classifier: ClassifierConfig::default(),
            retrain: RetrainConfig::default(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            model: DEFAULT_CLASSIFIER_MODEL.to_string(),
            endpoint: None,
            cache: true,
        }
    }
}

impl Default for RetrainConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(6),
            max_depth: 3,
            validation_fraction: 0.2,
            seed: None,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read settings from the environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Config::default();

        let api_token = env::var("HF_API_TOKEN")
            .or_else(|_| env::var("HUGGINGFACE_API_TOKEN"))
            .ok()
            .filter(|t| !t.trim().is_empty());

        Ok(Config {
            data_path: path_var("STOCK_DATA_PATH", defaults.data_path),
            log_path: path_var("QUESTION_LOG_PATH", defaults.log_path),
            model_path: path_var("MODEL_PATH", defaults.model_path),
            classifier: ClassifierConfig {
                api_token,
                model: env::var("CLASSIFIER_MODEL").unwrap_or(defaults.classifier.model),
                endpoint: env::var("CLASSIFIER_ENDPOINT")
                    .ok()
                    .filter(|e| !e.trim().is_empty()),
                cache: parse_var("CLASSIFIER_CACHE", defaults.classifier.cache)?,
            },
            retrain: RetrainConfig {
                poll_interval: poll_interval(parse_var(
                    "RETRAIN_POLL_SECS",
                    defaults.retrain.poll_interval.as_secs(),
                )?)?,
                max_depth: parse_var("MODEL_MAX_DEPTH", defaults.retrain.max_depth)?,
                validation_fraction: defaults.retrain.validation_fraction,
                seed: match env::var("RETRAIN_SEED") {
                    Ok(raw) => Some(parse_value("RETRAIN_SEED", &raw)?),
                    Err(_) => None,
                },
            },
        })
    }
}

fn poll_interval(secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(AgentError::Config(
            "RETRAIN_POLL_SECS must be at least 1".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn path_var(key: &str, default: PathBuf) -> PathBuf {
    env::var(key).map(PathBuf::from).unwrap_or(default)
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AgentError::Config(format!("invalid value for {}: '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_setup() {
        let config = Config::default();
        assert_eq!(config.retrain.poll_interval, Duration::from_secs(6));
        assert_eq!(config.retrain.max_depth, 3);
        assert_eq!(config.classifier.model, "facebook/bart-large-mnli");
        assert!(config.classifier.cache);
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        assert!(matches!(poll_interval(0), Err(AgentError::Config(_))));
        assert_eq!(poll_interval(6).unwrap(), Duration::from_secs(6));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u64>("RETRAIN_POLL_SECS", " 10 ").unwrap(), 10);
        assert!(parse_value::<bool>("CLASSIFIER_CACHE", "true").unwrap());

        let err = parse_value::<usize>("MODEL_MAX_DEPTH", "deep").unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }
}
