//! Predictive model: fitting capability, training procedure and artifact store.
//!
//! The learner is an opaque capability (`Regressor`); the artifact is a JSON
//! envelope around whatever the learner serialises.

pub mod split;
pub mod tree;

pub use split::{train_validation_split, HoldoutSplit};
pub use tree::{DecisionTreeRegressor, RegressionTree};

use crate::audit::write_replacing;
use crate::dataset::{Dataset, FEATURE_COLUMNS, INDEX_COLUMN};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

/// A fitted model.
pub trait Predictor: Send + Sync {
    fn predict(&self, row: &[f64]) -> f64;
    fn to_json(&self) -> Result<serde_json::Value>;
}

/// Fitting capability: feature matrix + target vector -> predictor.
pub trait Regressor: Send + Sync {
    fn kind(&self) -> &'static str;
    fn fit(&self, features: &[Vec<f64>], target: &[f64]) -> Result<Box<dyn Predictor>>;
}

/// Persisted model with the context it was trained in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_kind: String,
    pub features: Vec<String>,
    pub target: String,
    pub trained_at: DateTime<Utc>,
    pub training_rows: usize,
    pub validation_rows: usize,
    pub interest_years: Vec<i32>,
    pub predictor: serde_json::Value,
}

/// Options for one training run.
#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub validation_fraction: f64,
    pub seed: Option<u64>,
}

/// Fit `regressor` on a randomised 80/20 hold-out of `dataset`.
///
/// The validation rows are set aside only; no metric is computed on them.
pub fn train(
    dataset: &Dataset,
    regressor: &dyn Regressor,
    options: &TrainingOptions,
    interest_years: &[i32],
) -> Result<ModelArtifact> {
    let (features, target) = dataset.training_matrix();
    let split = train_validation_split(target.len(), options.validation_fraction, options.seed);

    let train_x: Vec<Vec<f64>> = split.train.iter().map(|&i| features[i].clone()).collect();
    let train_y: Vec<f64> = split.train.iter().map(|&i| target[i]).collect();

    let predictor = regressor.fit(&train_x, &train_y)?;

    Ok(ModelArtifact {
        model_kind: regressor.kind().to_string(),
        features: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
        target: INDEX_COLUMN.to_string(),
        trained_at: Utc::now(),
        training_rows: split.train.len(),
        validation_rows: split.validation.len(),
        interest_years: interest_years.to_vec(),
        predictor: predictor.to_json()?,
    })
}

/// Destination for trained models.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Replace any previous artifact. Returns the artifact's SHA-256 fingerprint.
    async fn persist(&self, artifact: &ModelArtifact) -> Result<String>;
}

/// Single JSON file, overwritten on every persist.
pub struct JsonModelStore {
    path: PathBuf,
}

impl JsonModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ModelStore for JsonModelStore {
    async fn persist(&self, artifact: &ModelArtifact) -> Result<String> {
        let body = serde_json::to_vec_pretty(artifact)?;
        let fingerprint = hex::encode(Sha256::digest(&body));

        write_replacing(&self.path, &body).await?;

        info!(
            path = %self.path.display(),
            fingerprint = %fingerprint,
            training_rows = artifact.training_rows,
            "Model artifact written"
        );

        Ok(fingerprint)
    }
}
