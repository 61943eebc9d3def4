//! Feedback-driven retraining
//!
//! POLL LOG SIZE → (changed?) → RELOAD DATA → REINFORCE → FIT → PERSIST
//!
//! The scheduler owns the last observed log size for the life of the
//! process. A cycle that fails is reported and the loop keeps polling.

pub mod reinforce;

pub use reinforce::{interest_years, reinforce, ReinforcedDataset};

use crate::audit::InteractionLog;
use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::AgentError;
use crate::model::{
    train, DecisionTreeRegressor, JsonModelStore, ModelStore, Regressor, TrainingOptions,
};
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Retraining,
}

/// Summary of a successful cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub log_records: usize,
    pub interest_years: Vec<i32>,
    pub dataset_rows: usize,
    pub candidate_rows: usize,
    pub reinforced_rows: usize,
    pub training_rows: usize,
    pub fingerprint: String,
    pub elapsed_ms: u64,
}

/// Result of a single poll.
#[derive(Debug)]
pub enum PollOutcome {
    /// The log file does not exist yet.
    NoLog,
    Unchanged,
    Retrained(CycleReport),
    Failed(AgentError),
}

/// Watches the interaction log and retrains the model when it changes.
pub struct RetrainScheduler {
    data_path: PathBuf,
    log: InteractionLog,
    regressor: Arc<dyn Regressor>,
    store: Box<dyn ModelStore>,
    options: TrainingOptions,
    poll_interval: Duration,
    last_observed_size: u64,
    state: SchedulerState,
}

impl RetrainScheduler {
    pub fn new(
        data_path: impl Into<PathBuf>,
        log: InteractionLog,
        regressor: Arc<dyn Regressor>,
        store: Box<dyn ModelStore>,
        options: TrainingOptions,
        poll_interval: Duration,
    ) -> Self {
        Self {
            data_path: data_path.into(),
            log,
            regressor,
            store,
            options,
            poll_interval,
            last_observed_size: 0,
            state: SchedulerState::Idle,
        }
    }

    /// Tree regressor and JSON artifact store at the configured paths.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.data_path.clone(),
            InteractionLog::new(config.log_path.clone()),
            Arc::new(DecisionTreeRegressor::new(config.retrain.max_depth)),
            Box::new(JsonModelStore::new(config.model_path.clone())),
            TrainingOptions {
                validation_fraction: config.retrain.validation_fraction,
                seed: config.retrain.seed,
            },
            config.retrain.poll_interval,
        )
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn last_observed_size(&self) -> u64 {
        self.last_observed_size
    }

    /// Check the log once and run a cycle if its size changed.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let size = match self.log.size().await {
            Ok(Some(size)) => size,
            Ok(None) => return PollOutcome::NoLog,
            Err(e) => {
                error!(error = %e, "Cannot stat interaction log");
                return PollOutcome::Failed(e);
            }
        };

        if size == self.last_observed_size {
            return PollOutcome::Unchanged;
        }

        let cycle_id = Uuid::new_v4();
        info!(
            %cycle_id,
            previous_size = self.last_observed_size,
            current_size = size,
            "Interaction log changed, retraining"
        );

        self.state = SchedulerState::Retraining;
        let result = self
            .run_cycle(cycle_id)
            .instrument(info_span!("retrain_cycle", %cycle_id))
            .await;
        self.state = SchedulerState::Idle;
        self.last_observed_size = size;

        match result {
            Ok(report) => {
                info!(
                    %cycle_id,
                    interest_years = ?report.interest_years,
                    reinforced_rows = report.reinforced_rows,
                    training_rows = report.training_rows,
                    fingerprint = %report.fingerprint,
                    elapsed_ms = report.elapsed_ms,
                    "Model retrained"
                );
                PollOutcome::Retrained(report)
            }
            Err(e) => {
                let e = match e {
                    AgentError::RetrainingCycle(_) => e,
                    other => AgentError::RetrainingCycle(other.to_string()),
                };
                error!(%cycle_id, error = %e, "Retraining cycle failed");
                PollOutcome::Failed(e)
            }
        }
    }

    async fn run_cycle(&self, cycle_id: Uuid) -> Result<CycleReport> {
        let start = Instant::now();

        let data_path = self.data_path.clone();
        let dataset = tokio::task::spawn_blocking(move || Dataset::load(&data_path))
            .await
            .map_err(|e| AgentError::RetrainingCycle(format!("dataset load aborted: {}", e)))??;
        let dataset_rows = dataset.len();

        let records = self.log.read_or_empty().await?;
        let years = interest_years(&records);
        debug!(log_records = records.len(), interest_years = ?years, "Interaction log read");

        let regressor = Arc::clone(&self.regressor);
        let options = self.options.clone();

        // Fitting is CPU bound; keep it off the runtime threads.
        let (reinforced, artifact) = tokio::task::spawn_blocking(move || {
            let reinforced = reinforce(&dataset, &years);
            let artifact = train(
                &reinforced.dataset,
                regressor.as_ref(),
                &options,
                &reinforced.interest_years,
            )?;
            Ok::<_, AgentError>((reinforced, artifact))
        })
        .await
        .map_err(|e| AgentError::RetrainingCycle(format!("training task aborted: {}", e)))??;

        if !reinforced.interest_years.is_empty() {
            info!(years = ?reinforced.interest_years, "Reinforcing training with interest years");
        }

        let fingerprint = self.store.persist(&artifact).await?;

        Ok(CycleReport {
            cycle_id,
            log_records: records.len(),
            interest_years: reinforced.interest_years.clone(),
            dataset_rows,
            candidate_rows: reinforced.candidate_rows,
            reinforced_rows: reinforced.dataset.len(),
            training_rows: artifact.training_rows,
            fingerprint,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Poll on a fixed ticker until `shutdown` flips to true or its sender
    /// is dropped. Returns the scheduler so its state can be inspected.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Self {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            log = %self.log.path().display(),
            interval_secs = self.poll_interval.as_secs_f64(),
            "Watching for new user interest to retrain model"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Retraining scheduler stopping");
                        break;
                    }
                }
            }
        }

        self
    }
}
