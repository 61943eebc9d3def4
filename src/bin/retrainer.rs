use market_reasoning_agent::{Config, RetrainScheduler};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    info!(
        data = %config.data_path.display(),
        log = %config.log_path.display(),
        model = %config.model_path.display(),
        max_depth = config.retrain.max_depth,
        "Retraining scheduler starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for shutdown signal");
            // keep the sender alive so the scheduler runs until killed
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let scheduler = RetrainScheduler::from_config(&config).run(shutdown_rx).await;

    info!(
        last_observed_size = scheduler.last_observed_size(),
        "Retraining scheduler stopped"
    );

    Ok(())
}
