use anyhow::{Context, Result};
use log::{error, info};
use stampede::common::errors::handle_error;
use stampede::config::{AppConfig, TransformParams};
use stampede::run_batch;
use stampede::scheduler::SchedulerService;
use stampede::workflow::processors::setup::{initialize_folder, initialize_logger};
use std::sync::Arc;

const BATCH_JOB_NAME: &str = "resize-batch";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    initialize_logger(config.log_level()?, &config.log_path)?;

    run(config).await.map_err(handle_error)
}

async fn run(config: AppConfig) -> Result<()> {
    let crontab = config.crontab()?.to_string();
    let policy = config.overlap_policy()?;
    let params = Arc::new(TransformParams::from_config(&config)?);
    initialize_folder(&params)?;

    info!(
        "Input {:?}, output {:?}, max width {}, batch cap {}, filter {}",
        params.input_dir,
        params.output_dir,
        params.max_width,
        params.batch_cap,
        params.ext_filter.as_str().unwrap_or("<all files>")
    );

    let mut scheduler = SchedulerService::new().await?;
    scheduler
        .add_cron_job(BATCH_JOB_NAME, &crontab, policy, move || {
            let params = params.clone();
            async move {
                if let Err(err) = run_batch(params).await {
                    handle_error(err.context("batch run aborted"));
                }
            }
        })
        .await?;
    scheduler.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    if let Err(err) = scheduler.shutdown().await {
        error!("{}", err);
    }
    Ok(())
}
