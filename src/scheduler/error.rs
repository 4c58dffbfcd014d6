use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The cron engine refused an operation; the engine error is kept as the source.
    #[error("cron engine failure")]
    Scheduler(#[from] JobSchedulerError),

    #[error("Invalid cron expression: {0}")]
    InvalidCron(String),

    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Scheduler is not running")]
    NotRunning,
}
