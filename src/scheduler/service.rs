//! Scheduler service wrapper around tokio-cron-scheduler.
//!
//! Jobs fire on local time. Every trigger goes through the job's
//! [`OverlapGuard`] before the job body runs.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Local;
use log::{info, warn};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use super::{Acquire, OverlapGuard, OverlapPolicy, SchedulerError};

/// Accept both the 5-field form (minute first) and the 6-field form
/// (second first). 5-field expressions fire at second zero.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidCron` for any other field count or when
/// the scheduler cannot parse the result.
pub fn normalize_cron_expression(expr: &str) -> Result<String, SchedulerError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    let normalized = match fields.len() {
        5 => format!("0 {}", fields.join(" ")),
        6 | 7 => fields.join(" "),
        n => {
            return Err(SchedulerError::InvalidCron(format!(
                "'{}': expected 5 or 6 fields, found {}",
                expr, n
            )));
        }
    };
    validate_cron_expression(&normalized)?;
    Ok(normalized)
}

/// Validate a 6-field (second minute hour day-of-month month day-of-week)
/// cron expression.
pub fn validate_cron_expression(expr: &str) -> Result<(), SchedulerError> {
    match Job::new_async(expr, |_uuid, _lock| Box::pin(async {})) {
        Ok(_) => Ok(()),
        Err(e) => Err(SchedulerError::InvalidCron(format!("'{}': {}", expr, e))),
    }
}

/// Run `job_fn` for one trigger, honouring the guard's policy.
///
/// Under [`OverlapPolicy::Queue`] the active trigger keeps running `job_fn`
/// until no trigger is pending.
pub async fn run_guarded<F, Fut>(name: &str, guard: &OverlapGuard, job_fn: &F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut run = match guard.try_acquire() {
        Acquire::Run(run) => run,
        Acquire::Queued => {
            info!("{}: previous run still active, trigger queued", name);
            return;
        }
        Acquire::Skipped => {
            warn!("{}: previous run still active, trigger skipped", name);
            return;
        }
    };

    loop {
        let start_time = Instant::now();
        info!("{}: run started", name);
        job_fn().await;
        info!(duration = &*format!("{:?}", start_time.elapsed()); "{}: run completed", name);

        match run.finish() {
            Some(next) => {
                info!("{}: running queued trigger", name);
                run = next;
            }
            None => break,
        }
    }
}

/// Lifecycle wrapper around [`JobScheduler`].
pub struct SchedulerService {
    scheduler: JobScheduler,
    is_running: AtomicBool,
}

impl SchedulerService {
    /// The scheduler is created stopped; call `start()` to begin firing jobs.
    pub async fn new() -> Result<Self, SchedulerError> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            is_running: AtomicBool::new(false),
        })
    }

    pub async fn start(&self) -> Result<(), SchedulerError> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }

        if let Err(e) = self.scheduler.start().await {
            self.is_running.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        info!("Scheduler started");

        Ok(())
    }

    /// Stop firing new triggers. Runs already in flight are not awaited.
    pub async fn shutdown(&mut self) -> Result<(), SchedulerError> {
        if !self.is_running.load(Ordering::SeqCst) {
            return Err(SchedulerError::NotRunning);
        }

        if let Err(e) = self.scheduler.shutdown().await {
            warn!("Error during scheduler shutdown: {}", e);
        }

        self.is_running.store(false, Ordering::SeqCst);
        info!("Scheduler shutdown complete");

        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Register `job_fn` on `cron_expr` behind an overlap guard with `policy`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidCron` if the expression is not valid.
    pub async fn add_cron_job<F, Fut>(
        &self,
        name: &str,
        cron_expr: &str,
        policy: OverlapPolicy,
        job_fn: F,
    ) -> Result<Uuid, SchedulerError>
    where
        F: Fn() -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let expr = normalize_cron_expression(cron_expr)?;
        let job_name = name.to_string();
        let guard = Arc::new(OverlapGuard::new(policy));

        let job = Job::new_async_tz(expr.as_str(), Local, move |_uuid, _lock| {
            let name = job_name.clone();
            let guard = guard.clone();
            let job_fn = job_fn.clone();

            Box::pin(async move {
                run_guarded(&name, &guard, &job_fn).await;
            })
        })
        .map_err(|e| SchedulerError::InvalidCron(e.to_string()))?;

        let uuid = self.scheduler.add(job).await?;
        info!(
            "Job {} registered: uuid {}, cron `{}`, overlap {}",
            name, uuid, expr, policy
        );

        Ok(uuid)
    }
}
