//! Job executor: consumes queue jobs and runs pipelines.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tscout_models::{Job, JobState};
use tscout_queue::QueueJob;

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::pipelines;
use crate::progress::JobTracker;

/// Job executor that processes jobs from the queue.
pub struct JobExecutor {
    ctx: Arc<WorkerContext>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    pub fn new(ctx: WorkerContext) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(ctx.config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        Self {
            ctx: Arc::new(ctx),
            job_semaphore,
            shutdown,
            consumer_name: format!("worker-{}", Uuid::new_v4()),
        }
    }

    /// Run the consume loop until shutdown.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            consumer = %self.consumer_name,
            max_jobs = self.ctx.config.max_concurrent_jobs,
            "starting job executor"
        );

        self.ctx.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        // Periodically reclaim jobs abandoned by crashed workers.
        let claim_ctx = Arc::clone(&self.ctx);
        let claim_consumer = self.consumer_name.clone();
        let claim_semaphore = Arc::clone(&self.job_semaphore);
        let mut claim_shutdown = self.shutdown.subscribe();
        let claim_interval = self.ctx.config.claim_interval;

        let claim_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(claim_interval);
            loop {
                tokio::select! {
                    _ = claim_shutdown.changed() => {
                        if *claim_shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match claim_ctx.queue.claim_stale(&claim_consumer, 5).await {
                            Ok(jobs) if !jobs.is_empty() => {
                                info!("claimed {} stale jobs", jobs.len());
                                for (message_id, job) in jobs {
                                    let Ok(permit) = claim_semaphore.clone().acquire_owned().await else {
                                        return;
                                    };
                                    let ctx = Arc::clone(&claim_ctx);
                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        Self::execute_job(ctx, message_id, job).await;
                                    });
                                }
                            }
                            Ok(_) => {}
                            Err(e) => warn!("failed to claim stale jobs: {e}"),
                        }
                    }
                }
            }
        });

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("error consuming jobs: {e}");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("waiting for in-flight jobs to complete");
        let _ = tokio::time::timeout(self.ctx.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("job executor stopped");
        Ok(())
    }

    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .ctx
            .queue
            .consume(&self.consumer_name, 1000, available.min(5))
            .await?;

        if jobs.is_empty() {
            return Ok(());
        }
        debug!("consumed {} jobs from queue", jobs.len());

        for (message_id, job) in jobs {
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::job_failed("semaphore closed"))?;
            let ctx = Arc::clone(&self.ctx);

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(ctx, message_id, job).await;
            });
        }

        Ok(())
    }

    /// Execute one job with retry and DLQ handling.
    fn execute_job(
        ctx: Arc<WorkerContext>,
        message_id: String,
        queue_job: QueueJob,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        Box::pin(async move {
            let job_id = queue_job.job_id().clone();
            info!(job = %job_id, kind = %queue_job.kind(), "executing job");
            metrics::counter!("tscout_worker_jobs_total", "kind" => queue_job.kind().as_str())
                .increment(1);

            let result: WorkerResult<()> = Self::process_job(&ctx, &queue_job).await;

            match result {
                Ok(()) => {
                    info!(job = %job_id, "job completed");
                    if let Err(e) = ctx.queue.ack(&message_id).await {
                        error!(job = %job_id, "failed to ack job: {e}");
                    }
                    ctx.queue.clear_dedup(&queue_job).await.ok();
                }
                Err(e) if e.is_cancelled() => {
                    // Cancelled jobs are terminal; never retried.
                    info!(job = %job_id, "job cancelled: {e}");
                    Self::mark_failed(&ctx, &queue_job, "cancelled").await;
                    ctx.queue.ack(&message_id).await.ok();
                    ctx.queue.clear_dedup(&queue_job).await.ok();
                }
                Err(e) => {
                    error!(job = %job_id, "job failed: {e}");

                    let retry_count =
                        ctx.queue.increment_retry(&message_id).await.unwrap_or(u32::MAX);
                    let max_retries = ctx.queue.max_retries();

                    if retry_count >= max_retries {
                        warn!(job = %job_id, "exceeded {max_retries} retries, moving to DLQ");
                        Self::mark_failed(&ctx, &queue_job, &e.to_string()).await;
                        if let Err(dlq_err) =
                            ctx.queue.dlq(&message_id, &queue_job, &e.to_string()).await
                        {
                            error!(job = %job_id, "failed to move job to DLQ: {dlq_err}");
                        }
                        ctx.queue.clear_dedup(&queue_job).await.ok();
                    } else {
                        info!(job = %job_id, "will be retried (attempt {retry_count}/{max_retries})");
                        // Redelivered after the visibility timeout.
                    }
                }
            }
        })
    }

    /// Bind the user context and run the matching pipeline.
    fn process_job<'a>(
        ctx: &'a Arc<WorkerContext>,
        queue_job: &'a QueueJob,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = WorkerResult<()>> + Send + 'a>> {
        Box::pin(async move {
            // The API creates the job record before enqueueing; synthesize a
            // record only for payloads that arrive without one.
            let job = match ctx.jobs.get(queue_job.job_id()).await? {
                Some(job) => job,
                None => {
                    let mut job = Job::new(
                        queue_job.kind(),
                        queue_job.user_id(),
                        queue_job.project_id().cloned(),
                    );
                    job.id = queue_job.job_id().clone();
                    ctx.jobs.create(&job).await?;
                    job
                }
            };

            if job.state != JobState::Running {
                info!(job = %job.id, state = %job.state, "job already terminal, skipping");
                return Ok(());
            }

            let user = ctx.user_context(queue_job.user_id()).await?;
            let tracker = JobTracker::new(ctx.jobs.clone(), ctx.projects.clone(), job);

            pipelines::run(ctx.as_ref(), &user, tracker, queue_job.clone()).await
        })
    }

    /// Best-effort terminal failure on the job document.
    async fn mark_failed(ctx: &Arc<WorkerContext>, queue_job: &QueueJob, error: &str) {
        match ctx.jobs.get(queue_job.job_id()).await {
            Ok(Some(job)) if job.state == JobState::Running => {
                let failed = job.fail(error);
                if let Err(e) = ctx.jobs.put(&failed).await {
                    warn!(job = %queue_job.job_id(), "failed to persist job failure: {e}");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(job = %queue_job.job_id(), "failed to load job for failure: {e}"),
        }
    }

    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.ctx.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
