//! Report job controller and background executor.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use storewatch_core::{ReportId, ReportRow};
use storewatch_reporting::{ObservationSource, ScheduleSource, SourceError, UptimeCalculator};

use crate::artifact::{Artifact, ArtifactError, ReportMaterializer};

use super::store::{ReportStore, ReportStoreError};
use super::types::{JobEvent, ReportJob, ReportState, ReportStatus};

/// Fault that prevents a whole report from being produced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobFault {
    #[error("no observations recorded; reference instant is undefined")]
    NoObservations,
    #[error("could not determine reference instant: {0}")]
    ReferenceInstant(SourceError),
    #[error("could not enumerate stores: {0}")]
    Stores(SourceError),
    #[error("could not persist report: {0}")]
    Persist(ReportStoreError),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Store(#[from] ReportStoreError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Result of asking for a report's artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    Ready(Artifact),
    NotReady,
    Failed { error: String },
    NotFound,
}

/// Owns the report lifecycle: job creation, execution, status and artifacts.
///
/// Status and artifact queries only read persisted state, so they are safe to
/// call concurrently with a running job and never wait on it.
#[derive(Debug)]
pub struct ReportController<O, S, R> {
    calculator: UptimeCalculator<O, S>,
    reports: R,
    materializer: ReportMaterializer,
}

impl<O, S, R> ReportController<O, S, R>
where
    O: ObservationSource,
    S: ScheduleSource,
    R: ReportStore,
{
    pub fn new(calculator: UptimeCalculator<O, S>, reports: R, materializer: ReportMaterializer) -> Self {
        Self {
            calculator,
            reports,
            materializer,
        }
    }

    pub fn reports(&self) -> &R {
        &self.reports
    }

    /// Record a new job in `Created` state and return its id.
    pub async fn create_job(&self) -> Result<ReportId, ReportStoreError> {
        let id = self.reports.insert(ReportJob::new(Utc::now())).await?;
        info!(report_id = %id, "report job created");
        Ok(id)
    }

    /// Execute a created job to a terminal status.
    ///
    /// Per-store faults are absorbed; any job-level fault marks the job `Failed`.
    /// Returns an error when the job is unknown or already started, or when the store
    /// rejects the status writes themselves.
    pub async fn run_job(&self, id: ReportId) -> Result<ReportStatus, ReportStoreError> {
        match self.reports.transition(id, JobEvent::Start, Utc::now()).await {
            Ok(_) => {}
            Err(ReportStoreError::Storage(e)) => {
                error!(report_id = %id, error = %e, "could not start report job");
                return self.fail(id, format!("could not start report: {e}")).await;
            }
            Err(e) => return Err(e),
        }
        let started = Instant::now();

        let outcome = match self.compute(id).await {
            Ok(rows) => self
                .reports
                .complete(id, rows, Utc::now())
                .await
                .map_err(JobFault::Persist),
            Err(fault) => Err(fault),
        };

        match outcome {
            Ok(job) => {
                info!(
                    report_id = %id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "report job completed"
                );
                Ok(job.status)
            }
            Err(fault) => {
                error!(report_id = %id, error = %fault, "report job failed");
                self.fail(id, fault.to_string()).await
            }
        }
    }

    /// Mark a job failed. Valid from `Created` and `Running`.
    pub async fn fail(&self, id: ReportId, error: String) -> Result<ReportStatus, ReportStoreError> {
        let job = self
            .reports
            .transition(id, JobEvent::Fail(error), Utc::now())
            .await
            .inspect_err(|e| error!(report_id = %id, error = %e, "could not record report failure"))?;
        Ok(job.status)
    }

    async fn compute(&self, id: ReportId) -> Result<Vec<ReportRow>, JobFault> {
        let now = self
            .calculator
            .reference_instant()
            .await
            .map_err(JobFault::ReferenceInstant)?
            .ok_or(JobFault::NoObservations)?;
        let stores = self.calculator.stores().await.map_err(JobFault::Stores)?;

        debug!(report_id = %id, now = %now, stores = stores.len(), "computing report");

        let outcomes = self.calculator.compute_stores(&stores, now).await;
        if !outcomes.skipped.is_empty() {
            warn!(
                report_id = %id,
                computed = outcomes.rows.len(),
                skipped = outcomes.skipped.len(),
                "report has skipped stores"
            );
        }

        Ok(outcomes.rows)
    }

    /// Externally visible status; an unknown id is `NotFound`.
    pub async fn get_status(&self, id: ReportId) -> Result<ReportState, ReportStoreError> {
        Ok(match self.reports.get(id).await? {
            Some(job) => ReportState::from(&job.status),
            None => ReportState::NotFound,
        })
    }

    /// The artifact of a completed job, materializing it on first request.
    pub async fn get_artifact(&self, id: ReportId) -> Result<ArtifactOutcome, ControllerError> {
        match self.get_status(id).await? {
            ReportState::Running => Ok(ArtifactOutcome::NotReady),
            ReportState::NotFound => Ok(ArtifactOutcome::NotFound),
            ReportState::Failed { error } => Ok(ArtifactOutcome::Failed { error }),
            ReportState::Completed => {
                if let Some(artifact) = self.materializer.existing(id).await? {
                    return Ok(ArtifactOutcome::Ready(artifact));
                }
                let rows = self.reports.rows(id).await?;
                let artifact = self.materializer.materialize(id, &rows).await?;
                Ok(ArtifactOutcome::Ready(artifact))
            }
        }
    }
}

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct ReportExecutorConfig {
    /// Name for logging
    pub name: String,
    /// Maximum reports computed at once
    pub max_concurrent: usize,
}

impl Default for ReportExecutorConfig {
    fn default() -> Self {
        Self {
            name: "report-executor".to_string(),
            max_concurrent: 2,
        }
    }
}

impl ReportExecutorConfig {
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }
}

/// Executor runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExecutorStats {
    pub jobs_processed: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub current_running: usize,
}

const EXECUTOR_STOPPED: &str = "report executor is not running";

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error(transparent)]
    Store(#[from] ReportStoreError),
    #[error("report executor is not running")]
    ExecutorStopped,
}

/// Background report executor.
///
/// Job ids are handed to a worker task over an unbounded queue; triggering never
/// waits for the computation itself, nor for room in the queue.
///
/// Every queued job reaches a terminal status: jobs still queued when the executor
/// stops are failed, as are jobs whose computation panics.
pub struct ReportExecutor;

impl ReportExecutor {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn<O, S, R>(
        controller: Arc<ReportController<O, S, R>>,
        config: ReportExecutorConfig,
    ) -> ReportExecutorHandle<O, S, R>
    where
        O: ObservationSource + 'static,
        S: ScheduleSource + 'static,
        R: ReportStore + 'static,
    {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let stats = Arc::new(Mutex::new(ExecutorStats::default()));

        let join = tokio::spawn(worker_loop(
            controller.clone(),
            config,
            queue_rx,
            shutdown_rx,
            stats.clone(),
        ));

        ReportExecutorHandle {
            controller,
            queue: queue_tx,
            shutdown: Some(shutdown_tx),
            join: Some(join),
            stats,
        }
    }
}

/// Handle to trigger reports on, and control, a running executor.
pub struct ReportExecutorHandle<O, S, R> {
    controller: Arc<ReportController<O, S, R>>,
    queue: mpsc::UnboundedSender<ReportId>,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
    stats: Arc<Mutex<ExecutorStats>>,
}

impl<O, S, R> ReportExecutorHandle<O, S, R>
where
    O: ObservationSource,
    S: ScheduleSource,
    R: ReportStore,
{
    pub fn controller(&self) -> &Arc<ReportController<O, S, R>> {
        &self.controller
    }

    /// Create a job and queue it for execution. Returns as soon as it is queued.
    pub async fn trigger(&self) -> Result<ReportId, TriggerError> {
        let id = self.controller.create_job().await?;

        if self.queue.send(id).is_err() {
            self.controller.fail(id, EXECUTOR_STOPPED.to_string()).await?;
            return Err(TriggerError::ExecutorStopped);
        }

        Ok(id)
    }

    /// Get current executor statistics.
    pub fn stats(&self) -> ExecutorStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Stop accepting jobs, fail the ones still queued and wait for in-flight ones
    /// to finish.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

fn update_stats(stats: &Mutex<ExecutorStats>, f: impl FnOnce(&mut ExecutorStats)) {
    if let Ok(mut s) = stats.lock() {
        f(&mut s);
    }
}

async fn worker_loop<O, S, R>(
    controller: Arc<ReportController<O, S, R>>,
    config: ReportExecutorConfig,
    mut queue: mpsc::UnboundedReceiver<ReportId>,
    mut shutdown: oneshot::Receiver<()>,
    stats: Arc<Mutex<ExecutorStats>>,
) where
    O: ObservationSource + 'static,
    S: ScheduleSource + 'static,
    R: ReportStore + 'static,
{
    info!(executor = %config.name, "report executor started");
    let max_concurrent = config.max_concurrent.max(1);
    let permits = Arc::new(Semaphore::new(max_concurrent));

    // A permit is taken before an id is dequeued, so no id is held while waiting.
    loop {
        let permit = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            permit = permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };
        let id = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            next = queue.recv() => match next {
                Some(id) => id,
                None => break,
            },
        };

        debug!(executor = %config.name, report_id = %id, "picked up report job");
        update_stats(&stats, |s| s.current_running += 1);

        let controller = controller.clone();
        let stats = stats.clone();
        tokio::spawn(async move {
            let result = run_supervised(controller, id).await;

            update_stats(&stats, |s| {
                s.current_running = s.current_running.saturating_sub(1);
                s.jobs_processed += 1;
                match &result {
                    Ok(ReportStatus::Completed) => s.jobs_completed += 1,
                    _ => s.jobs_failed += 1,
                }
            });
            drop(permit);

            if let Err(e) = result {
                error!(report_id = %id, error = %e, "report job aborted");
            }
        });
    }

    queue.close();
    let mut abandoned = 0usize;
    while let Ok(id) = queue.try_recv() {
        abandoned += 1;
        let _ = controller.fail(id, EXECUTOR_STOPPED.to_string()).await;
        update_stats(&stats, |s| {
            s.jobs_processed += 1;
            s.jobs_failed += 1;
        });
    }
    if abandoned > 0 {
        warn!(executor = %config.name, abandoned, "failed queued report jobs on shutdown");
    }

    // Wait for in-flight jobs before reporting the executor stopped.
    let _ = permits.acquire_many(max_concurrent as u32).await;
    info!(executor = %config.name, "report executor stopped");
}

/// Run a job on its own task so a panic in the computation still fails the job.
async fn run_supervised<O, S, R>(
    controller: Arc<ReportController<O, S, R>>,
    id: ReportId,
) -> Result<ReportStatus, ReportStoreError>
where
    O: ObservationSource + 'static,
    S: ScheduleSource + 'static,
    R: ReportStore + 'static,
{
    let job = tokio::spawn({
        let controller = controller.clone();
        async move { controller.run_job(id).await }
    });

    match job.await {
        Ok(result) => result,
        Err(e) => {
            error!(report_id = %id, error = %e, "report job panicked");
            controller.fail(id, "report computation panicked".to_string()).await
        }
    }
}
