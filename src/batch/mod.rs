use crate::config::{BatchRequest, ConfigurationError};
use crate::format::{self, OutputFormat, SubtitleLayout};
use crate::provider::{self, ProviderError, SpeechProvider};
use crate::transport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use self::job::JobRecord;
use self::retry::RetryPolicy;

pub mod job;
pub mod progress;
mod retry;

pub use job::{JobSnapshot, JobStatus};
pub use progress::{BatchEvent, BatchSummary};

/// Shared, read-only batch environment plus the one synchronized mutable
/// aggregate (the job table). Cloned into every worker.
#[derive(Clone)]
struct BatchContext {
    jobs: Arc<Mutex<Vec<JobRecord>>>,
    cancelled: Arc<AtomicBool>,
    events: UnboundedSender<BatchEvent>,
    provider: Arc<dyn SpeechProvider>,
    language: Option<String>,
    output_format: OutputFormat,
    layout: SubtitleLayout,
    request_timeout: Duration,
    retry: RetryPolicy,
}

/// Start a batch. Validates the whole request up front (nothing is
/// partially started on error), builds the shared transport and provider
/// client, then schedules one job per file. Returns the session handle and
/// the observer event stream.
pub fn submit(
    request: BatchRequest,
) -> Result<(BatchHandle, UnboundedReceiver<BatchEvent>), ConfigurationError> {
    request.validate()?;
    let client = transport::build_client(&request.proxy, request.request_timeout)?;
    let provider = provider::create(
        request.provider,
        request.api_key.clone(),
        client,
        request.model.clone(),
    );
    submit_with(request, provider)
}

fn submit_with(
    request: BatchRequest,
    provider: Arc<dyn SpeechProvider>,
) -> Result<(BatchHandle, UnboundedReceiver<BatchEvent>), ConfigurationError> {
    request.validate()?;

    let jobs: Vec<JobRecord> = request
        .files
        .iter()
        .map(|file| JobRecord::new(file.clone()))
        .collect();
    tracing::info!(
        "batch submitted: {} file(s), provider {}, concurrency {}",
        jobs.len(),
        provider.name(),
        request.concurrency
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let ctx = BatchContext {
        jobs: Arc::new(Mutex::new(jobs)),
        cancelled: Arc::new(AtomicBool::new(false)),
        events: events_tx.clone(),
        provider,
        language: request.language.clone(),
        output_format: request.output_format,
        layout: request.layout,
        request_timeout: request.request_timeout,
        retry: RetryPolicy::single(),
    };

    let supervisor = tokio::spawn(run_batch(ctx.clone(), request.concurrency));
    let handle = BatchHandle {
        jobs: ctx.jobs,
        cancelled: ctx.cancelled,
        events: events_tx,
        supervisor,
    };
    Ok((handle, events_rx))
}

/// Admit jobs strictly FIFO, at most `concurrency` running at a time, and
/// wait for every worker to settle.
async fn run_batch(ctx: BatchContext, concurrency: usize) {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let job_count = match ctx.jobs.lock() {
        Ok(jobs) => jobs.len(),
        Err(_) => return,
    };

    let mut workers = Vec::with_capacity(job_count);
    for index in 0..job_count {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        // Admission checkpoint: cancellation lands here for queued jobs.
        let admission = {
            match ctx.jobs.lock() {
                Ok(mut jobs) => {
                    if ctx.cancelled.load(Ordering::SeqCst)
                        || jobs[index].status != JobStatus::Queued
                    {
                        None
                    } else {
                        jobs[index].transition(JobStatus::Running);
                        Some(jobs[index].id.clone())
                    }
                }
                Err(_) => None,
            }
        };
        let Some(job_id) = admission else { continue };

        let _ = ctx.events.send(BatchEvent::Progress { job_id, percent: 0 });
        workers.push(tokio::spawn(run_job(ctx.clone(), index, permit)));
    }

    for worker in workers {
        let _ = worker.await;
    }

    // Jobs left queued by a cancellation race settle here.
    cancel_queued_jobs(&ctx.jobs, &ctx.events);

    if let Ok(jobs) = ctx.jobs.lock() {
        let summary = BatchSummary::from_jobs(&jobs);
        tracing::info!(
            "batch done: {} succeeded, {} failed, {} cancelled",
            summary.succeeded,
            summary.failed,
            summary.cancelled
        );
    }
}

/// Run one admitted job end-to-end: provider call with timeout and single
/// transient retry, then formatting, then the terminal transition.
async fn run_job(ctx: BatchContext, index: usize, _permit: OwnedSemaphorePermit) {
    let (job_id, source) = {
        match ctx.jobs.lock() {
            Ok(jobs) => (jobs[index].id.clone(), jobs[index].source.clone()),
            Err(_) => return,
        }
    };

    // Cancellation may have landed between admission and the first call.
    if ctx.cancelled.load(Ordering::SeqCst) {
        finish_job(&ctx, index, JobStatus::Cancelled, None, None);
        return;
    }

    let progress_jobs = ctx.jobs.clone();
    let progress_events = ctx.events.clone();
    let progress_job_id = job_id.clone();
    let on_progress = move |percent: u8| {
        let advanced = match progress_jobs.lock() {
            Ok(mut jobs) => jobs[index].bump_progress(percent),
            Err(_) => false,
        };
        if advanced {
            let _ = progress_events.send(BatchEvent::Progress {
                job_id: progress_job_id.clone(),
                percent: percent.min(100),
            });
        }
    };

    let mut attempt = 0u8;
    let outcome = loop {
        tracing::info!(
            "job {}: {} attempt {} for {}",
            job_id,
            ctx.provider.name(),
            attempt + 1,
            source.display()
        );
        let call = ctx
            .provider
            .transcribe(&source, ctx.language.as_deref(), &on_progress);
        let result = match timeout(ctx.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::NetworkFailure(
                "provider call timed out".to_string(),
            )),
        };

        match result {
            Ok(transcript) => break Ok(transcript),
            Err(error) => {
                if !ctx.cancelled.load(Ordering::SeqCst) && ctx.retry.should_retry(attempt, &error)
                {
                    tracing::warn!("job {}: {} (will retry)", job_id, error);
                    ctx.retry.wait().await;
                    attempt += 1;
                    if !ctx.cancelled.load(Ordering::SeqCst) {
                        continue;
                    }
                }
                break Err(error);
            }
        }
    };

    // Post-call checkpoint: a cancelled job discards whatever it got.
    if ctx.cancelled.load(Ordering::SeqCst) {
        finish_job(&ctx, index, JobStatus::Cancelled, None, None);
        return;
    }

    match outcome {
        Ok(transcript) => match format::render(&transcript, ctx.output_format, &ctx.layout) {
            Ok(rendered) => {
                tracing::info!("job {}: succeeded ({} chars)", job_id, rendered.len());
                finish_job(&ctx, index, JobStatus::Succeeded, Some(rendered), None);
            }
            Err(error) => {
                tracing::error!("job {}: formatter rejected transcript: {}", job_id, error);
                finish_job(&ctx, index, JobStatus::Failed, None, Some(error.to_string()));
            }
        },
        Err(error) => {
            tracing::error!("job {}: failed: {}", job_id, error);
            finish_job(&ctx, index, JobStatus::Failed, None, Some(error.to_string()));
        }
    }
}

fn finish_job(
    ctx: &BatchContext,
    index: usize,
    status: JobStatus,
    result: Option<String>,
    error: Option<String>,
) {
    let finished = {
        match ctx.jobs.lock() {
            Ok(mut jobs) => {
                let job = &mut jobs[index];
                if !job.transition(status) {
                    None
                } else {
                    if status == JobStatus::Succeeded {
                        job.progress = 100;
                    }
                    job.result = result;
                    job.error = error;
                    Some((
                        job.id.clone(),
                        job.progress,
                        job.result.clone(),
                        job.error.clone(),
                    ))
                }
            }
            Err(_) => None,
        }
    };

    if let Some((job_id, progress, result, error)) = finished {
        if status == JobStatus::Succeeded {
            let _ = ctx.events.send(BatchEvent::Progress {
                job_id: job_id.clone(),
                percent: progress,
            });
        }
        let _ = ctx.events.send(BatchEvent::Finished {
            job_id,
            status,
            result,
            error,
        });
    }
}

/// Move every still-queued job straight to Cancelled, emitting its final
/// event. Used by `cancel` and by the supervisor's closing sweep.
fn cancel_queued_jobs(jobs: &Mutex<Vec<JobRecord>>, events: &UnboundedSender<BatchEvent>) {
    if let Ok(mut jobs) = jobs.lock() {
        for job in jobs.iter_mut().filter(|j| j.status == JobStatus::Queued) {
            job.transition(JobStatus::Cancelled);
            let _ = events.send(BatchEvent::Finished {
                job_id: job.id.clone(),
                status: JobStatus::Cancelled,
                result: None,
                error: None,
            });
        }
    }
}

/// Handle to a running batch session.
pub struct BatchHandle {
    jobs: Arc<Mutex<Vec<JobRecord>>>,
    cancelled: Arc<AtomicBool>,
    events: UnboundedSender<BatchEvent>,
    supervisor: JoinHandle<()>,
}

impl BatchHandle {
    /// Cooperative cancellation: queued jobs never start, running jobs
    /// stop at their next checkpoint. Never interrupts an in-flight
    /// provider call.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("batch cancel requested");
        cancel_queued_jobs(&self.jobs, &self.events);
    }

    /// Detached canceller for callers that hand the handle off to a
    /// waiting task.
    pub fn canceller(&self) -> BatchCanceller {
        BatchCanceller {
            jobs: self.jobs.clone(),
            cancelled: self.cancelled.clone(),
            events: self.events.clone(),
        }
    }

    /// Batch-level progress in [0, 100]: mean of per-job progress with
    /// terminal jobs counted as 100.
    pub fn progress(&self) -> f32 {
        match self.jobs.lock() {
            Ok(jobs) if !jobs.is_empty() => {
                let total: u32 = jobs.iter().map(|j| j.effective_progress() as u32).sum();
                total as f32 / jobs.len() as f32
            }
            _ => 0.0,
        }
    }

    /// Consistent snapshot of every job.
    pub fn snapshot(&self) -> Vec<JobSnapshot> {
        match self.jobs.lock() {
            Ok(jobs) => jobs.iter().map(|j| j.snapshot()).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        match self.jobs.lock() {
            Ok(jobs) => jobs.iter().all(|j| j.status.is_terminal()),
            Err(_) => false,
        }
    }

    /// Wait until every job is terminal and return the final report.
    pub async fn wait(self) -> BatchSummary {
        let _ = self.supervisor.await;
        match self.jobs.lock() {
            Ok(jobs) => BatchSummary::from_jobs(&jobs),
            Err(_) => BatchSummary {
                jobs: Vec::new(),
                succeeded: 0,
                failed: 0,
                cancelled: 0,
            },
        }
    }
}

/// Clonable cancellation trigger for a batch session.
#[derive(Clone)]
pub struct BatchCanceller {
    jobs: Arc<Mutex<Vec<JobRecord>>>,
    cancelled: Arc<AtomicBool>,
    events: UnboundedSender<BatchEvent>,
}

impl BatchCanceller {
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("batch cancel requested");
        cancel_queued_jobs(&self.jobs, &self.events);
    }
}
