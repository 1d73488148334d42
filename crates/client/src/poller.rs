//! Cancellable job status polling.
//!
//! [`StatusPoller::watch`] spawns one task per job. The task fetches the
//! job immediately and then on a fixed cadence until the job finishes,
//! the service gives an answer that asking again cannot change (unknown
//! job, rejected request, unreadable snapshot), or the [`Watch`] is
//! cancelled. Only transport failures are retried.
//!
//! Only one fetch is ever outstanding for a watch. Ticks that elapse
//! while a fetch is pending are skipped, so a slow service slows the
//! watch down instead of building up a backlog of requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use cellflow_core::result_set::ResultSet;
use cellflow_core::workflow::{reconcile_snapshot, WorkflowRecord};

use crate::api::ServiceApiError;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::service::WorkflowService;

/// Events buffered between the poll task and its [`Watch`].
const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Timing for one watch.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between fetch starts.
    pub interval: Duration,
    /// Upper bound for a single fetch.
    pub request_timeout: Duration,
    pub channel_capacity: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for PollConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval,
            request_timeout: config.request_timeout,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// What a watch reports.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// A non-terminal snapshot.
    Snapshot(WorkflowRecord),
    /// The terminal snapshot. Nothing follows it.
    Finished(WorkflowRecord),
    /// A fetch failed but the watch keeps going.
    Retrying(ClientError),
    /// The watch stopped on an unrecoverable error.
    Fatal(ClientError),
}

impl PollEvent {
    /// `true` for events after which the watch produces nothing more.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Finished(_) | Self::Fatal(_))
    }
}

/// Follows submitted jobs until they reach a terminal status.
pub struct StatusPoller<S> {
    service: Arc<S>,
    config: PollConfig,
}

impl<S: WorkflowService + 'static> StatusPoller<S> {
    pub fn new(service: Arc<S>, config: PollConfig) -> Self {
        Self { service, config }
    }

    /// Start following `job_id`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn watch(&self, job_id: impl Into<String>) -> Watch {
        let job_id = job_id.into();
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));

        tracing::info!(
            job_id = %job_id,
            interval_ms = self.config.interval.as_millis() as u64,
            "Watching workflow",
        );

        let task = tokio::spawn(run_watch(
            Arc::clone(&self.service),
            job_id.clone(),
            self.config.clone(),
            cancel.clone(),
            tx,
        ));

        Watch {
            job_id,
            cancel,
            task: Some(task),
            events: rx,
            latest: None,
        }
    }

    /// Fetch the job once, outside any watch. Backs a manual refresh.
    pub async fn fetch_once(&self, job_id: &str) -> Result<WorkflowRecord, ClientError> {
        fetch_record(self.service.as_ref(), job_id, self.config.request_timeout).await
    }
}

/// One active polling session for a single job.
///
/// Dropping the watch cancels it.
pub struct Watch {
    job_id: String,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    events: mpsc::Receiver<PollEvent>,
    latest: Option<WorkflowRecord>,
}

impl Watch {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the watch has finished or been cancelled.
    pub async fn next(&mut self) -> Option<PollEvent> {
        if self.cancel.is_cancelled() {
            self.cancel();
            return None;
        }

        let event = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        };

        match event {
            Some(event) => {
                if let PollEvent::Snapshot(record) | PollEvent::Finished(record) = &event {
                    self.latest = Some(record.clone());
                }
                Some(event)
            }
            None => {
                if self.cancel.is_cancelled() {
                    self.cancel();
                }
                None
            }
        }
    }

    /// Stop the watch. Idempotent.
    ///
    /// An in-flight fetch is abandoned and buffered events are discarded.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(job_id = %self.job_id, "Watch cancelled");
        }
        self.events.close();
        while self.events.try_recv().is_ok() {}
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A token that cancels this watch from elsewhere, e.g. a signal handler.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The most recent snapshot delivered by [`Watch::next`].
    pub fn latest(&self) -> Option<&WorkflowRecord> {
        self.latest.as_ref()
    }

    /// Results of the most recent snapshot, rebuilt from scratch and
    /// referenced under the watched job id.
    pub fn result_set(&self) -> Option<ResultSet> {
        self.latest
            .as_ref()
            .map(|record| ResultSet::for_job(self.job_id.as_str(), record))
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ---- poll task ----

async fn run_watch<S: WorkflowService + ?Sized>(
    service: Arc<S>,
    job_id: String,
    config: PollConfig,
    cancel: CancellationToken,
    tx: mpsc::Sender<PollEvent>,
) {
    let mut previous: Option<WorkflowRecord> = None;
    let mut tick = Instant::now();

    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = fetch_record(service.as_ref(), &job_id, config.request_timeout) => outcome,
        };

        let event = match outcome {
            Ok(record) => match reconcile_snapshot(previous.as_ref(), record) {
                Ok(record) => {
                    previous = Some(record.clone());
                    if record.is_terminal() {
                        tracing::info!(
                            job_id = %job_id,
                            status = %record.status,
                            "Workflow reached a terminal status",
                        );
                        Some(PollEvent::Finished(record))
                    } else {
                        Some(PollEvent::Snapshot(record))
                    }
                }
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "Dropping out-of-order snapshot");
                    None
                }
            },
            Err(e @ ClientError::JobNotFound(_)) => {
                tracing::warn!(job_id = %job_id, "Workflow not found, stopping watch");
                Some(PollEvent::Fatal(e))
            }
            Err(e) if !e.is_retryable() => {
                tracing::error!(job_id = %job_id, error = %e, "Unusable status reply, stopping watch");
                Some(PollEvent::Fatal(e))
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Status fetch failed, will retry");
                Some(PollEvent::Retrying(e))
            }
        };

        if let Some(event) = event {
            let stop = event.is_final();
            let delivered = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                sent = tx.send(event) => sent.is_ok(),
            };
            if !delivered || stop {
                break;
            }
        }

        tick = next_tick_after(tick, config.interval, Instant::now());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep_until(tick) => {}
        }
    }

    tracing::debug!(job_id = %job_id, "Poll task stopped");
}

async fn fetch_record<S: WorkflowService + ?Sized>(
    service: &S,
    job_id: &str,
    timeout: Duration,
) -> Result<WorkflowRecord, ClientError> {
    match tokio::time::timeout(timeout, service.fetch_workflow(job_id)).await {
        Ok(Ok(record)) => Ok(record),
        Ok(Err(e)) => Err(poll_error(job_id, e)),
        Err(_) => Err(ClientError::Transport(format!(
            "status request timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

fn poll_error(job_id: &str, err: ServiceApiError) -> ClientError {
    if err.is_not_found() {
        return ClientError::JobNotFound(job_id.to_string());
    }
    match err {
        ServiceApiError::Decode(msg) => ClientError::ServiceRejected(msg),
        e @ ServiceApiError::Status { .. } if !e.is_server_error() => {
            ClientError::ServiceRejected(e.to_string())
        }
        e => ClientError::Transport(e.to_string()),
    }
}

/// The first tick of the `last + k * period` schedule that is not
/// already in the past.
fn next_tick_after(last: Instant, period: Duration, now: Instant) -> Instant {
    let mut next = last + period;
    if period.is_zero() {
        return next.max(now);
    }
    while next < now {
        next += period;
    }
    next
}
