//! Orchestration of one semantic-generation job across independent requests.

use scenegen_common::{ApiReply, ConversionParams, StatusReport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use super::job::{JobTracker, WaitOutcome};
use super::process::{ProcessError, ProcessHandle, StartOutcome};
use crate::config::{SemanticConfig, WakePolicy};
use crate::engine::{split_arguments, SceneEngine};

/// Coordinator for the single semantic-generation job.
///
/// A start request launches the converter and blocks until the converter's
/// supervisor reports back through [`report`](Self::report) or the start
/// deadline passes. Progress and stop requests only touch the job record.
pub struct SemanticCoordinator {
    jobs: JobTracker,
    process: ProcessHandle,
    engine: Arc<dyn SceneEngine>,
    converter: PathBuf,
    start_timeout: Duration,
    wake_policy: WakePolicy,
}

impl SemanticCoordinator {
    pub fn new(config: &SemanticConfig, engine: Arc<dyn SceneEngine>) -> Self {
        Self {
            jobs: JobTracker::new(),
            process: ProcessHandle::new(config.stop_grace()),
            engine,
            converter: config.converter_path(),
            start_timeout: config.start_timeout(),
            wake_policy: config.wake_policy,
        }
    }

    pub fn jobs(&self) -> &JobTracker {
        &self.jobs
    }

    pub fn process(&self) -> &ProcessHandle {
        &self.process
    }

    pub fn converter(&self) -> &Path {
        &self.converter
    }

    /// Launch a conversion and wait for the converter's first outcome.
    pub async fn start(&self, params: &ConversionParams) -> ApiReply {
        let run_id = Uuid::new_v4();
        self.run_start(params)
            .instrument(tracing::info_span!("semantic_start", %run_id))
            .await
    }

    async fn run_start(&self, params: &ConversionParams) -> ApiReply {
        let deadline = Instant::now() + self.start_timeout;
        info!("Starting semantic generation for {}", params.file_path);

        let prepared = match self.engine.prepare_conversion(params) {
            Ok(prepared) => prepared,
            Err(e) => {
                error!("Failed to prepare converter arguments: {}", e);
                return ApiReply::failed();
            }
        };
        let args = split_arguments(&prepared);

        // Taken before the converter exists, so its first report cannot be missed.
        let ticket = self.jobs.reset();

        match tokio::time::timeout_at(deadline, self.relaunch(&args)).await {
            Ok(Ok(outcome)) => debug!("Converter launch: {:?}", outcome),
            Ok(Err(e)) => {
                error!("Failed to start converter: {}", e);
                return ApiReply::failed();
            }
            Err(_) => {
                warn!(
                    "Previous converter still stopping after {:?}; not relaunched",
                    self.start_timeout
                );
                return ApiReply::failed();
            }
        }

        // A failure report or a stop also lands here; the caller reads the
        // terminal state through the progress endpoint.
        match self
            .jobs
            .wait_for_outcome(ticket, self.wake_policy, deadline)
            .await
        {
            WaitOutcome::Woken(job) => {
                info!(
                    "Converter reported {} scenarios ({} not generated), job {}",
                    job.total_count, job.remaining_count, job.status
                );
                ApiReply::ok().with_counts(job.remaining_count, job.total_count)
            }
            WaitOutcome::TimedOut => {
                warn!(
                    "No converter report within {:?}; converter left running",
                    self.start_timeout
                );
                ApiReply::failed()
            }
        }
    }

    /// Replace any previous converter with a fresh one.
    async fn relaunch(&self, args: &[String]) -> Result<StartOutcome, ProcessError> {
        match self.process.stop().await {
            Ok(outcome) => debug!("Previous converter: {:?}", outcome),
            Err(e) => warn!("Failed to stop previous converter: {}", e),
        }
        self.process.start(&self.converter, args).await
    }

    /// Confirm the prepared job and create its scenario set.
    pub fn generate(&self) -> ApiReply {
        let job = self.jobs.confirm();
        match self.engine.create_scenario_set() {
            Ok(name) => {
                info!("Semantic generation confirmed for scenario set '{}'", name);
                ApiReply::ok().with_dir(job.output_dir)
            }
            Err(e) => {
                error!("Failed to create scenario set: {}", e);
                ApiReply::failed()
            }
        }
    }

    /// Record a report from the converter's supervisor.
    ///
    /// The reply code tells the converter what to do next: the job status
    /// code, or `-1` when the report itself was a failure.
    pub fn report(&self, report: &StatusReport) -> ApiReply {
        let phase = report.phase();
        let job = self.jobs.apply_report(report);
        info!(
            "Converter report: phase={} total={} remaining={} finished={} dir={}",
            phase,
            report.task_all_count,
            report.task_non_count,
            report.task_finished_count,
            report.dir
        );

        if phase.is_failure() {
            ApiReply::failed()
        } else {
            ApiReply::new(job.status.code(), "ok")
        }
    }

    /// Current progress as a three-decimal fraction.
    pub fn progress(&self) -> ApiReply {
        ApiReply::new(0, format!("{:.3}", self.jobs.progress()))
    }

    /// Mark the job terminated. The converter exits when it next reports;
    /// the process itself is reconciled by the next start.
    pub fn stop(&self) -> ApiReply {
        let job = self.jobs.terminate();
        info!("Semantic generation stopped by client");
        ApiReply::ok().with_dir(job.output_dir)
    }

    /// Stop the converter process, if one is running.
    pub async fn shutdown(&self) {
        match self.process.stop().await {
            Ok(outcome) => debug!("Converter on shutdown: {:?}", outcome),
            Err(e) => warn!("Failed to stop converter on shutdown: {}", e),
        }
    }
}
