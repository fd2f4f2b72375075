//! Shared state of the semantic-generation job.
//!
//! A single [`JobTracker`] owns the job fields behind one lock. Every report
//! or stop bumps an epoch under that lock and wakes all waiters; a waiter
//! registers for the wake-up before it inspects the epoch, so an update that
//! lands between the check and the wait is never lost.

use parking_lot::Mutex;
use scenegen_common::{JobStatus, ReportPhase, StatusReport};
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::config::WakePolicy;

/// Copy of the job fields taken under the lock.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub total_count: u64,
    pub remaining_count: u64,
    pub finished_count: u64,
    pub output_dir: String,
    pub percent_complete: f64,
}

/// Result of waiting for the converter.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// A report or stop released the waiter; fields as of that moment.
    Woken(JobSnapshot),
    /// Nothing qualifying arrived before the deadline.
    TimedOut,
}

/// Position in the update sequence, taken when a start request resets the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTicket(u64);

#[derive(Debug, Default)]
struct JobState {
    status: JobStatus,
    total_count: u64,
    remaining_count: u64,
    finished_count: u64,
    output_dir: String,
    percent_complete: f64,
    last_phase: Option<ReportPhase>,
    epoch: u64,
}

impl JobState {
    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            status: self.status,
            total_count: self.total_count,
            remaining_count: self.remaining_count,
            finished_count: self.finished_count,
            output_dir: self.output_dir.clone(),
            percent_complete: self.percent_complete,
        }
    }

    fn reached_outcome(&self, policy: WakePolicy) -> bool {
        match policy {
            WakePolicy::FirstReport => true,
            WakePolicy::Terminal => {
                self.status.is_terminal()
                    || match self.last_phase {
                        Some(ReportPhase::Ready) | Some(ReportPhase::Failed) => true,
                        Some(ReportPhase::Generating) => {
                            self.total_count > 0 && self.finished_count >= self.total_count
                        }
                        _ => false,
                    }
            }
        }
    }
}

/// Fraction of finished work, rounded to one decimal.
pub fn percent_complete(finished: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    let fraction = finished as f64 / total as f64;
    ((fraction * 10.0).round() / 10.0).min(1.0)
}

/// Lock-protected job record plus its wake-up signal.
#[derive(Debug, Default)]
pub struct JobTracker {
    state: Mutex<JobState>,
    changed: Notify,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.state.lock().snapshot()
    }

    /// Prepare for a fresh run: back to idle with cleared counts.
    ///
    /// The returned ticket marks the update sequence at reset time; only
    /// updates after it release [`wait_for_outcome`](Self::wait_for_outcome).
    /// The percentage keeps its previous value until the first report.
    pub fn reset(&self) -> WaitTicket {
        let mut state = self.state.lock();
        state.status = JobStatus::Idle;
        state.total_count = 0;
        state.remaining_count = 0;
        state.finished_count = 0;
        state.last_phase = None;
        WaitTicket(state.epoch)
    }

    /// Mark the job as confirmed so the converter proceeds.
    pub fn confirm(&self) -> JobSnapshot {
        let mut state = self.state.lock();
        state.status = JobStatus::Running;
        state.snapshot()
    }

    /// Record a converter report and wake every waiter.
    pub fn apply_report(&self, report: &StatusReport) -> JobSnapshot {
        let snapshot = {
            let mut state = self.state.lock();
            let phase = report.phase();
            state.total_count = report.task_all_count;
            state.remaining_count = report.task_non_count;
            state.finished_count = report.task_finished_count;
            state.output_dir = report.dir.clone();
            state.percent_complete =
                percent_complete(report.task_finished_count, report.task_all_count);
            if phase.is_failure() {
                state.status = JobStatus::Terminated;
            }
            state.last_phase = Some(phase);
            state.epoch += 1;
            state.snapshot()
        };
        self.changed.notify_waiters();
        snapshot
    }

    /// Force the job into the terminal state and wake every waiter.
    pub fn terminate(&self) -> JobSnapshot {
        let snapshot = {
            let mut state = self.state.lock();
            state.status = JobStatus::Terminated;
            state.epoch += 1;
            state.snapshot()
        };
        self.changed.notify_waiters();
        snapshot
    }

    /// Progress for display; a terminated job always reads as complete.
    pub fn progress(&self) -> f64 {
        let state = self.state.lock();
        if state.status.is_terminal() {
            1.0
        } else {
            state.percent_complete
        }
    }

    /// Wait until an update after `ticket` satisfies `policy`, or `deadline` passes.
    pub async fn wait_for_outcome(
        &self,
        ticket: WaitTicket,
        policy: WakePolicy,
        deadline: Instant,
    ) -> WaitOutcome {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.state.lock();
                if state.epoch != ticket.0 && state.reached_outcome(policy) {
                    return WaitOutcome::Woken(state.snapshot());
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return WaitOutcome::TimedOut;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn after_secs(secs: u64) -> Instant {
        Instant::now() + Duration::from_secs(secs)
    }

    fn after_millis(millis: u64) -> Instant {
        Instant::now() + Duration::from_millis(millis)
    }

    fn report(status: i32, all: u64, non: u64, finished: u64) -> StatusReport {
        StatusReport {
            task_gen_status: status,
            task_all_count: all,
            task_non_count: non,
            task_finished_count: finished,
            dir: "/out".to_string(),
        }
    }

    #[test]
    fn test_percent_complete() {
        assert_eq!(percent_complete(0, 0), 1.0);
        assert_eq!(percent_complete(0, 10), 0.0);
        assert_eq!(percent_complete(3, 10), 0.3);
        assert_eq!(percent_complete(1, 3), 0.3);
        assert_eq!(percent_complete(2, 3), 0.7);
        assert_eq!(percent_complete(10, 10), 1.0);
        assert_eq!(percent_complete(12, 10), 1.0);
    }

    #[test]
    fn test_reset_keeps_percent_and_dir() {
        let tracker = JobTracker::new();
        tracker.apply_report(&report(0, 10, 0, 5));
        tracker.reset();

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, JobStatus::Idle);
        assert_eq!(snapshot.total_count, 0);
        assert_eq!(snapshot.remaining_count, 0);
        assert_eq!(snapshot.output_dir, "/out");
        assert_eq!(snapshot.percent_complete, 0.5);
    }

    #[test]
    fn test_failure_report_terminates() {
        let tracker = JobTracker::new();
        tracker.confirm();
        let snapshot = tracker.apply_report(&report(2, 10, 10, 0));
        assert_eq!(snapshot.status, JobStatus::Terminated);
        // Terminated reads as complete for display.
        assert_eq!(tracker.progress(), 1.0);
    }

    #[test]
    fn test_progress_report_keeps_status() {
        let tracker = JobTracker::new();
        tracker.confirm();
        let snapshot = tracker.apply_report(&report(0, 10, 0, 4));
        assert_eq!(snapshot.status, JobStatus::Running);
        assert_eq!(tracker.progress(), 0.4);
    }

    #[test]
    fn test_progress_monotonic_for_increasing_reports() {
        let tracker = JobTracker::new();
        let mut last = 0.0;
        for finished in 0..=17 {
            tracker.apply_report(&report(0, 17, 0, finished));
            let progress = tracker.progress();
            assert!(progress >= last, "{} < {}", progress, last);
            last = progress;
        }
        assert_eq!(last, 1.0);
    }

    #[tokio::test]
    async fn test_wait_times_out_without_reports() {
        tokio::time::pause();
        let tracker = JobTracker::new();
        let ticket = tracker.reset();

        let started = Instant::now();
        let outcome = tracker
            .wait_for_outcome(ticket, WakePolicy::FirstReport, after_secs(20))
            .await;

        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(started.elapsed() >= Duration::from_secs(20));
        assert!(started.elapsed() < Duration::from_secs(21));
    }

    #[tokio::test]
    async fn test_report_before_wait_is_not_lost() {
        let tracker = JobTracker::new();
        let ticket = tracker.reset();
        tracker.apply_report(&report(4, 8, 1, 0));

        let outcome = tracker
            .wait_for_outcome(ticket, WakePolicy::FirstReport, after_millis(50))
            .await;
        match outcome {
            WaitOutcome::Woken(snapshot) => {
                assert_eq!(snapshot.total_count, 8);
                assert_eq!(snapshot.remaining_count, 1);
            }
            WaitOutcome::TimedOut => panic!("report before waiting was lost"),
        }
    }

    #[tokio::test]
    async fn test_report_wakes_waiter() {
        let tracker = Arc::new(JobTracker::new());
        let ticket = tracker.reset();

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                tracker
                    .wait_for_outcome(ticket, WakePolicy::FirstReport, after_secs(5))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        tracker.apply_report(&report(4, 10, 2, 0));

        let outcome = waiter.await.unwrap();
        assert_eq!(
            outcome,
            WaitOutcome::Woken(JobSnapshot {
                status: JobStatus::Idle,
                total_count: 10,
                remaining_count: 2,
                finished_count: 0,
                output_dir: "/out".to_string(),
                percent_complete: 0.0,
            })
        );
    }

    #[tokio::test]
    async fn test_stop_wakes_all_waiters() {
        let tracker = Arc::new(JobTracker::new());
        let ticket = tracker.reset();

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    tracker
                        .wait_for_outcome(ticket, WakePolicy::FirstReport, after_secs(5))
                        .await
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        tracker.terminate();

        for waiter in waiters {
            match waiter.await.unwrap() {
                WaitOutcome::Woken(snapshot) => assert_eq!(snapshot.status, JobStatus::Terminated),
                WaitOutcome::TimedOut => panic!("stop did not wake a waiter"),
            }
        }
    }

    #[tokio::test]
    async fn test_updates_before_reset_do_not_wake() {
        let tracker = JobTracker::new();
        tracker.apply_report(&report(4, 3, 0, 0));
        let ticket = tracker.reset();

        let outcome = tracker
            .wait_for_outcome(ticket, WakePolicy::FirstReport, after_millis(30))
            .await;
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_terminal_policy_skips_progress() {
        let tracker = Arc::new(JobTracker::new());
        let ticket = tracker.reset();

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                tracker
                    .wait_for_outcome(ticket, WakePolicy::Terminal, after_secs(5))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        tracker.apply_report(&report(0, 10, 0, 3));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        tracker.apply_report(&report(0, 10, 0, 10));
        match waiter.await.unwrap() {
            WaitOutcome::Woken(snapshot) => assert_eq!(snapshot.finished_count, 10),
            WaitOutcome::TimedOut => panic!("finished report did not wake"),
        }
    }

    #[tokio::test]
    async fn test_terminal_policy_still_bounded() {
        tokio::time::pause();
        let tracker = Arc::new(JobTracker::new());
        let ticket = tracker.reset();
        tracker.apply_report(&report(0, 10, 0, 1));

        let outcome = tracker
            .wait_for_outcome(ticket, WakePolicy::Terminal, after_secs(20))
            .await;
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_concurrent_reports_never_tear() {
        let tracker = Arc::new(JobTracker::new());
        let writers: Vec<_> = (1..=8u64)
            .map(|n| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    for _ in 0..200 {
                        tracker.apply_report(&StatusReport {
                            task_gen_status: 0,
                            task_all_count: n * 10,
                            task_non_count: n,
                            task_finished_count: n * 5,
                            dir: format!("/out/{}", n),
                        });
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for _ in 0..500 {
            let s = tracker.snapshot();
            if s.total_count == 0 {
                continue;
            }
            let n = s.remaining_count;
            assert_eq!(s.total_count, n * 10);
            assert_eq!(s.finished_count, n * 5);
            assert_eq!(s.output_dir, format!("/out/{}", n));
            assert_eq!(s.percent_complete, 0.5);
            tokio::task::yield_now().await;
        }

        for writer in writers {
            writer.await.unwrap();
        }
    }
}
