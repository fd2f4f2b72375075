//! Semantic scenario generation.
//!
//! The conversion itself runs in an external executable. This module manages
//! that process and the job record shared by the requests that drive it:
//!
//! - `start` launches the converter and waits, bounded by a deadline, for the
//!   converter's supervisor to report back
//! - `report` is the supervisor's callback; its reply tells the converter
//!   whether to wait, proceed, or exit
//! - `generate` confirms the job so the converter proceeds
//! - `progress` and `stop` poll and cancel without waiting
//!
//! Only one job exists at a time. Its state lives in a [`JobTracker`] and the
//! converter in a [`ProcessHandle`], both owned by the [`SemanticCoordinator`].

mod coordinator;
pub mod job;
pub mod process;

pub use coordinator::SemanticCoordinator;
pub use job::{percent_complete, JobSnapshot, JobTracker, WaitOutcome, WaitTicket};
pub use process::{locate_executable, ProcessError, ProcessHandle, StartOutcome, StopOutcome};
