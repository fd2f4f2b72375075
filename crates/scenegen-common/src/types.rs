//! Job status and converter report phases.
//!
//! The numeric codes are part of the wire protocol: the converter reads the
//! job status code from every callback reply to decide whether to wait,
//! proceed, or exit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the single semantic-generation job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// No confirmed job; a freshly started converter waits in this state.
    #[default]
    Idle,
    /// Generation was confirmed and the converter should proceed.
    Running,
    /// Stopped by a client or failed by a converter report.
    Terminated,
}

impl JobStatus {
    /// Wire code of this status.
    pub fn code(self) -> i32 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Terminated => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Terminated
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// Phase carried in a converter callback (`taskGenStatus`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportPhase {
    /// Scenario files are being written (`0`).
    Generating,
    /// The converter gave up (`2`).
    Failed,
    /// Inputs were parsed and counted; waiting for confirmation (`4`).
    Ready,
    /// Any code the service does not know about.
    Unknown(i32),
}

impl ReportPhase {
    pub fn code(self) -> i32 {
        match self {
            Self::Generating => 0,
            Self::Failed => 2,
            Self::Ready => 4,
            Self::Unknown(code) => code,
        }
    }

    pub fn is_failure(self) -> bool {
        self == Self::Failed
    }
}

impl From<i32> for ReportPhase {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Generating,
            2 => Self::Failed,
            4 => Self::Ready,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for ReportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generating => write!(f, "generating"),
            Self::Failed => write!(f, "failed"),
            Self::Ready => write!(f, "ready"),
            Self::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}
