//! Scenegen-Common: Shared types and errors for the semantic-generation service.
//!
//! This crate provides the pieces that both the service and anything talking
//! to it (the converter's supervisor, UI clients) agree on:
//!
//! - **Job Types**: [`JobStatus`] and the converter's [`ReportPhase`]
//! - **Wire Payloads**: request and reply bodies of the semantic endpoints
//! - **Error Handling**: Common error type and result alias
//!
//! # Examples
//!
//! ```
//! use scenegen_common::{JobStatus, StatusReport, ReportPhase};
//!
//! let report: StatusReport = serde_json::from_str(
//!     r#"{"taskGenStatus":4,"taskAllCount":10,"taskNonCount":2,"taskFinishedCount":0,"dir":"/out"}"#,
//! ).unwrap();
//! assert_eq!(report.phase(), ReportPhase::Ready);
//! assert_eq!(JobStatus::Running.code(), 1);
//! ```

pub mod error;
pub mod types;
pub mod wire;

pub use error::{Error, Result};
pub use types::*;
pub use wire::*;
