//! JSON bodies exchanged on the semantic endpoints.
//!
//! Field names follow the existing web client and converter, so they are
//! camelCase on the wire.

use crate::{Error, ReportPhase, Result};
use serde::{Deserialize, Serialize};

/// Message sent with every generic failure reply.
pub const GENERATION_FAILED: &str = "Semantic generation failed";

/// Parameters of a start request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionParams {
    /// Spreadsheet describing the scenarios to generate.
    pub file_path: String,

    /// Non-zero when the scenarios should be generated against the HD map library.
    #[serde(default)]
    pub map_type: i32,

    /// Name of the scenario set created once generation is confirmed.
    #[serde(default)]
    pub scenarios_set: String,
}

impl ConversionParams {
    /// Decode and validate a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let params: Self = serde_json::from_slice(body)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.file_path.trim().is_empty() {
            return Err(Error::invalid_input("filePath cannot be empty"));
        }
        if self.file_path.contains(',') {
            // The preparation step hands arguments over as a comma-separated list.
            return Err(Error::invalid_input("filePath cannot contain ','"));
        }
        if self.scenarios_set.contains(|c| c == '/' || c == '\\') {
            return Err(Error::invalid_input(
                "scenariosSet cannot contain path separators",
            ));
        }
        Ok(())
    }
}

/// Progress report posted by the converter's supervisor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusReport {
    pub task_gen_status: i32,
    pub task_all_count: u64,
    pub task_non_count: u64,
    pub task_finished_count: u64,
    pub dir: String,
}

impl StatusReport {
    pub fn phase(&self) -> ReportPhase {
        ReportPhase::from(self.task_gen_status)
    }
}

/// Reply body shared by all semantic endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReply {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_scenarios_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gen_scenarios_count: Option<u64>,
}

impl ApiReply {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            dir: None,
            non_scenarios_count: None,
            gen_scenarios_count: None,
        }
    }

    /// `{code: 0, message: "ok"}`
    pub fn ok() -> Self {
        Self::new(0, "ok")
    }

    /// `{code: -1, message: "Semantic generation failed"}`
    pub fn failed() -> Self {
        Self::new(-1, GENERATION_FAILED)
    }

    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn with_counts(mut self, non_scenarios: u64, gen_scenarios: u64) -> Self {
        self.non_scenarios_count = Some(non_scenarios);
        self.gen_scenarios_count = Some(gen_scenarios);
        self
    }
}
