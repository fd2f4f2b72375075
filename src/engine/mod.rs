//! Preparation step in front of the converter.
//!
//! The scene engine turns a start request into the converter's command line
//! and, once the user confirms, registers the scenario set the generated files
//! belong to. The service only depends on the [`SceneEngine`] trait; the
//! arguments travel as a single comma-separated string.

use parking_lot::Mutex;
use scenegen_common::{ConversionParams, Error, Result};
use std::path::PathBuf;

use crate::config::SemanticConfig;

/// Preparation engine consumed by the semantic coordinator.
pub trait SceneEngine: Send + Sync {
    /// Build the converter argument list for a request, comma-separated.
    fn prepare_conversion(&self, params: &ConversionParams) -> Result<String>;

    /// Create the scenario set named by the last prepared request and return its name.
    fn create_scenario_set(&self) -> Result<String>;
}

/// Split a prepared argument string into individual arguments.
pub fn split_arguments(prepared: &str) -> Vec<String> {
    prepared
        .split(',')
        .map(str::trim)
        .filter(|arg| !arg.is_empty())
        .map(str::to_string)
        .collect()
}

fn flag(name: &str, value: impl std::fmt::Display) -> String {
    format!("--{}={}", name, value)
}

/// Engine that builds converter arguments from the configured directories.
pub struct LocalSceneEngine {
    output_dir: PathBuf,
    catalogs_dir: PathBuf,
    hadmap_dir: PathBuf,
    pending_set: Mutex<Option<String>>,
}

impl LocalSceneEngine {
    pub fn new(config: &SemanticConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            catalogs_dir: config.catalogs_dir.clone(),
            hadmap_dir: config.hadmap_dir.clone(),
            pending_set: Mutex::new(None),
        }
    }

    /// Name remembered from the last prepared request, if any.
    pub fn pending_set(&self) -> Option<String> {
        self.pending_set.lock().clone()
    }
}

impl SceneEngine for LocalSceneEngine {
    fn prepare_conversion(&self, params: &ConversionParams) -> Result<String> {
        params.validate()?;

        let mut args = vec![
            flag("input_mode", "excel"),
            flag("input_data", &params.file_path),
            flag("pathdir_output", self.output_dir.display()),
            flag("pathdir_catalogs", self.catalogs_dir.display()),
        ];
        if params.map_type != 0 {
            args.push(flag("pathdir_hadmap", self.hadmap_dir.display()));
        }
        args.push(flag("producer_mode", "desktop"));

        let set_name = params.scenarios_set.trim();
        *self.pending_set.lock() = (!set_name.is_empty()).then(|| set_name.to_string());

        let prepared = args.join(",");
        tracing::debug!("Prepared converter arguments: {}", prepared);
        Ok(prepared)
    }

    fn create_scenario_set(&self) -> Result<String> {
        let name = self
            .pending_set()
            .ok_or_else(|| Error::engine("no scenario set was named by the last start request"))?;

        let set_dir = self.output_dir.join(&name);
        std::fs::create_dir_all(&set_dir)?;
        tracing::info!("Created scenario set '{}' at {:?}", name, set_dir);
        Ok(name)
    }
}
