use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub semantic: SemanticConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    9000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Settings for the semantic-generation coordinator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SemanticConfig {
    /// Application install directory; the converter ships under
    /// `service/excel2asam/` inside it.
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,

    /// Explicit converter executable, overriding the install-dir layout.
    #[serde(default)]
    pub converter: Option<PathBuf>,

    /// Where generated scenario files land (`--pathdir_output`).
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Scenario catalogs passed to the converter (`--pathdir_catalogs`).
    #[serde(default = "default_catalogs_dir")]
    pub catalogs_dir: PathBuf,

    /// HD map library, only passed for map-based requests (`--pathdir_hadmap`).
    #[serde(default = "default_hadmap_dir")]
    pub hadmap_dir: PathBuf,

    /// How long a start request waits for the converter's first report.
    #[serde(default = "default_start_timeout")]
    pub start_timeout_secs: u64,

    /// Grace period between SIGTERM and a hard kill when stopping the converter.
    #[serde(default = "default_stop_grace")]
    pub stop_grace_secs: u64,

    #[serde(default)]
    pub wake_policy: WakePolicy,
}

fn default_install_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./scenarios")
}

fn default_catalogs_dir() -> PathBuf {
    PathBuf::from("./catalogs")
}

fn default_hadmap_dir() -> PathBuf {
    PathBuf::from("./hadmap")
}

fn default_start_timeout() -> u64 {
    20
}

fn default_stop_grace() -> u64 {
    5
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            converter: None,
            output_dir: default_output_dir(),
            catalogs_dir: default_catalogs_dir(),
            hadmap_dir: default_hadmap_dir(),
            start_timeout_secs: default_start_timeout(),
            stop_grace_secs: default_stop_grace(),
            wake_policy: WakePolicy::default(),
        }
    }
}

impl SemanticConfig {
    /// Resolved converter executable.
    pub fn converter_path(&self) -> PathBuf {
        if let Some(ref converter) = self.converter {
            return converter.clone();
        }
        let exe = if cfg!(windows) {
            "excel2asam.exe"
        } else {
            "excel2asam"
        };
        self.install_dir
            .join("service")
            .join("excel2asam")
            .join(exe)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }
}

/// When a blocked start request is released by converter reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WakePolicy {
    /// The first report (or stop) after the start wakes the request.
    #[default]
    FirstReport,
    /// Progress reports are skipped until the job reaches a terminal outcome.
    Terminal,
}
