//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds an [`AppContext`] whose converter is
//! `/bin/sh` running a short script, so start requests launch a real process
//! that never reports back on its own. The [`with_server`] constructor starts
//! Axum on a random port for tests that need two requests in flight at once.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use http_body_util::BodyExt;
use scenegen::config::{Config, WakePolicy};
use scenegen::engine::SceneEngine;
use scenegen::server::{create_router, AppContext};
use scenegen_common::{ApiReply, ConversionParams, Result};
use tempfile::TempDir;

/// Engine that hands the converter a fixed `sh -c` script.
pub struct ScriptEngine {
    script: String,
}

impl ScriptEngine {
    pub fn new(script: &str) -> Self {
        Self {
            script: script.to_string(),
        }
    }
}

impl SceneEngine for ScriptEngine {
    fn prepare_conversion(&self, params: &ConversionParams) -> Result<String> {
        params.validate()?;
        Ok(format!("-c,{}", self.script))
    }

    fn create_scenario_set(&self) -> Result<String> {
        Ok("test-set".to_string())
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub dir: TempDir,
}

impl TestHarness {
    /// Harness with a 2 second start deadline and first-report wake-ups.
    pub fn new() -> Self {
        Self::with_options(2, WakePolicy::FirstReport)
    }

    pub fn with_options(start_timeout_secs: u64, wake_policy: WakePolicy) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = Config::default();
        config.semantic.converter = Some(PathBuf::from("/bin/sh"));
        config.semantic.output_dir = dir.path().join("scenarios");
        config.semantic.start_timeout_secs = start_timeout_secs;
        config.semantic.stop_grace_secs = 1;
        config.semantic.wake_policy = wake_policy;

        let engine = Arc::new(ScriptEngine::new("sleep 30"));
        let ctx = AppContext::with_engine(config, engine);

        Self { ctx, dir }
    }

    pub fn router(&self) -> axum::Router {
        create_router(self.ctx.clone())
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    pub async fn serve(self) -> (Self, SocketAddr) {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    /// Stop any converter a test left running.
    pub async fn shutdown(&self) {
        self.ctx.semantic.shutdown().await;
    }
}

/// Decode a JSON reply body.
pub async fn reply_of(body: Body) -> ApiReply {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Body of a converter report.
pub fn report(status: i32, all: u64, non: u64, finished: u64) -> serde_json::Value {
    serde_json::json!({
        "taskGenStatus": status,
        "taskAllCount": all,
        "taskNonCount": non,
        "taskFinishedCount": finished,
        "dir": "/out",
    })
}
