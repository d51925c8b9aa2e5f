//! Pipeline executors.
//!
//! A pipeline is a named external command registered in configuration.
//! Its output is opaque; only the exit status decides success.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{PipelineConfig, PipelineOutcome};
use crate::domain::ports::PipelineExecutor;

/// Runs configured pipelines as child processes.
pub struct ScriptPipelineRunner {
    pipelines: HashMap<String, PipelineConfig>,
    working_dir: Option<String>,
}

impl ScriptPipelineRunner {
    pub fn new(pipelines: &[PipelineConfig]) -> Self {
        Self {
            pipelines: pipelines
                .iter()
                .map(|p| (p.name.clone(), p.clone()))
                .collect(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl PipelineExecutor for ScriptPipelineRunner {
    fn is_registered(&self, pipeline: &str) -> bool {
        self.pipelines.contains_key(pipeline)
    }

    async fn run(&self, pipeline: &str) -> DomainResult<PipelineOutcome> {
        let config = self.pipelines.get(pipeline).ok_or_else(|| {
            DomainError::ExecutionFailed(format!("Pipeline not registered: {pipeline}"))
        })?;

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .env("EDGEWISE_PIPELINE", pipeline);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        tracing::info!(pipeline, command = %config.command, "Running pipeline");
        let output = cmd.output().await.map_err(|e| {
            DomainError::ExecutionFailed(format!("Failed to run pipeline {pipeline}: {e}"))
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                text = stderr.trim().to_string();
            }
            tracing::warn!(
                pipeline,
                exit_code = output.status.code().unwrap_or(-1),
                "Pipeline exited unsuccessfully"
            );
        }

        Ok(PipelineOutcome {
            success: output.status.success(),
            output: text,
        })
    }
}

/// Pipeline executor for tests: every registered pipeline succeeds unless
/// told otherwise, and every run is recorded.
#[derive(Clone, Default)]
pub struct MockPipelineRunner {
    registered: Vec<String>,
    failing: Vec<String>,
    runs: Arc<Mutex<Vec<String>>>,
}

impl MockPipelineRunner {
    pub fn new(registered: &[&str]) -> Self {
        Self {
            registered: registered.iter().map(|s| s.to_string()).collect(),
            failing: Vec::new(),
            runs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make `pipeline` report failure.
    pub fn failing(mut self, pipeline: &str) -> Self {
        self.failing.push(pipeline.to_string());
        self
    }

    pub async fn runs(&self) -> Vec<String> {
        self.runs.lock().await.clone()
    }
}

#[async_trait]
impl PipelineExecutor for MockPipelineRunner {
    fn is_registered(&self, pipeline: &str) -> bool {
        self.registered.iter().any(|p| p == pipeline)
    }

    async fn run(&self, pipeline: &str) -> DomainResult<PipelineOutcome> {
        if !self.is_registered(pipeline) {
            return Err(DomainError::ExecutionFailed(format!(
                "Pipeline not registered: {pipeline}"
            )));
        }
        self.runs.lock().await.push(pipeline.to_string());
        let success = !self.failing.iter().any(|p| p == pipeline);
        Ok(PipelineOutcome {
            success,
            output: if success { "ok".to_string() } else { "mock failure".to_string() },
        })
    }
}
