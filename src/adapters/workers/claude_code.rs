//! Claude Code CLI worker.
//!
//! Spawns the Claude Code CLI in print mode with one focused prompt, waits
//! for it to exit, and reports the exit code. The scheduler does not look
//! at the output beyond that; anything the worker changes it writes to the
//! state store itself.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{WorkerConfig, WorkerOutcome, WorkerRequest};
use crate::domain::ports::WorkerExecutor;

/// Claude Code CLI worker.
pub struct ClaudeCodeWorker {
    config: WorkerConfig,
}

impl ClaudeCodeWorker {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    /// Build CLI arguments for a request.
    fn build_args(&self, request: &WorkerRequest) -> Vec<String> {
        let mut args = vec![
            "--print".to_string(),
            "--output-format".to_string(),
            "json".to_string(),
            "--max-turns".to_string(),
            self.config.max_turns.to_string(),
        ];

        if let Some(ref model) = self.config.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        args.push("--append-system-prompt".to_string());
        args.push(format!(
            "You are acting as the {} role of a paper-trading research agent. \
             Work on exactly one task and exit when it is done.",
            request.role
        ));

        args.extend(self.config.extra_flags.clone());

        args.push("-p".to_string());
        args.push(request.instructions.clone());
        args
    }

    /// Pull the `result` text and error flag out of `--output-format json`.
    fn parse_result(stdout: &str) -> Option<(String, bool)> {
        let line = stdout.lines().rev().find(|l| l.trim_start().starts_with('{'))?;
        let json: serde_json::Value = serde_json::from_str(line.trim()).ok()?;
        let result = json
            .get("result")
            .and_then(|r| r.as_str())
            .unwrap_or_default()
            .to_string();
        let is_error = json
            .get("is_error")
            .and_then(|e| e.as_bool())
            .unwrap_or(false);
        Some((result, is_error))
    }
}

async fn collect_lines<R: AsyncRead + Unpin>(reader: R) -> String {
    let mut lines = BufReader::new(reader).lines();
    let mut text = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        text.push_str(&line);
        text.push('\n');
    }
    text
}

#[async_trait]
impl WorkerExecutor for ClaudeCodeWorker {
    fn name(&self) -> &'static str {
        "claude_code"
    }

    async fn execute(&self, request: WorkerRequest) -> DomainResult<WorkerOutcome> {
        let args = self.build_args(&request);
        let working_dir = self
            .config
            .working_dir
            .clone()
            .unwrap_or_else(|| ".".to_string());

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.args(&args)
            .current_dir(&working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env("EDGEWISE_REQUEST_ID", request.id.to_string())
            .env("EDGEWISE_ROLE", &request.role)
            .env("EDGEWISE_WORK_SOURCE", request.source.label());

        tracing::info!(
            request_id = %request.id,
            role = %request.role,
            source = %request.source.label(),
            "Spawning worker"
        );

        let mut child = cmd
            .spawn()
            .map_err(|e| DomainError::ExecutionFailed(format!("Failed to spawn worker: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DomainError::ExecutionFailed("Failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DomainError::ExecutionFailed("Failed to capture stderr".to_string()))?;

        // Drain both pipes together so a chatty stderr cannot stall the child.
        let (output_text, error_text) = tokio::join!(collect_lines(stdout), collect_lines(stderr));

        let exit_status = child
            .wait()
            .await
            .map_err(|e| DomainError::ExecutionFailed(format!("Failed to wait for worker: {e}")))?;
        let exit_code = exit_status.code().unwrap_or(-1);

        let parsed = Self::parse_result(&output_text);
        let output = parsed
            .as_ref()
            .map(|(result, _)| result.clone())
            .unwrap_or_else(|| output_text.trim().to_string());

        if exit_status.success() {
            if parsed.as_ref().is_some_and(|(_, is_error)| *is_error) {
                tracing::warn!(request_id = %request.id, "Worker exited 0 but reported an error");
            }
            Ok(WorkerOutcome::success(output))
        } else {
            let error = if error_text.trim().is_empty() {
                format!("Worker exited with code {exit_code}")
            } else {
                error_text.trim().to_string()
            };
            Ok(WorkerOutcome {
                exit_code,
                output,
                error: Some(error),
            })
        }
    }
}
