//! Mock worker for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::errors::DomainResult;
use crate::domain::models::{WorkerOutcome, WorkerRequest};
use crate::domain::ports::WorkerExecutor;

/// Mock response configuration.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub output: String,
    pub exit_code: i32,
    pub error_message: Option<String>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            output: "Mock task completed successfully.".to_string(),
            exit_code: 0,
            error_message: None,
        }
    }
}

impl MockResponse {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn failure(exit_code: i32, error: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            exit_code,
            error_message: Some(error.into()),
        }
    }

    fn into_outcome(self) -> WorkerOutcome {
        if self.exit_code == 0 {
            WorkerOutcome::success(self.output)
        } else {
            WorkerOutcome::failure(
                self.exit_code,
                self.error_message
                    .unwrap_or_else(|| "Mock failure".to_string()),
            )
        }
    }
}

/// Mock worker that records every request and answers from a script.
///
/// Queued responses are used first, in order; after that every request
/// gets the default response.
#[derive(Clone)]
pub struct MockWorker {
    default_response: MockResponse,
    queued: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<WorkerRequest>>>,
}

impl MockWorker {
    pub fn new() -> Self {
        Self::with_default_response(MockResponse::default())
    }

    pub fn with_default_response(response: MockResponse) -> Self {
        Self {
            default_response: response,
            queued: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer the next request with `response`.
    pub async fn push_response(&self, response: MockResponse) {
        self.queued.lock().await.push_back(response);
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<WorkerRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.requests.lock().await.clear();
    }
}

impl Default for MockWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerExecutor for MockWorker {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn execute(&self, request: WorkerRequest) -> DomainResult<WorkerOutcome> {
        self.requests.lock().await.push(request);
        let response = self
            .queued
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone());
        Ok(response.into_outcome())
    }
}
