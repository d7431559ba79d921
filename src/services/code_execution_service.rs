use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::assessment::{ExecutionRequest, ExecutionResult};

/// Runs candidate code in an external sandbox.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult>;
}

/// Client for a Piston-compatible `/execute` endpoint.
#[derive(Clone)]
pub struct PistonRunner {
    client: Client,
    url: String,
}

#[derive(Serialize)]
struct PistonFile<'a> {
    name: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct PistonRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<PistonFile<'a>>,
    stdin: &'a str,
}

#[derive(Debug, Deserialize)]
struct PistonResponse {
    run: Option<PistonRun>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PistonRun {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(alias = "time")]
    wall_time: Option<f64>,
}

impl PistonRunner {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl CodeRunner for PistonRunner {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let language = request.language;
        let body = PistonRequest {
            language: language.as_str(),
            version: language.runtime_version(),
            files: vec![PistonFile {
                name: language.file_name(),
                content: &request.code,
            }],
            stdin: request.stdin.as_deref().unwrap_or(""),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::AdapterFailure(format!("Sandbox request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::AdapterFailure(format!(
                "Sandbox returned {}: {}",
                status, text
            )));
        }

        let parsed: PistonResponse = response
            .json()
            .await
            .map_err(|e| Error::AdapterFailure(format!("Unreadable sandbox response: {}", e)))?;
        into_result(parsed)
    }
}

fn into_result(response: PistonResponse) -> Result<ExecutionResult> {
    let run = response.run.ok_or_else(|| {
        Error::AdapterFailure(
            response
                .message
                .unwrap_or_else(|| "Execution failed with no output".to_string()),
        )
    })?;

    let success = run.stderr.is_empty();
    Ok(ExecutionResult {
        success,
        output: run.stdout,
        error: if success { None } else { Some(run.stderr) },
        execution_time_ms: run.wall_time.map(|t| t.max(0.0).round() as u64),
    })
}

/// Wraps a [`CodeRunner`] with a hard deadline.
#[derive(Clone)]
pub struct CodeExecutionService {
    runner: Arc<dyn CodeRunner>,
    timeout: Duration,
}

impl CodeExecutionService {
    pub fn new(runner: Arc<dyn CodeRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        if request.code.trim().is_empty() {
            return Err(Error::BadRequest("No code to execute".to_string()));
        }

        match tokio::time::timeout(self.timeout, self.runner.run(&request)).await {
            Ok(Ok(result)) => {
                tracing::debug!(
                    language = request.language.as_str(),
                    success = result.success,
                    "Code executed"
                );
                Ok(result)
            }
            Ok(Err(e)) => {
                tracing::warn!(language = request.language.as_str(), error = %e, "Code execution failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    language = request.language.as_str(),
                    timeout = ?self.timeout,
                    "Code execution timed out"
                );
                Err(Error::AdapterTimeout(self.timeout))
            }
        }
    }
}
