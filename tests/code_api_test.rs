use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use interview_backend::{
    build_router,
    config::{Config, DecisionPolicy},
    error::{Error, Result},
    middleware::auth::issue_token,
    models::assessment::{AnalysisRequest, ExecutionRequest, ExecutionResult, PlagiarismVerdict},
    models::user::Role,
    services::{code_execution_service::CodeRunner, plagiarism_service::PlagiarismClassifier},
    store::InMemoryStore,
    AppState,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

const SECRET: &str = "code_test_secret";

struct StderrRunner;

#[async_trait]
impl CodeRunner for StderrRunner {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        if request.code.contains("raise") {
            Ok(ExecutionResult {
                success: false,
                output: String::new(),
                error: Some("ValueError".to_string()),
                execution_time_ms: Some(4),
            })
        } else {
            Err(Error::AdapterFailure("sandbox unavailable".to_string()))
        }
    }
}

struct FixedClassifier;

#[async_trait]
impl PlagiarismClassifier for FixedClassifier {
    async fn classify(&self, _request: &AnalysisRequest) -> Result<PlagiarismVerdict> {
        Ok(PlagiarismVerdict {
            is_plagiarized: true,
            confidence: 91,
            reasoning: "identical to a well known solution".to_string(),
            suggestions: Some("ask for a walkthrough".to_string()),
        })
    }
}

fn app(classifier: Option<Arc<dyn PlagiarismClassifier>>) -> Router {
    let config = Config {
        server_address: "127.0.0.1:0".to_string(),
        database_url: None,
        jwt_secret: SECRET.to_string(),
        api_rps: 1000,
        piston_api_url: "http://localhost:9/execute".to_string(),
        gemini_api_key: None,
        gemini_model: "test-model".to_string(),
        adapter_timeout: Duration::from_secs(5),
        decision_policy: DecisionPolicy::Reevaluate,
    };
    let state = AppState::assemble(
        Arc::new(InMemoryStore::new()),
        "memory",
        &config,
        Arc::new(StderrRunner),
        classifier,
    );
    build_router(state, config.api_rps)
}

async fn post(app: &Router, uri: &str, body: JsonValue) -> (StatusCode, JsonValue) {
    let token = issue_token(SECRET, "cand", Role::Candidate, chrono::Duration::hours(1)).unwrap();
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null))
}

#[tokio::test]
async fn execution_reports_stderr_and_sandbox_failures() {
    let app = app(None);

    let (status, body) = post(
        &app,
        "/api/code/execute",
        json!({ "language": "python", "code": "raise ValueError()" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "ValueError");

    let (status, body) = post(
        &app,
        "/api/code/execute",
        json!({ "language": "java", "code": "class Main {}" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("sandbox unavailable"));

    let (status, _) = post(
        &app,
        "/api/code/execute",
        json!({ "language": "cobol", "code": "DISPLAY 'HI'." }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn analysis_without_classifier_is_inconclusive() {
    let (status, body) = post(
        &app(None),
        "/api/code/analyze",
        json!({
            "code": "print(1)",
            "language": "python",
            "question_title": "Two Sum",
            "question_description": "..."
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_plagiarized"], false);
    assert_eq!(body["confidence"], 0);
    assert_eq!(body["severity"], "low");
}

#[tokio::test]
async fn analysis_reports_severity() {
    let (status, body) = post(
        &app(Some(Arc::new(FixedClassifier))),
        "/api/code/analyze",
        json!({
            "code": "def two_sum(nums, target): ...",
            "language": "python",
            "question_title": "Two Sum",
            "question_description": "..."
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_plagiarized"], true);
    assert_eq!(body["severity"], "high");
}
