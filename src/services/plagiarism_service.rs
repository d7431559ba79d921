use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::models::assessment::{AnalysisRequest, PlagiarismVerdict};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Judges whether a submission looks copied.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlagiarismClassifier: Send + Sync {
    async fn classify(&self, request: &AnalysisRequest) -> Result<PlagiarismVerdict>;
}

/// Classifier backed by Gemini's `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClassifier {
    client: Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerdict {
    is_plagiarized: bool,
    confidence: f64,
    reasoning: String,
    suggestions: Option<String>,
}

impl GeminiClassifier {
    pub fn new(client: Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl PlagiarismClassifier for GeminiClassifier {
    async fn classify(&self, request: &AnalysisRequest) -> Result<PlagiarismVerdict> {
        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(request) }] }]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::AdapterFailure(format!("Classifier request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::AdapterFailure(format!(
                "Classifier returned {}",
                status
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::AdapterFailure(format!("Unreadable classifier response: {}", e)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();
        if text.trim().is_empty() {
            return Err(Error::AdapterFailure(
                "Classifier returned no text".to_string(),
            ));
        }

        parse_verdict(&text)
    }
}

fn build_prompt(request: &AnalysisRequest) -> String {
    format!(
        r#"You are an expert code reviewer for a coding interview platform. Analyze the following submission and decide whether it appears to be plagiarized or whether the candidate is cheating.

Question Title: {title}
Question Description: {description}
Programming Language: {language}

Submitted Code:
```{language}
{code}
```

Consider code structure and style consistency, whether the algorithm fits the problem and the candidate's level, known online solutions, copied boilerplate, signs of multiple authors and mixed language idioms.

Respond with JSON only, exactly in this shape:
{{
  "isPlagiarized": boolean,
  "confidence": number (0-100),
  "reasoning": "why you believe the code is or isn't plagiarized",
  "suggestions": "follow-up questions or checks for the interviewer"
}}"#,
        title = request.question_title,
        description = request.question_description,
        language = request.language,
        code = request.code,
    )
}

/// Returns the JSON object inside `text`, unwrapping a fenced block if the
/// model added one.
fn extract_json(text: &str) -> &str {
    let text = text.trim();
    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(open), Some(close)) if open < close => &text[open..=close],
        _ => text,
    }
}

fn parse_verdict(text: &str) -> Result<PlagiarismVerdict> {
    let raw: RawVerdict = serde_json::from_str(extract_json(text))?;
    Ok(PlagiarismVerdict {
        is_plagiarized: raw.is_plagiarized,
        confidence: raw.confidence.clamp(0.0, 100.0).round() as u8,
        reasoning: raw.reasoning,
        suggestions: raw.suggestions,
    })
}

/// Never fails: any problem with the classifier yields an inconclusive verdict.
#[derive(Clone)]
pub struct PlagiarismService {
    classifier: Option<Arc<dyn PlagiarismClassifier>>,
    timeout: Duration,
}

impl PlagiarismService {
    pub fn new(classifier: Option<Arc<dyn PlagiarismClassifier>>, timeout: Duration) -> Self {
        Self {
            classifier,
            timeout,
        }
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> PlagiarismVerdict {
        let Some(classifier) = &self.classifier else {
            tracing::warn!("Plagiarism classifier is not configured");
            return PlagiarismVerdict::inconclusive(
                "Code analysis service is not properly configured. Please contact support.",
            );
        };

        match tokio::time::timeout(self.timeout, classifier.classify(&request)).await {
            Ok(Ok(verdict)) => {
                tracing::info!(
                    is_plagiarized = verdict.is_plagiarized,
                    confidence = verdict.confidence,
                    "Code analyzed"
                );
                verdict
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Plagiarism classifier failed");
                PlagiarismVerdict::inconclusive(
                    "Failed to analyze code. Please try again later or contact support if the issue persists.",
                )
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "Plagiarism classifier timed out");
                PlagiarismVerdict::inconclusive(
                    "Code analysis timed out. Please try again later or review the submission manually.",
                )
            }
        }
    }
}
