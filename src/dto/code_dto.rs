use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::assessment::{
    AnalysisRequest, ExecutionRequest, Language, PlagiarismVerdict, Severity,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExecuteCodePayload {
    pub language: Language,
    #[validate(length(min = 1))]
    pub code: String,
    pub input: Option<String>,
}

impl From<ExecuteCodePayload> for ExecutionRequest {
    fn from(p: ExecuteCodePayload) -> Self {
        Self {
            language: p.language,
            code: p.code,
            stdin: p.input,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnalyzeCodePayload {
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(length(min = 1))]
    pub language: String,
    pub question_title: String,
    pub question_description: String,
}

impl From<AnalyzeCodePayload> for AnalysisRequest {
    fn from(p: AnalyzeCodePayload) -> Self {
        Self {
            code: p.code,
            language: p.language,
            question_title: p.question_title,
            question_description: p.question_description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(flatten)]
    pub verdict: PlagiarismVerdict,
    pub severity: Severity,
}

impl From<PlagiarismVerdict> for AnalysisResponse {
    fn from(verdict: PlagiarismVerdict) -> Self {
        Self {
            severity: verdict.severity(),
            verdict,
        }
    }
}
