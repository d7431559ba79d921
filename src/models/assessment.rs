use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Javascript,
    Python,
    Java,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Javascript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
        }
    }

    /// Runtime version pinned on the execution sandbox.
    pub fn runtime_version(&self) -> &'static str {
        match self {
            Language::Javascript => "18.15.0",
            Language::Python => "3.10.0",
            Language::Java => "15.0.2",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Language::Javascript => "main.js",
            Language::Python => "main.py",
            Language::Java => "Main.java",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub language: Language,
    pub code: String,
    pub stdin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// True whenever stderr was empty, regardless of the exit code.
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub execution_time_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub code: String,
    pub language: String,
    pub question_title: String,
    pub question_description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlagiarismVerdict {
    pub is_plagiarized: bool,
    /// 0 to 100.
    pub confidence: u8,
    pub reasoning: String,
    pub suggestions: Option<String>,
}

impl PlagiarismVerdict {
    /// Returned whenever the classifier cannot give a usable answer.
    pub fn inconclusive(reasoning: impl Into<String>) -> Self {
        Self {
            is_plagiarized: false,
            confidence: 0,
            reasoning: reasoning.into(),
            suggestions: Some(
                "The code analysis service is currently unavailable. You may proceed with manual review."
                    .to_string(),
            ),
        }
    }

    pub fn severity(&self) -> Severity {
        match self.confidence {
            80.. => Severity::High,
            50..=79 => Severity::Medium,
            _ => Severity::Low,
        }
    }
}
