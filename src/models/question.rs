use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionExample {
    pub input: String,
    pub output: String,
    pub explanation: Option<String>,
}

/// A coding question from the interviewers' question bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub examples: Vec<QuestionExample>,
    pub constraints: Option<Vec<String>>,
    pub supported_languages: Vec<String>,
    /// Starter code keyed by language id.
    pub starter_code: HashMap<String, String>,
    pub created_by: String,
}

#[derive(Debug, Clone)]
pub struct QuestionDraft {
    pub title: String,
    pub description: String,
    pub examples: Vec<QuestionExample>,
    pub constraints: Option<Vec<String>>,
    pub supported_languages: Vec<String>,
    pub starter_code: HashMap<String, String>,
}
