use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::{QuestionDraft, QuestionExample};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionPayload {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[serde(default)]
    pub examples: Vec<QuestionExample>,
    pub constraints: Option<Vec<String>>,
    #[validate(length(min = 1))]
    pub supported_languages: Vec<String>,
    #[serde(default)]
    pub starter_code: HashMap<String, String>,
}

impl From<QuestionPayload> for QuestionDraft {
    fn from(p: QuestionPayload) -> Self {
        Self {
            title: p.title,
            description: p.description,
            examples: p.examples,
            constraints: p.constraints,
            supported_languages: p.supported_languages,
            starter_code: p.starter_code,
        }
    }
}
