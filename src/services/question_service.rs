use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionDraft};
use crate::models::user::Caller;
use crate::store::Store;

/// The interviewers' coding question bank.
#[derive(Clone)]
pub struct QuestionService {
    store: Arc<dyn Store>,
}

impl QuestionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Question>> {
        self.store.list_questions().await
    }

    pub async fn get(&self, id: Uuid) -> Result<Question> {
        self.store
            .get_question(id)
            .await?
            .ok_or_else(|| question_not_found(id))
    }

    pub async fn create(&self, caller: &Caller, draft: QuestionDraft) -> Result<Question> {
        require_interviewer(caller)?;
        check_draft(&draft)?;
        let question = self.store.insert_question(draft, &caller.id).await?;
        tracing::info!(question_id = %question.id, created_by = %caller.id, "Question added");
        Ok(question)
    }

    pub async fn update(&self, caller: &Caller, id: Uuid, draft: QuestionDraft) -> Result<Question> {
        require_interviewer(caller)?;
        check_draft(&draft)?;
        self.store
            .update_question(id, draft)
            .await?
            .ok_or_else(|| question_not_found(id))
    }

    pub async fn delete(&self, caller: &Caller, id: Uuid) -> Result<()> {
        require_interviewer(caller)?;
        if !self.store.delete_question(id).await? {
            return Err(question_not_found(id));
        }
        tracing::info!(question_id = %id, "Question deleted");
        Ok(())
    }
}

fn require_interviewer(caller: &Caller) -> Result<()> {
    if caller.is_interviewer() {
        Ok(())
    } else {
        Err(Error::Unauthorized(
            "Only interviewers can manage questions".to_string(),
        ))
    }
}

fn check_draft(draft: &QuestionDraft) -> Result<()> {
    if draft.title.trim().is_empty() || draft.description.trim().is_empty() {
        return Err(Error::BadRequest(
            "Question title and description are required".to_string(),
        ));
    }
    if draft.supported_languages.is_empty() {
        return Err(Error::BadRequest(
            "A question must support at least one language".to_string(),
        ));
    }
    if let Some(lang) = draft
        .starter_code
        .keys()
        .find(|lang| !draft.supported_languages.contains(lang))
    {
        return Err(Error::BadRequest(format!(
            "Starter code given for unsupported language '{}'",
            lang
        )));
    }
    Ok(())
}

fn question_not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Question {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionExample;
    use crate::models::user::Role;
    use crate::store::InMemoryStore;
    use std::collections::HashMap;

    fn draft(title: &str) -> QuestionDraft {
        QuestionDraft {
            title: title.to_string(),
            description: "Return indices of the two numbers that add up to target.".to_string(),
            examples: vec![QuestionExample {
                input: "nums = [2,7,11,15], target = 9".to_string(),
                output: "[0,1]".to_string(),
                explanation: None,
            }],
            constraints: Some(vec!["2 <= nums.length <= 10^4".to_string()]),
            supported_languages: vec!["javascript".to_string(), "python".to_string()],
            starter_code: HashMap::from([(
                "python".to_string(),
                "def two_sum(nums, target):\n    pass".to_string(),
            )]),
        }
    }

    #[tokio::test]
    async fn interviewers_manage_the_bank() {
        let service = QuestionService::new(Arc::new(InMemoryStore::new()));
        let caller = Caller::new("a", Role::Interviewer);

        let q = service.create(&caller, draft("Two Sum")).await.unwrap();
        assert_eq!(q.created_by, "a");

        let updated = service
            .update(&caller, q.id, draft("Two Sum II"))
            .await
            .unwrap();
        assert_eq!(updated.title, "Two Sum II");
        assert_eq!(service.get(q.id).await.unwrap().title, "Two Sum II");

        service.delete(&caller, q.id).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
        assert!(matches!(
            service.delete(&caller, q.id).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn candidates_cannot_write() {
        let service = QuestionService::new(Arc::new(InMemoryStore::new()));
        let err = service
            .create(&Caller::new("cand", Role::Candidate), draft("Two Sum"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn starter_code_must_match_languages() {
        let service = QuestionService::new(Arc::new(InMemoryStore::new()));
        let mut bad = draft("Two Sum");
        bad.starter_code
            .insert("java".to_string(), "class Solution {}".to_string());
        let err = service
            .create(&Caller::new("a", Role::Interviewer), bad)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }
}
