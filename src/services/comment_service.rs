use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::comment::{Comment, NewComment};
use crate::store::Store;

const MIN_RATING: i32 = 1;
const MAX_RATING: i32 = 5;

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn Store>,
}

impl CommentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn add(
        &self,
        interview_id: Uuid,
        author_id: &str,
        content: String,
        rating: Option<i32>,
    ) -> Result<Comment> {
        if content.trim().is_empty() {
            return Err(Error::BadRequest("Comment must not be empty".to_string()));
        }
        if let Some(r) = rating {
            if !(MIN_RATING..=MAX_RATING).contains(&r) {
                return Err(Error::BadRequest(format!(
                    "Rating must be between {} and {}",
                    MIN_RATING, MAX_RATING
                )));
            }
        }
        if self.store.get_interview(interview_id).await?.is_none() {
            return Err(Error::NotFound(format!("Interview {} not found", interview_id)));
        }

        let comment = self
            .store
            .insert_comment(NewComment {
                interview_id,
                user_id: author_id.to_string(),
                content,
                rating,
            })
            .await?;
        tracing::debug!(comment_id = %comment.id, interview_id = %interview_id, "Comment added");
        Ok(comment)
    }

    pub async fn list(&self, interview_id: Uuid) -> Result<Vec<Comment>> {
        self.store.list_comments(interview_id).await
    }

    pub async fn delete(&self, id: Uuid, caller_id: &str) -> Result<()> {
        let comment = self
            .store
            .get_comment(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Comment {} not found", id)))?;
        if comment.user_id != caller_id {
            return Err(Error::Unauthorized(
                "Comments can only be deleted by their author".to_string(),
            ));
        }
        self.store.delete_comment(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interview::NewInterview;
    use crate::store::InMemoryStore;
    use chrono::Utc;

    async fn setup() -> (CommentService, Uuid) {
        let store = Arc::new(InMemoryStore::new());
        let interview = store
            .insert_interview(NewInterview {
                title: "Backend Engineer".to_string(),
                description: None,
                start_time: Utc::now(),
                stream_call_id: "call-1".to_string(),
                candidate_id: "cand".to_string(),
                interviewer_ids: vec!["a".to_string()],
            })
            .await
            .unwrap();
        (CommentService::new(store), interview.id)
    }

    #[tokio::test]
    async fn rating_must_be_in_range() {
        let (service, id) = setup().await;
        for bad in [0, 6, -1] {
            let err = service
                .add(id, "a", "solid".to_string(), Some(bad))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::BadRequest(_)));
        }
        let comment = service
            .add(id, "a", "solid".to_string(), Some(5))
            .await
            .unwrap();
        assert_eq!(comment.rating, Some(5));
        assert_eq!(service.list(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn comment_needs_existing_interview() {
        let (service, _) = setup().await;
        let err = service
            .add(Uuid::new_v4(), "a", "hello".to_string(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn only_author_may_delete() {
        let (service, id) = setup().await;
        let comment = service.add(id, "a", "ok".to_string(), None).await.unwrap();

        let err = service.delete(comment.id, "b").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        service.delete(comment.id, "a").await.unwrap();
        assert!(service.list(id).await.unwrap().is_empty());
    }
}
