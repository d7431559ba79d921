//! In-memory implementation of [`Store`].
//!
//! Everything lives in `HashMap`s behind `tokio::sync::RwLock`s and is lost on
//! restart. Used when no `DATABASE_URL` is configured and by the test suite.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::error::{Error, Result};
use crate::models::{
    comment::{Comment, NewComment},
    interview::{Interview, InterviewEdit, InterviewStatus, NewInterview, StatusPatch},
    notification::Notification,
    question::{Question, QuestionDraft},
    user::{Role, User},
    vote::{NewVote, Vote},
};

#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<String, User>>,
    interviews: RwLock<HashMap<Uuid, Interview>>,
    votes: RwLock<Vec<Vote>>,
    comments: RwLock<Vec<Comment>>,
    notifications: RwLock<Vec<Notification>>,
    questions: RwLock<HashMap<Uuid, Question>>,
    /// Recipients whose notification inserts are rejected; test seam only.
    unreachable_recipients: RwLock<HashSet<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test seam: makes every subsequent notification insert for `user_id`
    /// fail, to simulate a store that drops individual writes during a
    /// fan-out. Used by the unit and HTTP tests; nothing in the service calls
    /// it, so the set stays empty in a running server.
    #[doc(hidden)]
    pub async fn reject_notifications_for(&self, user_id: &str) {
        self.unreachable_recipients
            .write()
            .await
            .insert(user_id.to_string());
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_user(&self, user: &User) -> Result<User> {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
        let users = self.users.read().await;
        let mut list: Vec<User> = users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn insert_interview(&self, new: NewInterview) -> Result<Interview> {
        let interview = Interview {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            start_time: new.start_time,
            end_time: None,
            status: InterviewStatus::Scheduled,
            stream_call_id: new.stream_call_id,
            candidate_id: new.candidate_id,
            interviewer_ids: new.interviewer_ids,
            version: 1,
            decided_at: None,
        };
        let mut interviews = self.interviews.write().await;
        if interviews
            .values()
            .any(|i| i.stream_call_id == interview.stream_call_id)
        {
            return Err(Error::BadRequest(format!(
                "stream call {} is already attached to an interview",
                interview.stream_call_id
            )));
        }
        interviews.insert(interview.id, interview.clone());
        Ok(interview)
    }

    async fn get_interview(&self, id: Uuid) -> Result<Option<Interview>> {
        Ok(self.interviews.read().await.get(&id).cloned())
    }

    async fn get_interview_by_stream_call_id(
        &self,
        stream_call_id: &str,
    ) -> Result<Option<Interview>> {
        let interviews = self.interviews.read().await;
        Ok(interviews
            .values()
            .find(|i| i.stream_call_id == stream_call_id)
            .cloned())
    }

    async fn list_interviews(&self) -> Result<Vec<Interview>> {
        let interviews = self.interviews.read().await;
        let mut list: Vec<Interview> = interviews.values().cloned().collect();
        list.sort_by_key(|i| i.start_time);
        Ok(list)
    }

    async fn list_interviews_for_user(&self, user_id: &str) -> Result<Vec<Interview>> {
        let mut list = self.list_interviews().await?;
        list.retain(|i| i.involves(user_id));
        Ok(list)
    }

    async fn update_interview(
        &self,
        id: Uuid,
        expected_version: i64,
        edit: &InterviewEdit,
    ) -> Result<Option<Interview>> {
        let mut interviews = self.interviews.write().await;
        let Some(interview) = interviews.get_mut(&id) else {
            return Ok(None);
        };
        if interview.version != expected_version {
            return Ok(None);
        }
        interview.title = edit.title.clone();
        interview.description = edit.description.clone();
        interview.start_time = edit.start_time;
        interview.candidate_id = edit.candidate_id.clone();
        interview.interviewer_ids = edit.interviewer_ids.clone();
        interview.version += 1;
        Ok(Some(interview.clone()))
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: StatusPatch,
    ) -> Result<Option<Interview>> {
        let mut interviews = self.interviews.write().await;
        let Some(interview) = interviews.get_mut(&id) else {
            return Ok(None);
        };
        if interview.version != expected_version {
            return Ok(None);
        }
        interview.status = patch.status;
        interview.end_time = patch.end_time;
        interview.decided_at = patch.decided_at;
        interview.version += 1;
        Ok(Some(interview.clone()))
    }

    async fn delete_interview(&self, id: Uuid) -> Result<bool> {
        Ok(self.interviews.write().await.remove(&id).is_some())
    }

    async fn insert_vote(&self, new: NewVote) -> Result<Vote> {
        let mut votes = self.votes.write().await;
        if votes
            .iter()
            .any(|v| v.interview_id == new.interview_id && v.user_id == new.user_id)
        {
            return Err(Error::AlreadyVoted {
                interview_id: new.interview_id,
                user_id: new.user_id,
            });
        }
        let vote = Vote {
            id: Uuid::new_v4(),
            interview_id: new.interview_id,
            user_id: new.user_id,
            vote: new.vote,
            created_at: Utc::now(),
        };
        votes.push(vote.clone());
        Ok(vote)
    }

    async fn find_vote(&self, interview_id: Uuid, user_id: &str) -> Result<Option<Vote>> {
        let votes = self.votes.read().await;
        Ok(votes
            .iter()
            .find(|v| v.interview_id == interview_id && v.user_id == user_id)
            .cloned())
    }

    async fn list_votes(&self, interview_id: Uuid) -> Result<Vec<Vote>> {
        let votes = self.votes.read().await;
        Ok(votes
            .iter()
            .filter(|v| v.interview_id == interview_id)
            .cloned()
            .collect())
    }

    async fn delete_votes_for_interview(&self, interview_id: Uuid) -> Result<u64> {
        let mut votes = self.votes.write().await;
        let before = votes.len();
        votes.retain(|v| v.interview_id != interview_id);
        Ok((before - votes.len()) as u64)
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment> {
        let comment = Comment {
            id: Uuid::new_v4(),
            interview_id: new.interview_id,
            user_id: new.user_id,
            content: new.content,
            rating: new.rating,
            created_at: Utc::now(),
        };
        self.comments.write().await.push(comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        let comments = self.comments.read().await;
        Ok(comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_comments(&self, interview_id: Uuid) -> Result<Vec<Comment>> {
        let comments = self.comments.read().await;
        Ok(comments
            .iter()
            .filter(|c| c.interview_id == interview_id)
            .cloned()
            .collect())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|c| c.id != id);
        Ok(comments.len() != before)
    }

    async fn delete_comments_for_interview(&self, interview_id: Uuid) -> Result<u64> {
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|c| c.interview_id != interview_id);
        Ok((before - comments.len()) as u64)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        if self
            .unreachable_recipients
            .read()
            .await
            .contains(&notification.user_id)
        {
            return Err(Error::Internal(format!(
                "notification insert rejected for {}",
                notification.user_id
            )));
        }
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>> {
        let notifications = self.notifications.read().await;
        Ok(notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        let mut list: Vec<Notification> = notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn count_unread_notifications(&self, user_id: &str) -> Result<i64> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as i64)
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<bool> {
        let mut notifications = self.notifications.write().await;
        match notifications.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<u64> {
        let mut notifications = self.notifications.write().await;
        let mut updated = 0;
        for n in notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            n.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_notification(&self, id: Uuid) -> Result<bool> {
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|n| n.id != id);
        Ok(notifications.len() != before)
    }

    async fn delete_notifications_for_user(&self, user_id: &str) -> Result<u64> {
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|n| n.user_id != user_id);
        Ok((before - notifications.len()) as u64)
    }

    async fn insert_question(&self, draft: QuestionDraft, created_by: &str) -> Result<Question> {
        let question = Question {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            examples: draft.examples,
            constraints: draft.constraints,
            supported_languages: draft.supported_languages,
            starter_code: draft.starter_code,
            created_by: created_by.to_string(),
        };
        self.questions
            .write()
            .await
            .insert(question.id, question.clone());
        Ok(question)
    }

    async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
        Ok(self.questions.read().await.get(&id).cloned())
    }

    async fn list_questions(&self) -> Result<Vec<Question>> {
        let questions = self.questions.read().await;
        let mut list: Vec<Question> = questions.values().cloned().collect();
        list.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(list)
    }

    async fn update_question(&self, id: Uuid, draft: QuestionDraft) -> Result<Option<Question>> {
        let mut questions = self.questions.write().await;
        let Some(question) = questions.get_mut(&id) else {
            return Ok(None);
        };
        question.title = draft.title;
        question.description = draft.description;
        question.examples = draft.examples;
        question.constraints = draft.constraints;
        question.supported_languages = draft.supported_languages;
        question.starter_code = draft.starter_code;
        Ok(Some(question.clone()))
    }

    async fn delete_question(&self, id: Uuid) -> Result<bool> {
        Ok(self.questions.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::vote::VoteChoice;

    #[tokio::test]
    async fn duplicate_vote_pair_is_rejected() {
        let store = InMemoryStore::new();
        let interview_id = Uuid::new_v4();
        let new_vote = || NewVote {
            interview_id,
            user_id: "alice".to_string(),
            vote: VoteChoice::Pass,
        };

        store.insert_vote(new_vote()).await.unwrap();
        let err = store.insert_vote(new_vote()).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyVoted { .. }));
        assert_eq!(store.list_votes(interview_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_version_does_not_transition() {
        let store = InMemoryStore::new();
        let interview = store
            .insert_interview(NewInterview {
                title: "Backend".to_string(),
                description: None,
                start_time: Utc::now(),
                stream_call_id: "call-1".to_string(),
                candidate_id: "cand".to_string(),
                interviewer_ids: vec!["alice".to_string()],
            })
            .await
            .unwrap();

        let patch = StatusPatch {
            status: InterviewStatus::Live,
            end_time: None,
            decided_at: None,
        };
        let updated = store
            .transition_status(interview.id, interview.version, patch)
            .await
            .unwrap()
            .expect("first writer wins");
        assert_eq!(updated.version, interview.version + 1);

        let stale = store
            .transition_status(interview.id, interview.version, patch)
            .await
            .unwrap();
        assert!(stale.is_none());
    }
}
