//! Persistence boundary for interviews and everything hanging off them.
//!
//! Services only talk to the [`Store`] trait. Two backends exist: Postgres
//! (via sqlx) for deployments and an in-memory map for local runs and tests.
//! Each method is atomic on its own; there are no multi-record transactions,
//! so callers needing cross-record consistency serialise through
//! [`crate::utils::keyed_lock::KeyedLocks`] and the `version` check on
//! interviews.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    comment::{Comment, NewComment},
    interview::{Interview, InterviewEdit, NewInterview, StatusPatch},
    notification::Notification,
    question::{Question, QuestionDraft},
    user::{Role, User},
    vote::{NewVote, Vote},
};

#[async_trait]
pub trait Store: Send + Sync {
    // users

    /// Insert or refresh a user record from the identity provider.
    async fn upsert_user(&self, user: &User) -> Result<User>;

    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>>;

    // interviews

    async fn insert_interview(&self, interview: NewInterview) -> Result<Interview>;

    async fn get_interview(&self, id: Uuid) -> Result<Option<Interview>>;

    async fn get_interview_by_stream_call_id(&self, stream_call_id: &str)
        -> Result<Option<Interview>>;

    /// All interviews ordered by start time.
    async fn list_interviews(&self) -> Result<Vec<Interview>>;

    /// Interviews where the user is the candidate or on the panel.
    async fn list_interviews_for_user(&self, user_id: &str) -> Result<Vec<Interview>>;

    /// Applies an edit only if the stored version still equals
    /// `expected_version`. Returns `None` when the version moved on.
    async fn update_interview(
        &self,
        id: Uuid,
        expected_version: i64,
        edit: &InterviewEdit,
    ) -> Result<Option<Interview>>;

    /// Compare-and-swap of the status columns, keyed on `expected_version`.
    /// Returns `None` when another writer got there first.
    async fn transition_status(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: StatusPatch,
    ) -> Result<Option<Interview>>;

    async fn delete_interview(&self, id: Uuid) -> Result<bool>;

    // votes

    /// Fails with `AlreadyVoted` if the `(interview, user)` pair already has a vote.
    async fn insert_vote(&self, vote: NewVote) -> Result<Vote>;

    async fn find_vote(&self, interview_id: Uuid, user_id: &str) -> Result<Option<Vote>>;

    async fn list_votes(&self, interview_id: Uuid) -> Result<Vec<Vote>>;

    async fn delete_votes_for_interview(&self, interview_id: Uuid) -> Result<u64>;

    // comments

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment>;

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>>;

    async fn list_comments(&self, interview_id: Uuid) -> Result<Vec<Comment>>;

    async fn delete_comment(&self, id: Uuid) -> Result<bool>;

    async fn delete_comments_for_interview(&self, interview_id: Uuid) -> Result<u64>;

    // notifications

    /// Stores a fully built notification as-is.
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;

    async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>>;

    /// Newest first.
    async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>>;

    async fn count_unread_notifications(&self, user_id: &str) -> Result<i64>;

    async fn mark_notification_read(&self, id: Uuid) -> Result<bool>;

    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<u64>;

    async fn delete_notification(&self, id: Uuid) -> Result<bool>;

    async fn delete_notifications_for_user(&self, user_id: &str) -> Result<u64>;

    // questions

    async fn insert_question(&self, draft: QuestionDraft, created_by: &str) -> Result<Question>;

    async fn get_question(&self, id: Uuid) -> Result<Option<Question>>;

    async fn list_questions(&self) -> Result<Vec<Question>>;

    async fn update_question(&self, id: Uuid, draft: QuestionDraft) -> Result<Option<Question>>;

    async fn delete_question(&self, id: Uuid) -> Result<bool>;
}
