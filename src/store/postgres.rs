use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::Store;
use crate::error::{Error, Result};
use crate::models::{
    comment::{Comment, NewComment},
    interview::{Interview, InterviewEdit, NewInterview, StatusPatch},
    notification::Notification,
    question::{Question, QuestionDraft, QuestionExample},
    user::{Role, User},
    vote::{NewVote, Vote},
};

const INTERVIEW_COLUMNS: &str = "id, title, description, start_time, end_time, status, \
     stream_call_id, candidate_id, interviewer_ids, version, decided_at";

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, type, read, link, created_at, expires_at";

const QUESTION_COLUMNS: &str = "id, title, description, examples, constraints, \
     supported_languages, starter_code, created_by";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    image: Option<String>,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            role: row.role.parse().map_err(Error::Internal)?,
            id: row.id,
            name: row.name,
            email: row.email,
            image: row.image,
        })
    }
}

#[derive(FromRow)]
struct InterviewRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    status: String,
    stream_call_id: String,
    candidate_id: String,
    interviewer_ids: Vec<String>,
    version: i64,
    decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<InterviewRow> for Interview {
    type Error = Error;

    fn try_from(row: InterviewRow) -> Result<Self> {
        Ok(Interview {
            status: row.status.parse().map_err(Error::Internal)?,
            id: row.id,
            title: row.title,
            description: row.description,
            start_time: row.start_time,
            end_time: row.end_time,
            stream_call_id: row.stream_call_id,
            candidate_id: row.candidate_id,
            interviewer_ids: row.interviewer_ids,
            version: row.version,
            decided_at: row.decided_at,
        })
    }
}

#[derive(FromRow)]
struct VoteRow {
    id: Uuid,
    interview_id: Uuid,
    user_id: String,
    vote: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<VoteRow> for Vote {
    type Error = Error;

    fn try_from(row: VoteRow) -> Result<Self> {
        Ok(Vote {
            vote: row.vote.parse().map_err(Error::Internal)?,
            id: row.id,
            interview_id: row.interview_id,
            user_id: row.user_id,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: String,
    title: String,
    message: String,
    #[sqlx(rename = "type")]
    notification_type: String,
    read: bool,
    link: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = Error;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Notification {
            notification_type: row.notification_type.parse().map_err(Error::Internal)?,
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            message: row.message,
            read: row.read,
            link: row.link,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: Uuid,
    title: String,
    description: String,
    examples: Json<Vec<QuestionExample>>,
    constraints: Option<Json<Vec<String>>>,
    supported_languages: Vec<String>,
    starter_code: Json<HashMap<String, String>>,
    created_by: String,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: row.id,
            title: row.title,
            description: row.description,
            examples: row.examples.0,
            constraints: row.constraints.map(|c| c.0),
            supported_languages: row.supported_languages,
            starter_code: row.starter_code.0,
            created_by: row.created_by,
        }
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: Uuid,
    interview_id: Uuid,
    user_id: String,
    content: String,
    rating: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            interview_id: row.interview_id,
            user_id: row.user_id,
            content: row.content,
            rating: row.rating,
            created_at: row.created_at,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl Store for PgStore {
    async fn upsert_user(&self, user: &User) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, image, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name, email = EXCLUDED.email, image = EXCLUDED.image
            RETURNING id, name, email, image, role
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.image)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, image, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, image, role FROM users
            WHERE ($1::text IS NULL OR role = $1)
            ORDER BY name ASC
            "#,
        )
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn insert_interview(&self, new: NewInterview) -> Result<Interview> {
        let query = format!(
            r#"
            INSERT INTO interviews
                (id, title, description, start_time, stream_call_id, candidate_id, interviewer_ids)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {INTERVIEW_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, InterviewRow>(&query)
            .bind(Uuid::new_v4())
            .bind(&new.title)
            .bind(&new.description)
            .bind(new.start_time)
            .bind(&new.stream_call_id)
            .bind(&new.candidate_id)
            .bind(&new.interviewer_ids)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::BadRequest(format!(
                        "stream call {} is already attached to an interview",
                        new.stream_call_id
                    ))
                } else {
                    e.into()
                }
            })?;
        row.try_into()
    }

    async fn get_interview(&self, id: Uuid) -> Result<Option<Interview>> {
        let query = format!("SELECT {INTERVIEW_COLUMNS} FROM interviews WHERE id = $1");
        let row = sqlx::query_as::<_, InterviewRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Interview::try_from).transpose()
    }

    async fn get_interview_by_stream_call_id(
        &self,
        stream_call_id: &str,
    ) -> Result<Option<Interview>> {
        let query =
            format!("SELECT {INTERVIEW_COLUMNS} FROM interviews WHERE stream_call_id = $1");
        let row = sqlx::query_as::<_, InterviewRow>(&query)
            .bind(stream_call_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Interview::try_from).transpose()
    }

    async fn list_interviews(&self) -> Result<Vec<Interview>> {
        let query = format!("SELECT {INTERVIEW_COLUMNS} FROM interviews ORDER BY start_time ASC");
        let rows = sqlx::query_as::<_, InterviewRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }

    async fn list_interviews_for_user(&self, user_id: &str) -> Result<Vec<Interview>> {
        let query = format!(
            r#"
            SELECT {INTERVIEW_COLUMNS} FROM interviews
            WHERE candidate_id = $1 OR $1 = ANY(interviewer_ids)
            ORDER BY start_time ASC
            "#
        );
        let rows = sqlx::query_as::<_, InterviewRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }

    async fn update_interview(
        &self,
        id: Uuid,
        expected_version: i64,
        edit: &InterviewEdit,
    ) -> Result<Option<Interview>> {
        let query = format!(
            r#"
            UPDATE interviews
            SET title = $3, description = $4, start_time = $5, candidate_id = $6,
                interviewer_ids = $7, version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {INTERVIEW_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, InterviewRow>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(&edit.title)
            .bind(&edit.description)
            .bind(edit.start_time)
            .bind(&edit.candidate_id)
            .bind(&edit.interviewer_ids)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Interview::try_from).transpose()
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: StatusPatch,
    ) -> Result<Option<Interview>> {
        let query = format!(
            r#"
            UPDATE interviews
            SET status = $3, end_time = $4, decided_at = $5, version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {INTERVIEW_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, InterviewRow>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(patch.status.as_str())
            .bind(patch.end_time)
            .bind(patch.decided_at)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Interview::try_from).transpose()
    }

    async fn delete_interview(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM interviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_vote(&self, new: NewVote) -> Result<Vote> {
        let row = sqlx::query_as::<_, VoteRow>(
            r#"
            INSERT INTO votes (id, interview_id, user_id, vote)
            VALUES ($1, $2, $3, $4)
            RETURNING id, interview_id, user_id, vote, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.interview_id)
        .bind(&new.user_id)
        .bind(new.vote.as_str())
        .fetch_one(&self.pool)
        .await;

        match row {
            Ok(row) => row.try_into(),
            Err(e) if is_unique_violation(&e) => Err(Error::AlreadyVoted {
                interview_id: new.interview_id,
                user_id: new.user_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_vote(&self, interview_id: Uuid, user_id: &str) -> Result<Option<Vote>> {
        let row = sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT id, interview_id, user_id, vote, created_at FROM votes
            WHERE interview_id = $1 AND user_id = $2
            "#,
        )
        .bind(interview_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Vote::try_from).transpose()
    }

    async fn list_votes(&self, interview_id: Uuid) -> Result<Vec<Vote>> {
        let rows = sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT id, interview_id, user_id, vote, created_at FROM votes
            WHERE interview_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn delete_votes_for_interview(&self, interview_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM votes WHERE interview_id = $1")
            .bind(interview_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO comments (id, interview_id, user_id, content, rating)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, interview_id, user_id, content, rating, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.interview_id)
        .bind(&new.user_id)
        .bind(&new.content)
        .bind(new.rating)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(
            "SELECT id, interview_id, user_id, content, rating, created_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Comment::from))
    }

    async fn list_comments(&self, interview_id: Uuid) -> Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, interview_id, user_id, content, rating, created_at FROM comments
            WHERE interview_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_comments_for_interview(&self, interview_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE interview_id = $1")
            .bind(interview_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_notification(&self, n: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, user_id, title, message, type, read, link, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(n.id)
        .bind(&n.user_id)
        .bind(&n.title)
        .bind(&n.message)
        .bind(n.notification_type.as_str())
        .bind(n.read)
        .bind(&n.link)
        .bind(n.created_at)
        .bind(n.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>> {
        let query = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1");
        let row = sqlx::query_as::<_, NotificationRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Notification::try_from).transpose()
    }

    async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let query = format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }

    async fn count_unread_notifications(&self, user_id: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_notifications_for_user(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_question(&self, draft: QuestionDraft, created_by: &str) -> Result<Question> {
        let query = format!(
            r#"
            INSERT INTO questions
                (id, title, description, examples, constraints, supported_languages, starter_code, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {QUESTION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, QuestionRow>(&query)
            .bind(Uuid::new_v4())
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(Json(&draft.examples))
            .bind(draft.constraints.as_ref().map(Json))
            .bind(&draft.supported_languages)
            .bind(Json(&draft.starter_code))
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
        let query = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1");
        let row = sqlx::query_as::<_, QuestionRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Question::from))
    }

    async fn list_questions(&self) -> Result<Vec<Question>> {
        let query = format!("SELECT {QUESTION_COLUMNS} FROM questions ORDER BY title ASC");
        let rows = sqlx::query_as::<_, QuestionRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Question::from).collect())
    }

    async fn update_question(&self, id: Uuid, draft: QuestionDraft) -> Result<Option<Question>> {
        let query = format!(
            r#"
            UPDATE questions
            SET title = $2, description = $3, examples = $4, constraints = $5,
                supported_languages = $6, starter_code = $7
            WHERE id = $1
            RETURNING {QUESTION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, QuestionRow>(&query)
            .bind(id)
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(Json(&draft.examples))
            .bind(draft.constraints.as_ref().map(Json))
            .bind(&draft.supported_languages)
            .bind(Json(&draft.starter_code))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Question::from))
    }

    async fn delete_question(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
