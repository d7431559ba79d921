use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub user_id: String,
    pub content: String,
    pub rating: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub interview_id: Uuid,
    pub user_id: String,
    pub content: String,
    pub rating: Option<i32>,
}
