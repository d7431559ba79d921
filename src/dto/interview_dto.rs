use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::interview::{Interview, InterviewEdit, InterviewStatus, NewInterview};
use crate::services::interview_service::{DeleteSummary, StatusChange};
use crate::services::notification_service::CascadeReport;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInterviewPayload {
    #[validate(length(min = 1))]
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    #[validate(length(min = 1))]
    pub stream_call_id: String,
    #[validate(length(min = 1))]
    pub candidate_id: String,
    #[validate(length(min = 1))]
    pub interviewer_ids: Vec<String>,
}

impl From<CreateInterviewPayload> for NewInterview {
    fn from(p: CreateInterviewPayload) -> Self {
        Self {
            title: p.title,
            description: p.description,
            start_time: p.start_time,
            stream_call_id: p.stream_call_id,
            candidate_id: p.candidate_id,
            interviewer_ids: p.interviewer_ids,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateInterviewPayload {
    #[validate(length(min = 1))]
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    #[validate(length(min = 1))]
    pub candidate_id: String,
    #[validate(length(min = 1))]
    pub interviewer_ids: Vec<String>,
}

impl From<UpdateInterviewPayload> for InterviewEdit {
    fn from(p: UpdateInterviewPayload) -> Self {
        Self {
            title: p.title,
            description: p.description,
            start_time: p.start_time,
            candidate_id: p.candidate_id,
            interviewer_ids: p.interviewer_ids,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusPayload {
    pub status: InterviewStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledInterviewResponse {
    pub interview: Interview,
    pub notified: usize,
    pub warnings: Vec<String>,
}

impl ScheduledInterviewResponse {
    pub fn new(interview: Interview, report: CascadeReport) -> Self {
        Self {
            interview,
            notified: report.delivered.len(),
            warnings: report.warnings(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeResponse {
    pub interview: Interview,
    pub previous_status: InterviewStatus,
    pub notified: usize,
    pub warnings: Vec<String>,
}

impl From<StatusChange> for StatusChangeResponse {
    fn from(change: StatusChange) -> Self {
        Self {
            notified: change.cascade.delivered.len(),
            warnings: change.cascade.warnings(),
            interview: change.interview,
            previous_status: change.previous,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteInterviewResponse {
    pub deleted: bool,
    pub votes_deleted: u64,
    pub comments_deleted: u64,
}

impl From<DeleteSummary> for DeleteInterviewResponse {
    fn from(summary: DeleteSummary) -> Self {
        Self {
            deleted: true,
            votes_deleted: summary.votes_deleted,
            comments_deleted: summary.comments_deleted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderResponse {
    pub sent: usize,
    pub warnings: Vec<String>,
}

impl From<CascadeReport> for ReminderResponse {
    fn from(report: CascadeReport) -> Self {
        Self {
            sent: report.delivered.len(),
            warnings: report.warnings(),
        }
    }
}
