use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Scheduled,
    Live,
    Completed,
    Succeeded,
    Failed,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "scheduled",
            InterviewStatus::Live => "live",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Succeeded => "succeeded",
            InterviewStatus::Failed => "failed",
        }
    }

    /// `succeeded` and `failed` have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InterviewStatus::Succeeded | InterviewStatus::Failed)
    }

    /// Votes are only collected once the interview itself is over.
    pub fn accepts_votes(&self) -> bool {
        matches!(
            self,
            InterviewStatus::Completed | InterviewStatus::Succeeded | InterviewStatus::Failed
        )
    }

    pub fn can_transition_to(&self, next: InterviewStatus) -> bool {
        use InterviewStatus::*;
        matches!(
            (self, next),
            (Scheduled, Live)
                | (Scheduled, Completed)
                | (Live, Completed)
                | (Completed, Succeeded)
                | (Completed, Failed)
        )
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(InterviewStatus::Scheduled),
            "live" => Ok(InterviewStatus::Live),
            "completed" => Ok(InterviewStatus::Completed),
            "succeeded" => Ok(InterviewStatus::Succeeded),
            "failed" => Ok(InterviewStatus::Failed),
            other => Err(format!("unknown interview status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: InterviewStatus,
    pub stream_call_id: String,
    pub candidate_id: String,
    pub interviewer_ids: Vec<String>,
    /// Bumped by every write; writers compare-and-swap on it.
    pub version: i64,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Interview {
    pub fn has_interviewer(&self, user_id: &str) -> bool {
        self.interviewer_ids.iter().any(|id| id == user_id)
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.candidate_id == user_id || self.has_interviewer(user_id)
    }

    pub fn link(&self) -> String {
        format!("/interviews/{}", self.id)
    }
}

#[derive(Debug, Clone)]
pub struct NewInterview {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub stream_call_id: String,
    pub candidate_id: String,
    pub interviewer_ids: Vec<String>,
}

/// Fields that may change while an interview is still `scheduled`.
#[derive(Debug, Clone)]
pub struct InterviewEdit {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub candidate_id: String,
    pub interviewer_ids: Vec<String>,
}

/// Columns written by a status transition.
#[derive(Debug, Clone, Copy)]
pub struct StatusPatch {
    pub status: InterviewStatus,
    pub end_time: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// Deduplicates the panel while keeping first-seen order and checks the
/// participant invariants shared by scheduling and editing.
pub fn normalize_panel(
    candidate_id: &str,
    interviewer_ids: &[String],
) -> Result<Vec<String>, String> {
    let mut panel: Vec<String> = Vec::with_capacity(interviewer_ids.len());
    for id in interviewer_ids {
        let id = id.trim();
        if id.is_empty() {
            return Err("interviewer ids must not be blank".to_string());
        }
        if !panel.iter().any(|existing| existing == id) {
            panel.push(id.to_string());
        }
    }
    if panel.is_empty() {
        return Err("an interview needs at least one interviewer".to_string());
    }
    if panel.iter().any(|id| id == candidate_id) {
        return Err("the candidate cannot also be an interviewer".to_string());
    }
    Ok(panel)
}
