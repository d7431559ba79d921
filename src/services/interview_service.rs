use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::interview::{
    normalize_panel, Interview, InterviewEdit, InterviewStatus, NewInterview, StatusPatch,
};
use crate::models::notification::{NewNotification, NotificationType};
use crate::models::user::{Caller, User};
use crate::models::vote::VoteTally;
use crate::services::notification_service::{CascadeReport, NotificationService};
use crate::services::outcome_service::OutcomeNotifier;
use crate::store::Store;
use crate::utils::keyed_lock::KeyedLocks;
use crate::utils::time::{now, starts_within};

const REMINDER_WINDOW_HOURS: i64 = 24;

/// A committed status transition plus whatever it cascaded.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub interview: Interview,
    pub previous: InterviewStatus,
    pub cascade: CascadeReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    pub votes_deleted: u64,
    pub comments_deleted: u64,
}

/// Owns the interview lifecycle: scheduling, edits, status transitions and
/// deletion. Every write to an existing interview runs under its lock.
#[derive(Clone)]
pub struct InterviewService {
    store: Arc<dyn Store>,
    notifications: NotificationService,
    outcomes: OutcomeNotifier,
    locks: Arc<KeyedLocks<Uuid>>,
}

impl InterviewService {
    pub fn new(
        store: Arc<dyn Store>,
        notifications: NotificationService,
        outcomes: OutcomeNotifier,
    ) -> Self {
        Self {
            store,
            notifications,
            outcomes,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    pub(crate) async fn lock(&self, interview_id: Uuid) -> OwnedMutexGuard<()> {
        self.locks.lock(&interview_id).await
    }

    pub async fn schedule(
        &self,
        caller: &Caller,
        mut new: NewInterview,
    ) -> Result<(Interview, CascadeReport)> {
        if !caller.is_interviewer() {
            return Err(Error::Unauthorized(
                "Only interviewers can schedule interviews".to_string(),
            ));
        }
        check_details(&new.title, &new.stream_call_id)?;
        new.interviewer_ids =
            normalize_panel(&new.candidate_id, &new.interviewer_ids).map_err(Error::BadRequest)?;
        let candidate = self.require_user(&new.candidate_id).await?;

        let interview = self.store.insert_interview(new).await?;
        tracing::info!(
            interview_id = %interview.id,
            candidate_id = %interview.candidate_id,
            panel = interview.interviewer_ids.len(),
            "Interview scheduled"
        );

        let report = self
            .notifications
            .fan_out(scheduled_notifications(&interview, &candidate))
            .await;
        Ok((interview, report))
    }

    pub async fn get(&self, id: Uuid) -> Result<Interview> {
        self.store
            .get_interview(id)
            .await?
            .ok_or_else(|| interview_not_found(id))
    }

    pub async fn get_by_stream_call_id(&self, stream_call_id: &str) -> Result<Interview> {
        self.store
            .get_interview_by_stream_call_id(stream_call_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("No interview for stream call {}", stream_call_id))
            })
    }

    pub async fn list_all(&self) -> Result<Vec<Interview>> {
        self.store.list_interviews().await
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Interview>> {
        self.store.list_interviews_for_user(user_id).await
    }

    /// Edits a `scheduled` interview. The status is checked before the
    /// caller's membership.
    pub async fn update(&self, id: Uuid, caller_id: &str, edit: InterviewEdit) -> Result<Interview> {
        let _guard = self.lock(id).await;
        let current = self.get(id).await?;

        if current.status != InterviewStatus::Scheduled {
            return Err(Error::InvalidTransition(format!(
                "Only scheduled interviews can be edited (interview is {})",
                current.status
            )));
        }
        if !current.has_interviewer(caller_id) {
            return Err(Error::Unauthorized(
                "Only interviewers can edit interviews".to_string(),
            ));
        }

        check_details(&edit.title, &current.stream_call_id)?;
        let interviewer_ids =
            normalize_panel(&edit.candidate_id, &edit.interviewer_ids).map_err(Error::BadRequest)?;
        if edit.candidate_id != current.candidate_id {
            self.require_user(&edit.candidate_id).await?;
        }
        let edit = InterviewEdit {
            interviewer_ids,
            ..edit
        };

        let updated = self
            .store
            .update_interview(id, current.version, &edit)
            .await?
            .ok_or_else(|| concurrent_modification(id))?;
        tracing::info!(interview_id = %id, "Interview updated");
        Ok(updated)
    }

    /// Removes the interview together with its votes and comments.
    pub async fn delete(&self, id: Uuid, caller_id: &str) -> Result<DeleteSummary> {
        let _guard = self.lock(id).await;
        let current = self.get(id).await?;
        if !current.has_interviewer(caller_id) {
            return Err(Error::Unauthorized(
                "Only interviewers can delete interviews".to_string(),
            ));
        }

        let votes_deleted = self.store.delete_votes_for_interview(id).await?;
        let comments_deleted = self.store.delete_comments_for_interview(id).await?;
        self.store.delete_interview(id).await?;

        tracing::info!(
            interview_id = %id,
            votes_deleted,
            comments_deleted,
            "Interview deleted"
        );
        Ok(DeleteSummary {
            votes_deleted,
            comments_deleted,
        })
    }

    /// Moves an interview along its lifecycle on behalf of a panel member.
    /// Terminal interviews reject every further transition.
    pub async fn set_status(
        &self,
        id: Uuid,
        caller_id: &str,
        next: InterviewStatus,
    ) -> Result<StatusChange> {
        let _guard = self.lock(id).await;
        let current = self.get(id).await?;

        if !current.has_interviewer(caller_id) {
            return Err(Error::Unauthorized(
                "Only interviewers can change the interview status".to_string(),
            ));
        }
        if !current.status.can_transition_to(next) {
            return Err(Error::InvalidTransition(format!(
                "Cannot move interview from {} to {}",
                current.status, next
            )));
        }

        self.commit_transition(&current, next, VoteTally::default(), Some(caller_id))
            .await
    }

    /// Writes `next` with a compare-and-swap on `current.version` and runs the
    /// outcome cascade when `next` is terminal. The caller must hold the
    /// interview lock and have checked that the edge is allowed.
    pub(crate) async fn commit_transition(
        &self,
        current: &Interview,
        next: InterviewStatus,
        tally: VoteTally,
        triggering_user_id: Option<&str>,
    ) -> Result<StatusChange> {
        self.try_commit_transition(current, next, tally, triggering_user_id)
            .await?
            .ok_or_else(|| concurrent_modification(current.id))
    }

    /// Same as [`Self::commit_transition`] but yields `None` when another
    /// writer moved the version on, leaving the retry to the caller.
    pub(crate) async fn try_commit_transition(
        &self,
        current: &Interview,
        next: InterviewStatus,
        tally: VoteTally,
        triggering_user_id: Option<&str>,
    ) -> Result<Option<StatusChange>> {
        let stamp = now();
        let patch = StatusPatch {
            status: next,
            end_time: if next == InterviewStatus::Completed {
                Some(stamp)
            } else {
                current.end_time
            },
            decided_at: match current.decided_at {
                Some(at) => Some(at),
                None if next.is_terminal() => Some(stamp),
                None => None,
            },
        };

        let Some(interview) = self
            .store
            .transition_status(current.id, current.version, patch)
            .await?
        else {
            tracing::debug!(
                interview_id = %current.id,
                expected_version = current.version,
                "Status write lost the version check"
            );
            return Ok(None);
        };

        tracing::info!(
            interview_id = %interview.id,
            from = %current.status,
            to = %next,
            "Interview status changed"
        );

        // outcome copy is built from the record as it was before the patch
        let cascade = if next.is_terminal() {
            self.outcomes
                .notify_outcome(current, next, tally, triggering_user_id)
                .await
        } else {
            CascadeReport::default()
        };

        Ok(Some(StatusChange {
            interview,
            previous: current.status,
            cascade,
        }))
    }

    /// Reminds the candidate and the panel, but only inside the 24 hours
    /// before the interview starts.
    pub async fn send_reminder(&self, id: Uuid, caller_id: &str) -> Result<CascadeReport> {
        let interview = self.get(id).await?;
        if !interview.has_interviewer(caller_id) {
            return Err(Error::Unauthorized(
                "Only interviewers can send reminders".to_string(),
            ));
        }
        if !starts_within(
            interview.start_time,
            now(),
            Duration::hours(REMINDER_WINDOW_HOURS),
        ) {
            return Err(Error::BadRequest(format!(
                "Reminders can only be sent within {} hours before the interview starts",
                REMINDER_WINDOW_HOURS
            )));
        }

        let candidate_name = self
            .store
            .get_user(&interview.candidate_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| interview.candidate_id.clone());

        let report = self
            .notifications
            .fan_out(reminder_notifications(&interview, &candidate_name))
            .await;
        tracing::info!(
            interview_id = %id,
            delivered = report.delivered.len(),
            "Interview reminders sent"
        );
        Ok(report)
    }

    async fn require_user(&self, user_id: &str) -> Result<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", user_id)))
    }
}

fn check_details(title: &str, stream_call_id: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::BadRequest("Interview title must not be blank".to_string()));
    }
    if stream_call_id.trim().is_empty() {
        return Err(Error::BadRequest("Stream call id must not be blank".to_string()));
    }
    Ok(())
}

fn interview_not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Interview {} not found", id))
}

fn concurrent_modification(id: Uuid) -> Error {
    Error::InvalidTransition(format!("Interview {} was modified concurrently", id))
}

fn display_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn scheduled_notifications(interview: &Interview, candidate: &User) -> Vec<NewNotification> {
    let mut commands = vec![NewNotification::new(
        interview.candidate_id.clone(),
        NotificationType::InterviewScheduled,
        "Interview Scheduled",
        format!(
            "Your interview for {} has been scheduled for {}",
            interview.title,
            display_time(interview.start_time)
        ),
    )
    .with_link(interview.link())];

    let message = format!(
        "You have been assigned to interview {} for {}",
        candidate.name, interview.title
    );
    commands.extend(interview.interviewer_ids.iter().map(|id| {
        NewNotification::new(
            id.clone(),
            NotificationType::InterviewScheduled,
            "New Interview Assignment",
            message.clone(),
        )
        .with_link("/dashboard")
    }));
    commands
}

fn reminder_notifications(interview: &Interview, candidate_name: &str) -> Vec<NewNotification> {
    let when = display_time(interview.start_time);
    let mut commands = vec![NewNotification::new(
        interview.candidate_id.clone(),
        NotificationType::InterviewReminder,
        "Interview Reminder",
        format!("Your interview for {} is scheduled for {}", interview.title, when),
    )
    .with_link(interview.link())];

    let message = format!(
        "You have an interview with {} for {} scheduled for {}",
        candidate_name, interview.title, when
    );
    commands.extend(interview.interviewer_ids.iter().map(|id| {
        NewNotification::new(
            id.clone(),
            NotificationType::InterviewReminder,
            "Interview Reminder",
            message.clone(),
        )
        .with_link("/dashboard")
    }));
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::comment::NewComment;
    use crate::models::user::Role;
    use crate::models::vote::{NewVote, VoteChoice};
    use crate::store::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: InterviewService,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        for (id, name, role) in [
            ("cand", "Ada", Role::Candidate),
            ("other-cand", "Grace", Role::Candidate),
            ("a", "Alan", Role::Interviewer),
            ("b", "Barbara", Role::Interviewer),
            ("c", "Claude", Role::Interviewer),
        ] {
            store
                .upsert_user(&User {
                    id: id.to_string(),
                    name: name.to_string(),
                    email: format!("{}@example.com", id),
                    image: None,
                    role,
                })
                .await
                .unwrap();
        }
        let notifications = NotificationService::new(store.clone());
        let outcomes = OutcomeNotifier::new(store.clone(), notifications.clone());
        let service = InterviewService::new(store.clone(), notifications, outcomes);
        Fixture { store, service }
    }

    fn new_interview(panel: &[&str], start_in: Duration) -> NewInterview {
        NewInterview {
            title: "Backend Engineer".to_string(),
            description: None,
            start_time: Utc::now() + start_in,
            stream_call_id: Uuid::new_v4().to_string(),
            candidate_id: "cand".to_string(),
            interviewer_ids: panel.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn interviewer(id: &str) -> Caller {
        Caller::new(id, Role::Interviewer)
    }

    async fn schedule(f: &Fixture, panel: &[&str]) -> Interview {
        f.service
            .schedule(&interviewer(panel[0]), new_interview(panel, Duration::hours(2)))
            .await
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn scheduling_notifies_candidate_and_panel() {
        let f = fixture().await;
        let (interview, report) = f
            .service
            .schedule(
                &interviewer("a"),
                new_interview(&["a", "b", "a"], Duration::hours(2)),
            )
            .await
            .unwrap();

        assert_eq!(interview.status, InterviewStatus::Scheduled);
        assert_eq!(interview.interviewer_ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(report.attempted, 3);
        assert!(report.is_complete());

        let feed = f.store.list_notifications("b").await.unwrap();
        assert_eq!(feed[0].title, "New Interview Assignment");
        assert_eq!(
            feed[0].message,
            "You have been assigned to interview Ada for Backend Engineer"
        );
        let feed = f.store.list_notifications("cand").await.unwrap();
        assert_eq!(feed[0].title, "Interview Scheduled");
    }

    #[tokio::test]
    async fn scheduling_requires_interviewer_and_known_candidate() {
        let f = fixture().await;
        let err = f
            .service
            .schedule(
                &Caller::new("cand", Role::Candidate),
                new_interview(&["a"], Duration::hours(2)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        let mut unknown = new_interview(&["a"], Duration::hours(2));
        unknown.candidate_id = "ghost".to_string();
        let err = f
            .service
            .schedule(&interviewer("a"), unknown)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = f
            .service
            .schedule(&interviewer("a"), new_interview(&["cand"], Duration::hours(2)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert!(f.service.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lifecycle_follows_allowed_edges() {
        let f = fixture().await;
        let iv = schedule(&f, &["a", "b"]).await;

        let err = f
            .service
            .set_status(iv.id, "a", InterviewStatus::Succeeded)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));

        let live = f.service.set_status(iv.id, "a", InterviewStatus::Live).await.unwrap();
        assert_eq!(live.interview.status, InterviewStatus::Live);
        assert_eq!(live.previous, InterviewStatus::Scheduled);
        assert_eq!(live.cascade.attempted, 0);
        assert!(live.interview.end_time.is_none());

        let done = f
            .service
            .set_status(iv.id, "b", InterviewStatus::Completed)
            .await
            .unwrap();
        assert!(done.interview.end_time.is_some());
        assert!(done.interview.decided_at.is_none());
        assert!(done.interview.version > live.interview.version);
    }

    #[tokio::test]
    async fn status_checks_run_in_order() {
        let f = fixture().await;
        let err = f
            .service
            .set_status(Uuid::new_v4(), "a", InterviewStatus::Live)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let iv = schedule(&f, &["a"]).await;
        let err = f
            .service
            .set_status(iv.id, "c", InterviewStatus::Succeeded)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn terminal_interviews_reject_every_transition() {
        let f = fixture().await;
        let iv = schedule(&f, &["a", "b", "c"]).await;
        f.service
            .set_status(iv.id, "a", InterviewStatus::Completed)
            .await
            .unwrap();
        let decided = f
            .service
            .set_status(iv.id, "a", InterviewStatus::Failed)
            .await
            .unwrap();
        assert!(decided.interview.decided_at.is_some());
        // candidate plus the two interviewers who did not trigger it
        assert_eq!(decided.cascade.attempted, 3);
        assert!(f
            .store
            .list_notifications("a")
            .await
            .unwrap()
            .iter()
            .all(|n| n.notification_type != NotificationType::InterviewResult));

        for next in [
            InterviewStatus::Scheduled,
            InterviewStatus::Live,
            InterviewStatus::Completed,
            InterviewStatus::Succeeded,
            InterviewStatus::Failed,
        ] {
            let err = f.service.set_status(iv.id, "b", next).await.unwrap_err();
            assert!(matches!(err, Error::InvalidTransition(_)));
        }
        assert_eq!(f.service.get(iv.id).await.unwrap().status, InterviewStatus::Failed);
    }

    #[tokio::test]
    async fn edits_are_only_allowed_while_scheduled() {
        let f = fixture().await;
        let iv = schedule(&f, &["a"]).await;

        let edit = InterviewEdit {
            title: "Staff Engineer".to_string(),
            description: Some("system design".to_string()),
            start_time: iv.start_time,
            candidate_id: "other-cand".to_string(),
            interviewer_ids: vec!["a".to_string(), "b".to_string()],
        };
        let updated = f.service.update(iv.id, "a", edit.clone()).await.unwrap();
        assert_eq!(updated.title, "Staff Engineer");
        assert_eq!(updated.candidate_id, "other-cand");
        assert_eq!(updated.interviewer_ids.len(), 2);

        f.service.set_status(iv.id, "a", InterviewStatus::Live).await.unwrap();

        // status is checked before membership
        let err = f.service.update(iv.id, "c", edit.clone()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));
        let err = f.service.update(iv.id, "a", edit).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));
        assert_eq!(f.service.get(iv.id).await.unwrap().title, "Staff Engineer");
    }

    #[tokio::test]
    async fn non_members_cannot_edit_or_delete() {
        let f = fixture().await;
        let iv = schedule(&f, &["a"]).await;
        let edit = InterviewEdit {
            title: "x".to_string(),
            description: None,
            start_time: iv.start_time,
            candidate_id: "cand".to_string(),
            interviewer_ids: vec!["a".to_string()],
        };
        assert!(matches!(
            f.service.update(iv.id, "b", edit).await.unwrap_err(),
            Error::Unauthorized(_)
        ));
        assert!(matches!(
            f.service.delete(iv.id, "cand").await.unwrap_err(),
            Error::Unauthorized(_)
        ));

        let summary = f.service.delete(iv.id, "a").await.unwrap();
        assert_eq!(summary.votes_deleted, 0);
        assert!(matches!(
            f.service.get(iv.id).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_removes_votes_and_comments() {
        let f = fixture().await;
        let iv = schedule(&f, &["a", "b"]).await;
        let kept = schedule(&f, &["a"]).await;
        f.service
            .set_status(iv.id, "a", InterviewStatus::Completed)
            .await
            .unwrap();

        for (voter, choice) in [("a", VoteChoice::Pass), ("b", VoteChoice::Fail)] {
            f.store
                .insert_vote(NewVote {
                    interview_id: iv.id,
                    user_id: voter.to_string(),
                    vote: choice,
                })
                .await
                .unwrap();
        }
        for (interview_id, author) in [(iv.id, "a"), (iv.id, "b"), (kept.id, "a")] {
            f.store
                .insert_comment(NewComment {
                    interview_id,
                    user_id: author.to_string(),
                    content: "Solid on fundamentals".to_string(),
                    rating: Some(4),
                })
                .await
                .unwrap();
        }

        let summary = f.service.delete(iv.id, "b").await.unwrap();
        assert_eq!(
            summary,
            DeleteSummary {
                votes_deleted: 2,
                comments_deleted: 2,
            }
        );
        assert!(f.store.list_votes(iv.id).await.unwrap().is_empty());
        assert!(f.store.list_comments(iv.id).await.unwrap().is_empty());
        assert_eq!(f.store.list_comments(kept.id).await.unwrap().len(), 1);
        assert!(f.store.get_interview(iv.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn direct_decision_notifies_with_zero_tally() {
        let f = fixture().await;
        let iv = schedule(&f, &["a", "b"]).await;
        let completed = f
            .service
            .set_status(iv.id, "a", InterviewStatus::Completed)
            .await
            .unwrap();

        let decided = f
            .service
            .set_status(iv.id, "b", InterviewStatus::Succeeded)
            .await
            .unwrap();
        assert_eq!(decided.previous, InterviewStatus::Completed);
        assert_eq!(decided.interview.version, completed.interview.version + 1);
        assert_eq!(decided.cascade.attempted, 2);

        let result = f
            .store
            .list_notifications("cand")
            .await
            .unwrap()
            .into_iter()
            .find(|n| n.notification_type == NotificationType::InterviewResult)
            .unwrap();
        assert_eq!(result.title, "Congratulations! You Passed");
        assert_eq!(
            result.message,
            "Great news! You passed your interview for Backend Engineer. You received 0 pass votes out of 0 total votes (0% pass rate)."
        );
        assert_eq!(result.link, Some(format!("/interviews/{}", iv.id)));

        let panel = f.store.list_notifications("a").await.unwrap();
        assert_eq!(panel[0].title, "Candidate Passed Interview");
        assert_eq!(
            panel[0].message,
            "Ada has passed the interview for Backend Engineer. Final vote count: 0 pass, 0 fail."
        );
        assert!(f
            .store
            .list_notifications("b")
            .await
            .unwrap()
            .iter()
            .all(|n| n.notification_type != NotificationType::InterviewResult));
    }

    #[tokio::test]
    async fn reminders_respect_the_window() {
        let f = fixture().await;
        let soon = schedule(&f, &["a", "b"]).await;
        let report = f.service.send_reminder(soon.id, "a").await.unwrap();
        assert_eq!(report.attempted, 3);
        let feed = f.store.list_notifications("b").await.unwrap();
        assert_eq!(feed[0].title, "Interview Reminder");
        assert!(feed[0].message.starts_with("You have an interview with Ada"));

        let (later, _) = f
            .service
            .schedule(&interviewer("a"), new_interview(&["a"], Duration::hours(30)))
            .await
            .unwrap();
        let err = f.service.send_reminder(later.id, "a").await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn lookup_by_call_and_participant() {
        let f = fixture().await;
        let iv = schedule(&f, &["a"]).await;
        schedule(&f, &["b"]).await;

        let found = f.service.get_by_stream_call_id(&iv.stream_call_id).await.unwrap();
        assert_eq!(found.id, iv.id);
        assert!(matches!(
            f.service.get_by_stream_call_id("missing").await.unwrap_err(),
            Error::NotFound(_)
        ));
        assert_eq!(f.service.list_for_user("a").await.unwrap().len(), 1);
        assert_eq!(f.service.list_for_user("cand").await.unwrap().len(), 2);
    }
}
