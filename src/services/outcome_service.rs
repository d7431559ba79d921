use std::sync::Arc;

use crate::models::interview::{Interview, InterviewStatus};
use crate::models::notification::{NewNotification, NotificationType};
use crate::models::vote::VoteTally;
use crate::services::notification_service::{CascadeReport, NotificationService};
use crate::store::Store;

const FALLBACK_CANDIDATE_NAME: &str = "The candidate";

/// Tells everybody involved in an interview how it ended.
#[derive(Clone)]
pub struct OutcomeNotifier {
    store: Arc<dyn Store>,
    notifications: NotificationService,
}

impl OutcomeNotifier {
    pub fn new(store: Arc<dyn Store>, notifications: NotificationService) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Sends the candidate notification first, then one per interviewer except
    /// `triggering_user_id`. Individual failures are reported, never raised.
    pub async fn notify_outcome(
        &self,
        interview: &Interview,
        status: InterviewStatus,
        tally: VoteTally,
        triggering_user_id: Option<&str>,
    ) -> CascadeReport {
        let candidate_name = match self.store.get_user(&interview.candidate_id).await {
            Ok(user) => user.map(|u| u.name).filter(|name| !name.trim().is_empty()),
            Err(e) => {
                tracing::warn!(
                    interview_id = %interview.id,
                    error = %e,
                    "Could not load candidate for outcome notification"
                );
                None
            }
        };

        let commands = outcome_notifications(
            interview,
            status,
            tally,
            candidate_name.as_deref(),
            triggering_user_id,
        );
        let report = self.notifications.fan_out(commands).await;

        if report.is_complete() {
            tracing::info!(
                interview_id = %interview.id,
                status = %status,
                delivered = report.delivered.len(),
                "Outcome notifications sent"
            );
        } else {
            tracing::warn!(
                interview_id = %interview.id,
                status = %status,
                failed = report.failures.len(),
                attempted = report.attempted,
                "Outcome cascade finished with failures"
            );
        }

        report
    }
}

/// Builds the outcome cascade for a terminal `status`. Non-terminal statuses
/// produce nothing.
pub fn outcome_notifications(
    interview: &Interview,
    status: InterviewStatus,
    tally: VoteTally,
    candidate_name: Option<&str>,
    triggering_user_id: Option<&str>,
) -> Vec<NewNotification> {
    let passed = match status {
        InterviewStatus::Succeeded => true,
        InterviewStatus::Failed => false,
        _ => return Vec::new(),
    };

    let pass = tally.pass_count;
    let total = tally.total_votes;
    let pct = tally.rounded_percentage();

    let (title, message) = if passed {
        (
            "Congratulations! You Passed",
            format!(
                "Great news! You passed your interview for {}. You received {} pass votes out of {} total votes ({}% pass rate).",
                interview.title, pass, total, pct
            ),
        )
    } else {
        (
            "Interview Result",
            format!(
                "Your interview for {} has been marked as failed. You received {} pass votes out of {} total votes ({}% pass rate).",
                interview.title, pass, total, pct
            ),
        )
    };

    let mut commands = Vec::with_capacity(interview.interviewer_ids.len() + 1);
    commands.push(
        NewNotification::new(
            interview.candidate_id.clone(),
            NotificationType::InterviewResult,
            title,
            message,
        )
        .with_link(interview.link()),
    );

    let name = candidate_name.unwrap_or(FALLBACK_CANDIDATE_NAME);
    let (panel_title, verb) = if passed {
        ("Candidate Passed Interview", "passed")
    } else {
        ("Candidate Failed Interview", "failed")
    };
    let panel_message = format!(
        "{} has {} the interview for {}. Final vote count: {} pass, {} fail.",
        name,
        verb,
        interview.title,
        pass,
        tally.fail_count()
    );

    for interviewer_id in &interview.interviewer_ids {
        if Some(interviewer_id.as_str()) == triggering_user_id {
            continue;
        }
        commands.push(
            NewNotification::new(
                interviewer_id.clone(),
                NotificationType::InterviewResult,
                panel_title,
                panel_message.clone(),
            )
            .with_link("/dashboard"),
        );
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{Role, User};
    use crate::store::InMemoryStore;
    use chrono::Utc;
    use uuid::Uuid;

    fn interview(panel: &[&str]) -> Interview {
        Interview {
            id: Uuid::new_v4(),
            title: "Backend Engineer".to_string(),
            description: None,
            start_time: Utc::now(),
            end_time: Some(Utc::now()),
            status: InterviewStatus::Completed,
            stream_call_id: "call-1".to_string(),
            candidate_id: "cand".to_string(),
            interviewer_ids: panel.iter().map(|s| s.to_string()).collect(),
            version: 3,
            decided_at: None,
        }
    }

    #[test]
    fn candidate_copy_for_success() {
        let iv = interview(&["a", "b", "c"]);
        let tally = VoteTally {
            pass_count: 2,
            total_votes: 3,
        };
        let commands = outcome_notifications(&iv, InterviewStatus::Succeeded, tally, Some("Ada"), None);

        assert_eq!(commands.len(), 4);
        let candidate = &commands[0];
        assert_eq!(candidate.user_id, "cand");
        assert_eq!(candidate.title, "Congratulations! You Passed");
        assert_eq!(
            candidate.message,
            "Great news! You passed your interview for Backend Engineer. You received 2 pass votes out of 3 total votes (67% pass rate)."
        );
        assert_eq!(candidate.link.as_deref(), Some(iv.link().as_str()));

        assert_eq!(commands[1].title, "Candidate Passed Interview");
        assert_eq!(
            commands[1].message,
            "Ada has passed the interview for Backend Engineer. Final vote count: 2 pass, 1 fail."
        );
        assert_eq!(commands[1].link.as_deref(), Some("/dashboard"));
    }

    #[test]
    fn failure_without_votes_reports_zero_percent() {
        let iv = interview(&["a"]);
        let commands =
            outcome_notifications(&iv, InterviewStatus::Failed, VoteTally::default(), None, Some("a"));

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].title, "Interview Result");
        assert_eq!(
            commands[0].message,
            "Your interview for Backend Engineer has been marked as failed. You received 0 pass votes out of 0 total votes (0% pass rate)."
        );
    }

    #[test]
    fn trigger_is_skipped_and_name_falls_back() {
        let iv = interview(&["a", "b", "c"]);
        let tally = VoteTally {
            pass_count: 0,
            total_votes: 1,
        };
        let commands = outcome_notifications(&iv, InterviewStatus::Failed, tally, None, Some("b"));

        let recipients: Vec<&str> = commands.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(recipients, vec!["cand", "a", "c"]);
        assert_eq!(
            commands[1].message,
            "The candidate has failed the interview for Backend Engineer. Final vote count: 0 pass, 1 fail."
        );
    }

    #[test]
    fn non_terminal_status_builds_nothing() {
        let iv = interview(&["a"]);
        assert!(outcome_notifications(&iv, InterviewStatus::Live, VoteTally::default(), None, None)
            .is_empty());
    }

    #[tokio::test]
    async fn cascade_reaches_everyone_and_survives_a_failure() {
        let store = Arc::new(InMemoryStore::new());
        store
            .upsert_user(&User {
                id: "cand".to_string(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                image: None,
                role: Role::Candidate,
            })
            .await
            .unwrap();
        store.reject_notifications_for("b").await;

        let notifier = OutcomeNotifier::new(store.clone(), NotificationService::new(store.clone()));
        let iv = interview(&["a", "b", "c"]);
        let tally = VoteTally {
            pass_count: 2,
            total_votes: 2,
        };

        let report = notifier
            .notify_outcome(&iv, InterviewStatus::Succeeded, tally, None)
            .await;

        assert_eq!(report.attempted, 4);
        assert_eq!(report.delivered.len(), 3);
        assert_eq!(report.failures[0].user_id, "b");
        assert_eq!(store.list_notifications("c").await.unwrap().len(), 1);
        let candidate_feed = store.list_notifications("cand").await.unwrap();
        assert_eq!(candidate_feed[0].title, "Congratulations! You Passed");
    }
}
