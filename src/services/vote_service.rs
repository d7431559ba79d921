use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::DecisionPolicy;
use crate::error::{Error, Result};
use crate::models::interview::{Interview, InterviewStatus};
use crate::models::vote::{NewVote, Vote, VoteChoice, VoteTally};
use crate::services::interview_service::{InterviewService, StatusChange};
use crate::store::Store;

const MAX_DECISION_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct VoteReceipt {
    pub vote: Vote,
    pub tally: VoteTally,
    pub status_change: Option<StatusChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteSummary {
    pub votes: Vec<Vote>,
    pub tally: VoteTally,
    pub pass_percentage: f64,
    pub has_passed: bool,
}

/// Records panel votes and turns them into an interview outcome.
#[derive(Clone)]
pub struct VoteService {
    store: Arc<dyn Store>,
    interviews: InterviewService,
    policy: DecisionPolicy,
}

impl VoteService {
    pub fn new(store: Arc<dyn Store>, interviews: InterviewService, policy: DecisionPolicy) -> Self {
        Self {
            store,
            interviews,
            policy,
        }
    }

    /// Records one vote and, when the tally decides a different outcome than
    /// the current status, commits the transition and its cascade. Nothing is
    /// written unless every check passes.
    pub async fn submit_vote(
        &self,
        interview_id: Uuid,
        voter_id: &str,
        choice: VoteChoice,
    ) -> Result<VoteReceipt> {
        let _guard = self.interviews.lock(interview_id).await;
        let interview = self.interviews.get(interview_id).await?;

        if !interview.has_interviewer(voter_id) {
            return Err(Error::Unauthorized(
                "Only interviewers on the panel can vote".to_string(),
            ));
        }
        if !interview.status.accepts_votes() {
            return Err(Error::InvalidTransition(format!(
                "Votes open once the interview is completed (interview is {})",
                interview.status
            )));
        }
        if self.store.find_vote(interview_id, voter_id).await?.is_some() {
            return Err(Error::AlreadyVoted {
                interview_id,
                user_id: voter_id.to_string(),
            });
        }

        let vote = self
            .store
            .insert_vote(NewVote {
                interview_id,
                user_id: voter_id.to_string(),
                vote: choice,
            })
            .await?;
        tracing::info!(
            interview_id = %interview_id,
            voter_id = %voter_id,
            vote = %choice,
            "Vote recorded"
        );

        let (tally, status_change) = self.settle_outcome(interview, voter_id).await?;

        Ok(VoteReceipt {
            vote,
            tally,
            status_change,
        })
    }

    /// Recomputes the outcome from every stored vote and commits it. A lost
    /// version check means another process wrote in between, so the interview
    /// and its votes are re-read and the decision is taken again. Runs after
    /// the vote is stored and never reports a transition error to the voter.
    async fn settle_outcome(
        &self,
        mut interview: Interview,
        voter_id: &str,
    ) -> Result<(VoteTally, Option<StatusChange>)> {
        let mut attempt = 1;
        loop {
            let votes = self.store.list_votes(interview.id).await?;
            let tally = VoteTally::from_votes(&votes);
            let outcome = tally.outcome(interview.interviewer_ids.len());

            if !self.should_transition(&interview, outcome) {
                return Ok((tally, None));
            }
            if let Some(change) = self
                .interviews
                .try_commit_transition(&interview, outcome, tally, Some(voter_id))
                .await?
            {
                return Ok((tally, Some(change)));
            }
            if attempt == MAX_DECISION_ATTEMPTS {
                tracing::warn!(
                    interview_id = %interview.id,
                    attempts = attempt,
                    "Outcome not committed, interview kept changing underneath"
                );
                return Ok((tally, None));
            }

            attempt += 1;
            interview = match self.store.get_interview(interview.id).await? {
                Some(fresh) => fresh,
                None => return Ok((tally, None)),
            };
        }
    }

    fn should_transition(&self, interview: &Interview, outcome: InterviewStatus) -> bool {
        match interview.status {
            InterviewStatus::Completed => true,
            current if current.is_terminal() => {
                self.policy == DecisionPolicy::Reevaluate && current != outcome
            }
            _ => false,
        }
    }

    pub async fn summary(&self, interview_id: Uuid) -> Result<VoteSummary> {
        let interview = self.interviews.get(interview_id).await?;
        let votes = self.store.list_votes(interview_id).await?;
        let tally = VoteTally::from_votes(&votes);
        let has_passed =
            tally.outcome(interview.interviewer_ids.len()) == InterviewStatus::Succeeded;

        Ok(VoteSummary {
            pass_percentage: tally.pass_percentage(),
            has_passed,
            votes,
            tally,
        })
    }

    pub async fn user_vote(&self, interview_id: Uuid, user_id: &str) -> Result<Option<Vote>> {
        self.store.find_vote(interview_id, user_id).await
    }
}
