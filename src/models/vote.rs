use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::interview::InterviewStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Pass,
    Fail,
}

impl VoteChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteChoice::Pass => "pass",
            VoteChoice::Fail => "fail",
        }
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pass" => Ok(VoteChoice::Pass),
            "fail" => Ok(VoteChoice::Fail),
            other => Err(format!("unknown vote '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub user_id: String,
    pub vote: VoteChoice,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVote {
    pub interview_id: Uuid,
    pub user_id: String,
    pub vote: VoteChoice,
}

/// Snapshot of the votes recorded for one interview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub pass_count: usize,
    pub total_votes: usize,
}

impl VoteTally {
    pub fn from_votes(votes: &[Vote]) -> Self {
        Self {
            pass_count: votes.iter().filter(|v| v.vote == VoteChoice::Pass).count(),
            total_votes: votes.len(),
        }
    }

    pub fn fail_count(&self) -> usize {
        self.total_votes.saturating_sub(self.pass_count)
    }

    pub fn pass_percentage(&self) -> f64 {
        if self.total_votes == 0 {
            return 0.0;
        }
        self.pass_count as f64 / self.total_votes as f64 * 100.0
    }

    /// Pass percentage rounded to a whole number, half away from zero.
    pub fn rounded_percentage(&self) -> u32 {
        self.pass_percentage().round() as u32
    }

    /// Panels of one or two interviewers pass on any single pass vote; larger
    /// panels need a strict majority of the recorded votes.
    pub fn outcome(&self, panel_size: usize) -> InterviewStatus {
        let passed = if panel_size <= 2 {
            self.pass_count > 0
        } else {
            self.pass_count * 2 > self.total_votes
        };
        if passed {
            InterviewStatus::Succeeded
        } else {
            InterviewStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VoteChoice::*;

    fn tally(choices: &[VoteChoice]) -> VoteTally {
        let interview_id = Uuid::new_v4();
        let votes: Vec<Vote> = choices
            .iter()
            .enumerate()
            .map(|(i, choice)| Vote {
                id: Uuid::new_v4(),
                interview_id,
                user_id: format!("interviewer-{}", i),
                vote: *choice,
                created_at: Utc::now(),
            })
            .collect();
        VoteTally::from_votes(&votes)
    }

    #[test]
    fn small_panel_passes_on_any_pass_vote() {
        assert_eq!(tally(&[Fail, Pass]).outcome(2), InterviewStatus::Succeeded);
        assert_eq!(tally(&[Pass]).outcome(1), InterviewStatus::Succeeded);
        assert_eq!(tally(&[Fail, Fail]).outcome(2), InterviewStatus::Failed);
        assert_eq!(tally(&[Fail]).outcome(1), InterviewStatus::Failed);
    }

    #[test]
    fn large_panel_needs_strict_majority() {
        assert_eq!(tally(&[Pass, Pass, Fail]).outcome(3), InterviewStatus::Succeeded);
        assert_eq!(tally(&[Pass, Pass, Fail, Fail]).outcome(4), InterviewStatus::Failed);
        assert_eq!(tally(&[Pass, Fail]).outcome(3), InterviewStatus::Failed);
        assert_eq!(tally(&[Pass]).outcome(5), InterviewStatus::Succeeded);
    }

    #[test]
    fn empty_tally_fails_and_reports_zero_percent() {
        let empty = VoteTally::default();
        assert_eq!(empty.outcome(1), InterviewStatus::Failed);
        assert_eq!(empty.outcome(3), InterviewStatus::Failed);
        assert_eq!(empty.rounded_percentage(), 0);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(tally(&[Pass, Pass, Fail]).rounded_percentage(), 67);
        assert_eq!(tally(&[Pass, Fail, Fail]).rounded_percentage(), 33);
        let eighth = VoteTally {
            pass_count: 1,
            total_votes: 8,
        };
        assert_eq!(eighth.rounded_percentage(), 13);
        assert_eq!(eighth.fail_count(), 7);
    }
}
