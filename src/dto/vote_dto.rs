use serde::{Deserialize, Serialize};

use crate::dto::interview_dto::StatusChangeResponse;
use crate::models::vote::{Vote, VoteChoice, VoteTally};
use crate::services::vote_service::VoteReceipt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitVotePayload {
    pub vote: VoteChoice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub vote: Vote,
    pub tally: VoteTally,
    pub pass_percentage: u32,
    pub status_change: Option<StatusChangeResponse>,
}

impl From<VoteReceipt> for VoteResponse {
    fn from(receipt: VoteReceipt) -> Self {
        Self {
            pass_percentage: receipt.tally.rounded_percentage(),
            vote: receipt.vote,
            tally: receipt.tally,
            status_change: receipt.status_change.map(StatusChangeResponse::from),
        }
    }
}
