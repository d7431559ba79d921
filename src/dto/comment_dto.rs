use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCommentPayload {
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,
}
