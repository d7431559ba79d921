use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::vote_dto::{SubmitVotePayload, VoteResponse},
    error::Result,
    models::user::Caller,
    AppState,
};

#[axum::debug_handler]
pub async fn submit_vote(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitVotePayload>,
) -> Result<impl IntoResponse> {
    let receipt = state
        .vote_service
        .submit_vote(id, &caller.id, payload.vote)
        .await?;
    Ok((StatusCode::CREATED, Json(VoteResponse::from(receipt))))
}

#[axum::debug_handler]
pub async fn list_votes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.vote_service.summary(id).await?))
}

#[axum::debug_handler]
pub async fn my_vote(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.vote_service.user_vote(id, &caller.id).await?))
}
