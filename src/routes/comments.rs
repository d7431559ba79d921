use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::comment_dto::CreateCommentPayload, error::Result, models::user::Caller, AppState,
};

#[axum::debug_handler]
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(interview_id): Path<Uuid>,
    Json(payload): Json<CreateCommentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let comment = state
        .comment_service
        .add(interview_id, &caller.id, payload.content, payload.rating)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[axum::debug_handler]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.comment_service.list(interview_id).await?))
}

#[axum::debug_handler]
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.comment_service.delete(id, &caller.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
