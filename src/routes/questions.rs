use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{dto::question_dto::QuestionPayload, error::Result, models::user::Caller, AppState};

#[axum::debug_handler]
pub async fn list_questions(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.question_service.list().await?))
}

#[axum::debug_handler]
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.question_service.get(id).await?))
}

#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<QuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let question = state
        .question_service
        .create(&caller, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let question = state
        .question_service
        .update(&caller, id, payload.into())
        .await?;
    Ok(Json(question))
}

#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.question_service.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
