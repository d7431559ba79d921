use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::interview_dto::{
        CreateInterviewPayload, DeleteInterviewResponse, ReminderResponse,
        ScheduledInterviewResponse, SetStatusPayload, StatusChangeResponse,
        UpdateInterviewPayload,
    },
    error::Result,
    models::user::Caller,
    AppState,
};

#[axum::debug_handler]
pub async fn create_interview(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (interview, report) = state
        .interview_service
        .schedule(&caller, payload.into())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ScheduledInterviewResponse::new(interview, report)),
    ))
}

#[axum::debug_handler]
pub async fn list_interviews(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.interview_service.list_all().await?))
}

#[axum::debug_handler]
pub async fn list_my_interviews(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.interview_service.list_for_user(&caller.id).await?))
}

#[axum::debug_handler]
pub async fn get_interview_by_call(
    State(state): State<AppState>,
    Path(stream_call_id): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(
        state
            .interview_service
            .get_by_stream_call_id(&stream_call_id)
            .await?,
    ))
}

#[axum::debug_handler]
pub async fn get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.interview_service.get(id).await?))
}

#[axum::debug_handler]
pub async fn update_interview(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let interview = state
        .interview_service
        .update(id, &caller.id, payload.into())
        .await?;
    Ok(Json(interview))
}

#[axum::debug_handler]
pub async fn delete_interview(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let summary = state.interview_service.delete(id, &caller.id).await?;
    Ok(Json(DeleteInterviewResponse::from(summary)))
}

#[axum::debug_handler]
pub async fn set_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStatusPayload>,
) -> Result<impl IntoResponse> {
    let change = state
        .interview_service
        .set_status(id, &caller.id, payload.status)
        .await?;
    Ok(Json(StatusChangeResponse::from(change)))
}

#[axum::debug_handler]
pub async fn send_reminder(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let report = state.interview_service.send_reminder(id, &caller.id).await?;
    Ok(Json(ReminderResponse::from(report)))
}
