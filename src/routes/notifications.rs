use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::notification_dto::{BulkUpdateResponse, UnreadCountResponse},
    error::Result,
    models::user::Caller,
    AppState,
};

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.notification_service.list(&caller.id).await?))
}

#[axum::debug_handler]
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse> {
    let count = state.notification_service.unread_count(&caller.id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.notification_service.mark_as_read(id, &caller.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse> {
    let affected = state.notification_service.mark_all_as_read(&caller.id).await?;
    Ok(Json(BulkUpdateResponse { affected }))
}

#[axum::debug_handler]
pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.notification_service.delete(id, &caller.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn delete_all_notifications(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse> {
    let affected = state.notification_service.delete_all(&caller.id).await?;
    Ok(Json(BulkUpdateResponse { affected }))
}
