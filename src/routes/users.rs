use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::user_dto::{SyncUserPayload, UserListQuery},
    error::Result,
    models::user::Caller,
    AppState,
};

#[axum::debug_handler]
pub async fn sync_me(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<SyncUserPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state
        .user_service
        .sync(&caller, payload.name, payload.email, payload.image)
        .await?;
    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.user_service.get(&id).await?))
}

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.user_service.list(query.role).await?))
}
