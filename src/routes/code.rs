use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::code_dto::{AnalysisResponse, AnalyzeCodePayload, ExecuteCodePayload},
    error::Result,
    AppState,
};

#[axum::debug_handler]
pub async fn execute_code(
    State(state): State<AppState>,
    Json(payload): Json<ExecuteCodePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let result = state.code_execution_service.execute(payload.into()).await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn analyze_code(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeCodePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let verdict = state.plagiarism_service.analyze(payload.into()).await;
    Ok(Json(AnalysisResponse::from(verdict)))
}
