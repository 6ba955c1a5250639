use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    error::AppResult,
    extractors::ApiJson,
    routes::application::model::{ApplyRequest, MemberApplication},
    utils::{ApiResponse, message_to_api_response},
};

// 提交入会申请，无需登录
pub async fn apply(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ApplyRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<MemberApplication>>)> {
    let application = MemberApplication::submit(&state.pool, req).await?;
    Ok((
        StatusCode::CREATED,
        message_to_api_response("申请已提交，等待审核", application),
    ))
}
