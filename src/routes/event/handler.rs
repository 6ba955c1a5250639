use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use crate::{
    AppState,
    error::AppResult,
    extractors::ApiPath,
    middleware::CurrentUser,
    routes::event::model::{EventDetail, MovieEvent, Registration},
    utils::{ApiResponse, message_to_api_response, success_to_api_response},
};

// 即将开始的活动
pub async fn list_events(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<MovieEvent>>>> {
    let events = MovieEvent::list_upcoming(&state.pool).await?;
    Ok(success_to_api_response(events))
}

pub async fn event_detail(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<EventDetail>>> {
    let detail = MovieEvent::detail(&state.pool, event_id).await?;
    Ok(success_to_api_response(detail))
}

// 报名活动
pub async fn register(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(event_id): ApiPath<i64>,
) -> AppResult<(StatusCode, Json<ApiResponse<Registration>>)> {
    let registration = Registration::register(&state.pool, &user, event_id).await?;
    Ok((
        StatusCode::CREATED,
        message_to_api_response("活动报名成功！", registration),
    ))
}
