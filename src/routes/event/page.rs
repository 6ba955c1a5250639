use axum::{extract::State, response::Response};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::{
    AppState,
    error::AppResult,
    extractors::{PageForm, PagePath},
    middleware::CurrentUser,
    render::{PageUser, flash_error, flash_redirect, render_error, render_page},
    routes::{
        event::model::{EventInput, MovieEvent, Registration},
        movie::Movie,
    },
};

const EVENTS: &str = "/movie/events";

async fn events_data(state: &AppState) -> AppResult<serde_json::Value> {
    Ok(json!({
        "events": MovieEvent::list_upcoming(&state.pool).await?,
        // 管理员添加活动时选择关联电影
        "movies": Movie::all(&state.pool).await?,
    }))
}

pub async fn events(
    State(state): State<AppState>,
    jar: CookieJar,
    user: Option<CurrentUser>,
) -> Response {
    match events_data(&state).await {
        Ok(data) => render_page(&state, jar, user.as_ref(), "events", data),
        Err(e) => render_error(&state, e),
    }
}

pub async fn add_event(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
    PageForm(input): PageForm<EventInput>,
) -> Response {
    let capacity = state.config.default_event_capacity;
    match MovieEvent::create(&state.pool, &user, input, capacity).await {
        Ok(_) => flash_redirect(jar, EVENTS, "添加活动成功！"),
        Err(e) => flash_error(jar, EVENTS, e),
    }
}

pub async fn delete_event(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
    PagePath(event_id): PagePath<i64>,
) -> Response {
    match MovieEvent::delete(&state.pool, &user, event_id).await {
        Ok(()) => flash_redirect(jar, EVENTS, "删除活动成功！"),
        Err(e) => flash_error(jar, EVENTS, e),
    }
}

pub async fn event_detail(
    State(state): State<AppState>,
    jar: CookieJar,
    user: Option<CurrentUser>,
    PagePath(event_id): PagePath<i64>,
) -> Response {
    match MovieEvent::detail(&state.pool, event_id).await {
        Ok(detail) => render_page(&state, jar, user.as_ref(), "event_detail", json!(detail)),
        Err(e) => render_error(&state, e),
    }
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
    PagePath(event_id): PagePath<i64>,
) -> Response {
    let back = format!("/movie/event/{}", event_id);
    match Registration::register(&state.pool, &user, event_id).await {
        Ok(_) => flash_redirect(jar, &back, "活动报名成功！"),
        Err(e) => flash_error(jar, &back, e),
    }
}
