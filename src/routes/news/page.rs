use axum::{extract::State, response::Response};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::{
    AppState,
    error::AppResult,
    extractors::PageParams,
    middleware::CurrentUser,
    render::{render_error, render_page},
    routes::{
        PageQuery,
        event::MovieEvent,
        news::model::{About, News},
    },
};

async fn index_data(state: &AppState) -> AppResult<serde_json::Value> {
    let latest = News::list(&state.pool, &PageQuery::default()).await?;
    Ok(json!({
        "about": About::from_config(&state.config),
        "news": latest.items,
        "events": MovieEvent::list_upcoming(&state.pool).await?,
    }))
}

// 首页
pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
    user: Option<CurrentUser>,
) -> Response {
    match index_data(&state).await {
        Ok(data) => render_page(&state, jar, user.as_ref(), "index", data),
        Err(e) => render_error(&state, e),
    }
}

pub async fn news(
    State(state): State<AppState>,
    jar: CookieJar,
    user: Option<CurrentUser>,
    PageParams(query): PageParams<PageQuery>,
) -> Response {
    match News::list(&state.pool, &query).await {
        Ok(news) => render_page(&state, jar, user.as_ref(), "news", json!({ "news": news })),
        Err(e) => render_error(&state, e),
    }
}
