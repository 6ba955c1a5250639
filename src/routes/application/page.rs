use axum::{extract::State, response::Response};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::{
    AppState,
    extractors::PageForm,
    middleware::CurrentUser,
    render::{flash_error, flash_redirect, render_page},
    routes::application::model::{ApplyRequest, MemberApplication},
};

pub async fn apply_page(
    State(state): State<AppState>,
    jar: CookieJar,
    user: Option<CurrentUser>,
) -> Response {
    render_page(&state, jar, user.as_ref(), "apply", json!({}))
}

pub async fn apply(
    State(state): State<AppState>,
    jar: CookieJar,
    PageForm(req): PageForm<ApplyRequest>,
) -> Response {
    match MemberApplication::submit(&state.pool, req).await {
        Ok(_) => flash_redirect(jar, "/apply", "申请已提交，等待审核"),
        Err(e) => flash_error(jar, "/apply", e),
    }
}
