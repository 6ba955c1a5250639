use axum::{extract::State, response::Response};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::{
    AppState,
    error::AppResult,
    extractors::{PageForm, PageParams},
    middleware::CurrentUser,
    render::{PageUser, flash_error, flash_redirect, render_error, render_page},
    routes::{
        admin::model::{DashboardStats, MemberRoster},
        application::{ApplicationFilter, MemberApplication, ReviewApplicationRequest, ReviewOutcome},
        event::MovieEvent,
        movie::Movie,
    },
};

const APPLICATIONS: &str = "/admin/applications";

async fn dashboard_data(state: &AppState, user: &CurrentUser) -> AppResult<serde_json::Value> {
    Ok(json!({
        "stats": DashboardStats::collect(&state.pool, user).await?,
        "movies": Movie::all(&state.pool).await?,
        "events": MovieEvent::list_all(&state.pool, user).await?,
    }))
}

// 管理后台
pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
) -> Response {
    match dashboard_data(&state, &user).await {
        Ok(data) => render_page(&state, jar, Some(&user), "admin_dashboard", data),
        Err(e) => render_error(&state, e),
    }
}

// 会员管理
pub async fn members(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
) -> Response {
    match MemberRoster::collect(&state.pool, &user).await {
        Ok(roster) => render_page(&state, jar, Some(&user), "admin_members", json!(roster)),
        Err(e) => render_error(&state, e),
    }
}

pub async fn applications(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
    PageParams(filter): PageParams<ApplicationFilter>,
) -> Response {
    match MemberApplication::list(&state.pool, &user, &filter).await {
        Ok(applications) => render_page(
            &state,
            jar,
            Some(&user),
            "admin_applications",
            json!({ "applications": applications }),
        ),
        Err(e) => render_error(&state, e),
    }
}

// 审核表单；通过时把激活码展示给管理员转交申请人
pub async fn apply_approve(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
    PageForm(req): PageForm<ReviewApplicationRequest>,
) -> Response {
    match MemberApplication::review(&state.pool, &user, req, state.config.bcrypt_cost).await {
        Ok(outcome) => {
            let message = match &outcome {
                ReviewOutcome::Approved { account, .. } => format!(
                    "{}，用户名：{}，激活码：{}",
                    outcome.message(),
                    account.username,
                    account.setup_token
                ),
                _ => outcome.message(),
            };
            flash_redirect(jar, APPLICATIONS, message)
        }
        Err(e) => flash_error(jar, APPLICATIONS, e),
    }
}
