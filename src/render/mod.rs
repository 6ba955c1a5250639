//! 页面端的展示适配：渲染数据包、闪现消息与重定向。

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{Value, json};

use crate::{
    AppState,
    error::{AppError, AppResult},
    middleware::CurrentUser,
};

const FLASH_COOKIE: &str = "flash";

/// 模板渲染边界：给定视图名与数据包，产出 HTML
pub trait Renderer: Send + Sync {
    fn render(&self, view: &str, data: &Value) -> AppResult<String>;
}

/// 默认渲染器：输出页面骨架，把数据包以 JSON 形式嵌入给前端脚本使用
pub struct ShellRenderer {
    site_title: String,
}

impl ShellRenderer {
    pub fn new(site_title: impl Into<String>) -> Self {
        Self {
            site_title: site_title.into(),
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 嵌入 <script> 的 JSON 不能出现可闭合标签的字符
fn escape_script_json(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

impl Renderer for ShellRenderer {
    fn render(&self, view: &str, data: &Value) -> AppResult<String> {
        let payload = serde_json::to_string(data).map_err(|e| AppError::Render(e.to_string()))?;

        Ok(format!(
            "<!DOCTYPE html>\n<html lang=\"zh-CN\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{title}</title>\n<script src=\"/static/js/app.js\" defer></script>\n</head>\n\
             <body data-view=\"{view}\">\n<div id=\"app\"></div>\n\
             <script type=\"application/json\" id=\"page-data\">{payload}</script>\n</body>\n</html>\n",
            title = escape_html(&self.site_title),
            view = escape_html(view),
            payload = escape_script_json(&payload),
        ))
    }
}

/// 闪现消息以十六进制编码写入 Cookie，避免非 ASCII 字符
pub fn flash_redirect(jar: CookieJar, to: &str, message: impl AsRef<str>) -> Response {
    let cookie = Cookie::build((FLASH_COOKIE, hex::encode(message.as_ref())))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    (jar.add(cookie), Redirect::to(to)).into_response()
}

/// 失败时把错误转成闪现消息；服务端错误只提示通用信息
pub fn flash_error(jar: CookieJar, to: &str, err: AppError) -> Response {
    if err.status_code().is_server_error() {
        tracing::error!("页面请求处理失败: {}", err);
    }
    flash_redirect(jar, to, err.public_message())
}

/// 读取并清除闪现消息
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    let message = jar
        .get(FLASH_COOKIE)
        .and_then(|c| hex::decode(c.value()).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok());

    match message {
        Some(message) => (
            jar.remove(Cookie::build(FLASH_COOKIE).path("/").build()),
            Some(message),
        ),
        None => (jar, None),
    }
}

/// 渲染页面；数据包中自动附带当前用户与闪现消息
pub fn render_page(
    state: &AppState,
    jar: CookieJar,
    user: Option<&CurrentUser>,
    view: &str,
    mut data: Value,
) -> Response {
    let (jar, flash) = take_flash(jar);

    if let Value::Object(map) = &mut data {
        map.insert("flash".into(), json!(flash));
        map.insert(
            "user".into(),
            json!(user.map(|u| json!({
                "id": u.id,
                "username": u.username,
                "nickname": u.display_name(),
                "role": u.role,
            }))),
        );
    }

    match state.renderer.render(view, &data) {
        Ok(html) => (jar, Html(html)).into_response(),
        Err(e) => render_error(state, e),
    }
}

/// 页面端 GET 请求的错误页
pub fn render_error(state: &AppState, err: AppError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!("页面渲染失败: {}", err);
    }

    let data = json!({ "status": status.as_u16(), "message": err.public_message() });
    match state.renderer.render("error", &data) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "服务器内部错误").into_response(),
    }
}

/// 页面端登录用户；未登录时跳转到登录页
pub struct PageUser(pub CurrentUser);

impl<S> FromRequestParts<S> for PageUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<CurrentUser>().cloned() {
            Some(user) => Ok(PageUser(user)),
            None => Err(flash_redirect(
                CookieJar::from_headers(&parts.headers),
                "/login",
                "请先登录",
            )),
        }
    }
}
