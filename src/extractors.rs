//! 请求提取器：参数错误统一走 AppError，接口端返回 ApiResponse，页面端回到来源页提示。

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{HeaderMap, Method, Uri, header, request::Parts},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use serde::de::DeserializeOwned;

use crate::{
    AppState,
    error::AppError,
    render::{flash_error, render_error},
};

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// 来源页路径；只取 Referer 的路径部分，缺失时回到首页
fn referring_page(headers: &HeaderMap) -> String {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Uri>().ok())
        .map(|uri| match uri.query() {
            Some(query) => format!("{}?{}", uri.path(), query),
            None => uri.path().to_string(),
        })
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
        .unwrap_or_else(|| "/".to_string())
}

// GET 请求展示错误页，表单提交则带着提示回到来源页
fn page_rejection(parts: &Parts, state: &AppState, err: AppError) -> Response {
    if parts.method == Method::GET {
        render_error(state, err)
    } else {
        flash_error(
            CookieJar::from_headers(&parts.headers),
            &referring_page(&parts.headers),
            err,
        )
    }
}

/// 页面表单
pub struct PageForm<T>(pub T);

impl<S, T> FromRequest<S> for PageForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(req.headers());
        let back = referring_page(req.headers());

        match axum::Form::<T>::from_request(req, state).await {
            Ok(axum::Form(value)) => Ok(PageForm(value)),
            Err(rejection) => Err(flash_error(jar, &back, rejection.into())),
        }
    }
}

/// 页面路径参数
pub struct PagePath<T>(pub T);

impl<T> FromRequestParts<AppState> for PagePath<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(PagePath(value)),
            Err(rejection) => Err(page_rejection(parts, state, rejection.into())),
        }
    }
}

/// 页面查询参数
pub struct PageParams<T>(pub T);

impl<T> FromRequestParts<AppState> for PageParams<T>
where
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(PageParams(value)),
            Err(rejection) => Err(page_rejection(parts, state, rejection.into())),
        }
    }
}
