use axum::{
    Json,
    extract::State,
};

use crate::{
    AppState,
    error::AppResult,
    extractors::{ApiPath, ApiQuery},
    routes::{
        PageQuery, Paginated,
        news::model::{About, News},
    },
    utils::{ApiResponse, success_to_api_response},
};

// 协会简介
pub async fn about(State(state): State<AppState>) -> Json<ApiResponse<About>> {
    success_to_api_response(About::from_config(&state.config))
}

// 新闻分页
pub async fn list_news(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> AppResult<Json<ApiResponse<Paginated<News>>>> {
    let news = News::list(&state.pool, &query).await?;
    Ok(success_to_api_response(news))
}

pub async fn news_detail(
    State(state): State<AppState>,
    ApiPath(news_id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<News>>> {
    let news = News::find_by_id(&state.pool, news_id).await?;
    Ok(success_to_api_response(news))
}
