use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
};

use crate::{
    AppState,
    error::{AppError, AppResult},
    extractors::ApiPath,
    middleware::CurrentUser,
    routes::personal::model::{CollectOutcome, Collection, Photo},
    utils::{ApiResponse, message_to_api_response, success_to_api_response},
};

fn bad_upload(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::validation(format!("上传内容无效: {}", e.body_text()))
}

// 上传会员照片，表单字段 file 与 contest
pub async fn upload_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<Photo>>)> {
    let mut multipart = multipart?;
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut contest: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(bad_upload)?;
                file = Some((original_name, data.to_vec()));
            }
            "contest" => {
                contest = Some(field.text().await.map_err(bad_upload)?);
            }
            _ => {}
        }
    }

    let Some((original_name, data)) = file else {
        return Err(AppError::validation("未选择文件"));
    };

    let photo = Photo::upload(
        &state.pool,
        state.files.as_ref(),
        &user,
        contest.as_deref(),
        &original_name,
        &data,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        message_to_api_response("上传成功", photo),
    ))
}

pub async fn list_photos(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Photo>>>> {
    let photos = Photo::list_own(&state.pool, &user).await?;
    Ok(success_to_api_response(photos))
}

// 收藏新闻、日志或电影
pub async fn collect(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath((item_type, item_id)): ApiPath<(String, i64)>,
) -> AppResult<Json<ApiResponse<Option<Collection>>>> {
    let response = match Collection::collect(&state.pool, &user, &item_type, item_id).await? {
        CollectOutcome::Collected(collection) => {
            message_to_api_response("收藏成功", Some(collection))
        }
        CollectOutcome::AlreadyCollected => message_to_api_response("已收藏", None),
    };
    Ok(response)
}

pub async fn list_collections(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Collection>>>> {
    let collections = Collection::list_own(&state.pool, &user).await?;
    Ok(success_to_api_response(collections))
}
