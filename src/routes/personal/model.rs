use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::{
    error::{AppError, AppResult, is_unique_violation},
    middleware::CurrentUser,
    storage::{FileStore, is_safe_category},
};

pub const DEFAULT_CONTEST: &str = "default";

#[derive(Debug, Serialize, FromRow)]
pub struct Photo {
    pub id: i64,
    pub user_id: i64,
    pub filename: String,
    pub realname: Option<String>,
    pub contest: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Collection {
    pub id: i64,
    pub user_id: i64,
    pub item_type: String,
    pub item_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum CollectOutcome {
    Collected(Collection),
    AlreadyCollected,
}

/// 可收藏的对象类型及其所在的表
fn collectable_table(item_type: &str) -> Option<&'static str> {
    match item_type {
        "news" => Some("news"),
        "log" => Some("logs"),
        "movie" => Some("movies"),
        _ => None,
    }
}

impl Photo {
    /// 保存上传文件并记录到当前用户名下
    pub async fn upload(
        pool: &SqlitePool,
        files: &dyn FileStore,
        actor: &CurrentUser,
        contest: Option<&str>,
        original_name: &str,
        data: &[u8],
    ) -> AppResult<Self> {
        if data.is_empty() {
            return Err(AppError::validation("未选择文件"));
        }

        let contest = contest
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CONTEST);
        if !is_safe_category(contest) {
            return Err(AppError::validation("无效的比赛名称"));
        }

        let filename = files.store(contest, original_name, data).await?;

        let inserted = sqlx::query_as::<_, Photo>(
            r#"
            INSERT INTO photos (user_id, filename, realname, contest, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, user_id, filename, realname, contest, uploaded_at
            "#,
        )
        .bind(actor.id)
        .bind(&filename)
        .bind(Some(original_name).filter(|n| !n.is_empty()))
        .bind(contest)
        .bind(Utc::now())
        .fetch_one(pool)
        .await;

        // 记录写入失败时清理已保存的文件
        let photo = match inserted {
            Ok(photo) => photo,
            Err(e) => {
                if let Err(cleanup) = files.remove(contest, &filename).await {
                    tracing::warn!("Failed to remove orphaned upload {}: {}", filename, cleanup);
                }
                return Err(e.into());
            }
        };

        tracing::info!("User {} uploaded photo {} to {}", actor.id, filename, contest);
        Ok(photo)
    }

    pub async fn list_own(pool: &SqlitePool, actor: &CurrentUser) -> AppResult<Vec<Self>> {
        let photos = sqlx::query_as::<_, Photo>(
            r#"
            SELECT id, user_id, filename, realname, contest, uploaded_at
            FROM photos
            WHERE user_id = ?1
            ORDER BY uploaded_at DESC, id DESC
            "#,
        )
        .bind(actor.id)
        .fetch_all(pool)
        .await?;

        Ok(photos)
    }
}

impl Collection {
    pub async fn collect(
        pool: &SqlitePool,
        actor: &CurrentUser,
        item_type: &str,
        item_id: i64,
    ) -> AppResult<CollectOutcome> {
        let table = collectable_table(item_type)
            .ok_or_else(|| AppError::validation("不支持收藏该类型"))?;

        let exists: Option<(i64,)> =
            sqlx::query_as(&format!("SELECT id FROM {table} WHERE id = ?1"))
                .bind(item_id)
                .fetch_optional(pool)
                .await?;
        if exists.is_none() {
            return Err(AppError::not_found("收藏的对象不存在"));
        }

        let result = sqlx::query_as::<_, Collection>(
            r#"
            INSERT INTO collections (user_id, item_type, item_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, user_id, item_type, item_id, created_at
            "#,
        )
        .bind(actor.id)
        .bind(item_type)
        .bind(item_id)
        .bind(Utc::now())
        .fetch_one(pool)
        .await;

        match result {
            Ok(collection) => Ok(CollectOutcome::Collected(collection)),
            Err(e) if is_unique_violation(&e) => Ok(CollectOutcome::AlreadyCollected),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_own(pool: &SqlitePool, actor: &CurrentUser) -> AppResult<Vec<Self>> {
        let collections = sqlx::query_as::<_, Collection>(
            r#"
            SELECT id, user_id, item_type, item_id, created_at
            FROM collections
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(actor.id)
        .fetch_all(pool)
        .await?;

        Ok(collections)
    }
}
