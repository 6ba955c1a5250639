use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    middleware::CurrentUser,
    routes::{PageQuery, Paginated},
    utils::required,
};

pub const NEWS_PER_PAGE: i64 = 10;
pub const MAX_NEWS_PER_PAGE: i64 = 50;

#[derive(Debug, Serialize, FromRow)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNewsRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct About {
    pub title: String,
    pub intro: String,
}

impl About {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.club_name.clone(),
            intro: config.club_intro.clone(),
        }
    }
}

const NEWS_CATEGORIES: [&str; 3] = ["announcement", "review", "industry_news"];

impl News {
    pub async fn list(pool: &SqlitePool, query: &PageQuery) -> AppResult<Paginated<Self>> {
        let (page, per_page, offset) = query.resolve(NEWS_PER_PAGE, MAX_NEWS_PER_PAGE);

        let items = sqlx::query_as::<_, News>(
            r#"
            SELECT id, title, content, category, created_at
            FROM news
            ORDER BY created_at DESC, id DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM news")
            .fetch_one(pool)
            .await?;

        Ok(Paginated {
            items,
            total,
            page,
            per_page,
        })
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Self> {
        sqlx::query_as::<_, News>(
            "SELECT id, title, content, category, created_at FROM news WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("未找到新闻"))
    }

    pub async fn create(
        pool: &SqlitePool,
        actor: &CurrentUser,
        req: CreateNewsRequest,
    ) -> AppResult<Self> {
        actor.require_admin()?;

        let title = required(req.title.as_deref())
            .ok_or_else(|| AppError::validation("新闻标题不能为空"))?;

        let category = required(req.category.as_deref()).unwrap_or("announcement");
        if !NEWS_CATEGORIES.contains(&category) {
            return Err(AppError::validation("未知的新闻分类"));
        }

        let news = sqlx::query_as::<_, News>(
            r#"
            INSERT INTO news (title, content, category, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, title, content, category, created_at
            "#,
        )
        .bind(title)
        .bind(required(req.content.as_deref()))
        .bind(category)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        tracing::info!("Admin {} published news {}", actor.username, news.id);
        Ok(news)
    }
}
