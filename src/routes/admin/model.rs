use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    routes::{
        application::MemberApplication,
        event::MovieEvent,
        movie::Movie,
        user::{User, UserSummary},
    },
};

/// 管理后台首页的统计数字
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub pending_applications: i64,
    pub users: i64,
    pub movies: i64,
    pub events: i64,
}

impl DashboardStats {
    pub async fn collect(pool: &SqlitePool, actor: &CurrentUser) -> AppResult<Self> {
        actor.require_admin()?;

        let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(Self {
            pending_applications: MemberApplication::count_pending(pool).await?,
            users,
            movies: Movie::count(pool).await?,
            events: MovieEvent::count(pool).await?,
        })
    }
}

/// 会员管理：管理员与其他成员分开列出
#[derive(Debug, Serialize)]
pub struct MemberRoster {
    pub admins: Vec<UserSummary>,
    pub members: Vec<UserSummary>,
    pub admin_count: usize,
    pub member_count: usize,
}

impl MemberRoster {
    pub async fn collect(pool: &SqlitePool, actor: &CurrentUser) -> AppResult<Self> {
        let (admins, members): (Vec<_>, Vec<_>) = User::list_all(pool, actor)
            .await?
            .into_iter()
            .partition(|u| u.role.is_admin());

        Ok(Self {
            admin_count: admins.len(),
            member_count: members.len(),
            admins,
            members,
        })
    }
}
