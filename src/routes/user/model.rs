use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, AppResult, is_unique_violation},
    middleware::CurrentUser,
    utils::{
        digest_setup_token, generate_setup_token, generate_token, hash_password, required,
        verify_password,
    },
};

const USER_COLUMNS: &str = "id, username, password_hash, role, nickname, avatar, tags, \
     favorite_genres, favorite_directors, member_level, join_date, must_reset_password, setup_token_hash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Sysadmin,
    Admin,
    Member,
    Guest,
}

impl Role {
    /// 系统管理员与一般管理员都可以执行管理操作
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::Sysadmin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Sysadmin => "sysadmin",
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Guest => "guest",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sysadmin" => Ok(Role::Sysadmin),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            "guest" => Ok(Role::Guest),
            other => Err(AppError::validation(format!("未知角色: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub tags: Option<String>,
    pub favorite_genres: Option<String>,
    pub favorite_directors: Option<String>,
    pub member_level: String,
    pub join_date: DateTime<Utc>,
    pub must_reset_password: bool,
    #[serde(skip_serializing)]
    pub setup_token_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub username: Option<String>,
    pub setup_token: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub nickname: Option<String>,
    pub tags: Option<String>,
    pub favorite_genres: Option<String>,
    pub favorite_directors: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub user_id: Option<i64>,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub role: Role,
    pub token: String,
    pub expires_at: i64,
}

impl LoginResponse {
    /// 为已通过校验的用户签发会话令牌
    pub fn issue(user: &User, config: &Config) -> AppResult<Self> {
        let (token, expires_at) = generate_token(user.id, config)?;
        Ok(Self {
            user_id: user.id,
            role: user.role,
            token,
            expires_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub username: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub tags: Option<String>,
    pub favorite_genres: Option<String>,
    pub favorite_directors: Option<String>,
    pub member_level: String,
    pub join_date: DateTime<Utc>,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            nickname: user.nickname,
            avatar: user.avatar,
            tags: user.tags,
            favorite_genres: user.favorite_genres,
            favorite_directors: user.favorite_directors,
            member_level: user.member_level,
            join_date: user.join_date,
        }
    }
}

/// 好友搜索列表中的一项
#[derive(Debug, Serialize, FromRow)]
pub struct UserListItem {
    pub id: i64,
    pub username: String,
    pub nickname: String,
    pub tags: Option<String>,
    pub is_friend: bool,
}

/// 管理端用户列表
#[derive(Debug, Serialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub nickname: Option<String>,
    pub join_date: DateTime<Utc>,
}

/// 密码长度限制
pub fn validate_password(password: &str) -> AppResult<()> {
    let len = password.chars().count();
    if !(6..=64).contains(&len) {
        return Err(AppError::validation("密码长度必须在6到64个字符之间"));
    }
    Ok(())
}

/// 用户名只允许字母、数字、下划线
pub fn validate_username(username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if len == 0 || len > 32 {
        return Err(AppError::validation("用户名长度必须在1到32个字符之间"));
    }
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(AppError::validation(
            "用户名格式无效，只允许使用字母、数字和下划线",
        ));
    }
    Ok(())
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl User {
    pub async fn create(
        pool: &SqlitePool,
        username: &str,
        password: &str,
        role: Role,
        bcrypt_cost: u32,
    ) -> AppResult<Self> {
        let password_hash = hash_password(password, bcrypt_cost)?;

        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash, role, join_date)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => Err(AppError::conflict("用户名已存在")),
            Err(e) => Err(e.into()),
        }
    }

    /// 审核通过时开通的账号：密码不可用，必须先用激活码设置密码
    pub async fn create_pending_activation(
        conn: &mut SqliteConnection,
        username: &str,
        nickname: Option<&str>,
        bcrypt_cost: u32,
    ) -> AppResult<(Self, String)> {
        let unusable_hash = hash_password(&Uuid::new_v4().to_string(), bcrypt_cost)?;
        let (setup_token, token_digest) = generate_setup_token();

        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash, role, nickname, join_date,
                               must_reset_password, setup_token_hash)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(unusable_hash)
        .bind(Role::Member)
        .bind(nickname)
        .bind(Utc::now())
        .bind(token_digest)
        .fetch_one(&mut *conn)
        .await;

        match result {
            Ok(user) => Ok((user, setup_token)),
            Err(e) if is_unique_violation(&e) => Err(AppError::conflict("用户名已存在")),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_username(pool: &SqlitePool, username: &str) -> AppResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn register(
        pool: &SqlitePool,
        req: CredentialsRequest,
        bcrypt_cost: u32,
    ) -> AppResult<Self> {
        let (Some(username), Some(password)) = (
            required(req.username.as_deref()),
            req.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(AppError::validation("用户名和密码不能为空"));
        };
        validate_username(username)?;
        validate_password(password)?;

        let user = Self::create(pool, username, password, Role::Member, bcrypt_cost).await?;
        tracing::info!("Registered user {} (id {})", user.username, user.id);
        Ok(user)
    }

    pub async fn login(pool: &SqlitePool, req: &CredentialsRequest) -> AppResult<Self> {
        let (Some(username), Some(password)) = (
            required(req.username.as_deref()),
            req.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(AppError::validation("用户名和密码不能为空"));
        };

        let Some(user) = Self::find_by_username(pool, username).await? else {
            return Err(AppError::Authentication("用户名或密码错误".into()));
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Authentication("用户名或密码错误".into()));
        }

        if user.must_reset_password {
            return Err(AppError::Authentication(
                "账号尚未激活，请先使用激活码设置密码".into(),
            ));
        }

        Ok(user)
    }

    /// 使用审核时下发的激活码设置首个密码
    pub async fn activate(
        pool: &SqlitePool,
        req: ActivateRequest,
        bcrypt_cost: u32,
    ) -> AppResult<Self> {
        let (Some(username), Some(token), Some(new_password)) = (
            required(req.username.as_deref()),
            required(req.setup_token.as_deref()),
            req.new_password.as_deref(),
        ) else {
            return Err(AppError::validation("用户名、激活码和新密码不能为空"));
        };
        validate_password(new_password)?;

        let invalid = || AppError::Authentication("激活码无效".into());
        let user = Self::find_by_username(pool, username)
            .await?
            .ok_or_else(invalid)?;

        match (&user.setup_token_hash, user.must_reset_password) {
            (Some(stored), true) if *stored == digest_setup_token(token) => {}
            _ => return Err(invalid()),
        }

        let password_hash = hash_password(new_password, bcrypt_cost)?;
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET password_hash = ?1, must_reset_password = 0, setup_token_hash = NULL
            WHERE id = ?2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(password_hash)
        .bind(user.id)
        .fetch_one(pool)
        .await?;

        tracing::info!("Activated account {} (id {})", user.username, user.id);
        Ok(user)
    }

    pub async fn profile(pool: &SqlitePool, actor: &CurrentUser) -> AppResult<Profile> {
        let user = Self::find_by_id(pool, actor.id)
            .await?
            .ok_or_else(|| AppError::not_found("用户不存在"))?;
        Ok(user.into())
    }

    /// 未提供的字段保持原值
    pub async fn update_profile(
        pool: &SqlitePool,
        actor: &CurrentUser,
        req: UpdateProfileRequest,
    ) -> AppResult<Profile> {
        if let Some(nickname) = req.nickname.as_deref() {
            if nickname.chars().count() > 32 {
                return Err(AppError::validation("昵称不能超过32个字符"));
            }
        }

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET nickname = COALESCE(?1, nickname),
                tags = COALESCE(?2, tags),
                favorite_genres = COALESCE(?3, favorite_genres),
                favorite_directors = COALESCE(?4, favorite_directors)
            WHERE id = ?5
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(clean(req.nickname))
        .bind(clean(req.tags))
        .bind(clean(req.favorite_genres))
        .bind(clean(req.favorite_directors))
        .bind(actor.id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("用户不存在"))?;

        Ok(user.into())
    }

    /// 除自己以外的所有用户，并标记是否已添加为好友
    pub async fn list_others(pool: &SqlitePool, actor: &CurrentUser) -> AppResult<Vec<UserListItem>> {
        let users = sqlx::query_as::<_, UserListItem>(
            r#"
            SELECT u.id, u.username,
                   COALESCE(u.nickname, u.username) AS nickname,
                   u.tags,
                   EXISTS (
                       SELECT 1 FROM friendships f
                       WHERE f.user_id = ?1 AND f.friend_id = u.id
                   ) AS is_friend
            FROM users u
            WHERE u.id <> ?1
            ORDER BY u.id
            "#,
        )
        .bind(actor.id)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn list_all(pool: &SqlitePool, actor: &CurrentUser) -> AppResult<Vec<UserSummary>> {
        actor.require_admin()?;

        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, role, nickname, join_date FROM users ORDER BY join_date DESC, id DESC",
        )
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn set_role(
        pool: &SqlitePool,
        actor: &CurrentUser,
        req: SetRoleRequest,
    ) -> AppResult<UserSummary> {
        actor.require_admin()?;

        let (Some(user_id), Some(role)) = (req.user_id, required(req.role.as_deref())) else {
            return Err(AppError::validation("用户ID和角色不能为空"));
        };
        let role: Role = role.parse()?;

        // 只有系统管理员可以授予或变更系统管理员
        if actor.role != Role::Sysadmin {
            let target = Self::find_by_id(pool, user_id).await?;
            if role == Role::Sysadmin || target.is_some_and(|u| u.role == Role::Sysadmin) {
                return Err(AppError::forbidden());
            }
        }

        let user = sqlx::query_as::<_, UserSummary>(
            r#"
            UPDATE users SET role = ?1 WHERE id = ?2
            RETURNING id, username, role, nickname, join_date
            "#,
        )
        .bind(role)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("用户不存在"))?;

        tracing::info!(
            "User {} changed role of {} (id {}) to {}",
            actor.username,
            user.username,
            user.id,
            role
        );
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_known_values() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" member ".parse::<Role>().unwrap(), Role::Member);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn only_admin_roles_administer() {
        assert!(Role::Admin.is_admin());
        assert!(Role::Sysadmin.is_admin());
        assert!(!Role::Member.is_admin());
        assert!(!Role::Guest.is_admin());
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn password_length_rules() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }
}
