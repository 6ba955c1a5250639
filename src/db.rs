use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::config::Config;
use crate::error::AppResult;
use crate::routes::user::{Role, User};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// 建立数据库连接池；内存库只能使用单个常驻连接，文件库开启 WAL 并在写锁被占用时等待
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                options
                    .journal_mode(SqliteJournalMode::Wal)
                    .busy_timeout(BUSY_TIMEOUT),
            )
            .await?
    };

    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// 根据配置确保初始管理员账号存在
pub async fn ensure_admin(pool: &SqlitePool, config: &Config) -> AppResult<()> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    if User::find_by_username(pool, username).await?.is_some() {
        tracing::debug!("Bootstrap admin {} already exists", username);
        return Ok(());
    }

    let user = User::create(pool, username, password, Role::Admin, config.bcrypt_cost).await?;
    tracing::info!("Created bootstrap admin account {} (id {})", user.username, user.id);
    Ok(())
}
