use std::sync::Arc;

use config::Config;
use render::Renderer;
use sqlx::SqlitePool;
use storage::FileStore;

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod render;
pub mod router;
pub mod routes;
pub mod storage;
pub mod utils;

pub use router::create_router;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub renderer: Arc<dyn Renderer>,
    pub files: Arc<dyn FileStore>,
}

impl AppState {
    /// 使用默认渲染器与本地文件存储
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let renderer = Arc::new(render::ShellRenderer::new(config.club_name.clone()));
        let files = Arc::new(storage::LocalFileStore::new(config.upload_dir.clone()));
        Self {
            pool,
            config,
            renderer,
            files,
        }
    }
}
