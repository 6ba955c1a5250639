use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// 上传文件存储
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    /// 保存文件并返回生成的唯一文件名
    async fn store(&self, category: &str, original_name: &str, data: &[u8]) -> AppResult<String>;

    /// 删除已保存的文件
    async fn remove(&self, category: &str, filename: &str) -> AppResult<()>;
}

/// 本地磁盘存储，路径为 `<base>/<category>/<uuid><ext>`
pub struct LocalFileStore {
    base_path: PathBuf,
}

impl LocalFileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

/// 分类名只允许字母、数字、下划线和短横线
pub fn is_safe_category(category: &str) -> bool {
    !category.is_empty()
        && category.len() <= 64
        && category
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, category: &str, original_name: &str, data: &[u8]) -> AppResult<String> {
        if !is_safe_category(category) {
            return Err(AppError::validation("无效的分类名称"));
        }

        let filename = format!("{}{}", Uuid::new_v4(), extension_of(original_name));
        let dir = self.base_path.join(category);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&filename), data).await?;

        tracing::debug!("Stored upload {} under {}", filename, dir.display());
        Ok(filename)
    }

    async fn remove(&self, category: &str, filename: &str) -> AppResult<()> {
        let plain_name = Path::new(filename).file_name() == Some(OsStr::new(filename));
        if !is_safe_category(category) || !plain_name {
            return Err(AppError::validation("无效的文件名"));
        }

        tokio::fs::remove_file(self.base_path.join(category).join(filename)).await?;
        Ok(())
    }
}
