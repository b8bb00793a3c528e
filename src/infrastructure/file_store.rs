//! 外部文件存储 - 基础设施层
//!
//! 按文件夹 + 精确文件名查询条目，按 ID 下载到本地路径。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::FileStoreError;
use crate::models::ContentItem;

/// 文件存储接口
#[async_trait]
pub trait FileStore: Send + Sync {
    /// 在文件夹中按精确文件名查询，不存在时返回 None
    async fn find_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<ContentItem>, FileStoreError>;

    /// 下载条目到 `dest`，返回写入的字节数
    async fn download(&self, item: &ContentItem, dest: &Path) -> Result<u64, FileStoreError>;
}

/// 本地目录存储
///
/// 文件夹 ID 即 `root` 下的子目录名，条目 ID 为 `<folder>/<name>`。
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn io_error(path: &Path, source: std::io::Error) -> FileStoreError {
        FileStoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn find_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<ContentItem>, FileStoreError> {
        let path = self.root.join(folder_id).join(name);
        debug!("查找本地文件: {}", path.display());

        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| Self::io_error(&path, e))?;

        Ok(exists.then(|| ContentItem::new(format!("{folder_id}/{name}"), name)))
    }

    async fn download(&self, item: &ContentItem, dest: &Path) -> Result<u64, FileStoreError> {
        let source = self.root.join(&item.external_id);
        if !tokio::fs::try_exists(&source)
            .await
            .map_err(|e| Self::io_error(&source, e))?
        {
            return Err(FileStoreError::Missing(item.external_id.clone()));
        }

        tokio::fs::copy(&source, dest)
            .await
            .map_err(|e| Self::io_error(dest, e))
    }
}
