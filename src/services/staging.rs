//! 本地暂存文件
//!
//! `StagedFile` 存在期间文件在暂存目录里；无论流程从哪一步退出，
//! drop 时都会删除。正常路径调用 `remove()` 以便记录日志。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::PostError;
use crate::infrastructure::FileStore;
use crate::models::ContentItem;

#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    removed: bool,
}

impl StagedFile {
    /// 下载条目到暂存目录
    ///
    /// 先创建守卫再下载，下载中途失败留下的残片也会被清理。
    pub async fn download(
        files: &dyn FileStore,
        item: &ContentItem,
        scratch_dir: &Path,
    ) -> Result<Self, PostError> {
        tokio::fs::create_dir_all(scratch_dir)
            .await
            .map_err(|e| PostError::DownloadFailed {
                name: item.display_name.clone(),
                reason: format!("无法创建暂存目录 {}: {}", scratch_dir.display(), e),
            })?;

        let staged = Self {
            path: scratch_dir.join(staged_name(item)),
            removed: false,
        };

        let bytes = files
            .download(item, &staged.path)
            .await
            .map_err(|e| PostError::DownloadFailed {
                name: item.display_name.clone(),
                reason: e.to_string(),
            })?;

        info!("⬇️ 已暂存 {} ({} 字节)", staged.path.display(), bytes);
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 删除暂存文件
    pub async fn remove(mut self) {
        self.removed = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => info!("🧹 已删除暂存文件: {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("⚠️ 删除暂存文件失败 {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("🧹 已删除暂存文件: {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("⚠️ 删除暂存文件失败 {}: {}", self.path.display(), e),
        }
    }
}

/// 暂存文件名只取条目名的最后一段
fn staged_name(item: &ContentItem) -> String {
    Path::new(&item.display_name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| {
            item.external_id
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect()
        })
}
