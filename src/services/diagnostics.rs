//! 失败诊断 - 业务能力层
//!
//! 只负责"发布失败时留下截图和页面快照"，不参与成功判定。

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::services::posting_agent::AgentSession;

pub const SCREENSHOT_NAME: &str = "debug_screenshot.png";
pub const DUMP_PREFIX: &str = "error_dom_dump_";

/// 诊断记录器
///
/// 截图固定文件名（每次覆盖），页面快照带时间戳，写入前清理旧快照。
#[derive(Debug, Clone)]
pub struct DiagnosticsRecorder {
    dir: PathBuf,
}

impl DiagnosticsRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn screenshot_path(&self) -> PathBuf {
        self.dir.join(SCREENSHOT_NAME)
    }

    /// 记录当前页面，任何失败都只打印警告
    pub async fn capture(&self, session: &dyn AgentSession) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("⚠️ 无法创建诊断目录 {}: {}", self.dir.display(), e);
            return;
        }

        let screenshot = self.screenshot_path();
        if tokio::fs::try_exists(&screenshot).await.unwrap_or(false) {
            if let Err(e) = tokio::fs::remove_file(&screenshot).await {
                warn!("⚠️ 无法删除旧截图: {}", e);
            }
        }

        let pruned = prune_dumps(&self.dir).await;
        if pruned > 0 {
            info!("🧹 清理了 {} 个旧页面快照", pruned);
        }

        match session.screenshot(&screenshot).await {
            Ok(()) => info!("📸 截图已保存: {}", screenshot.display()),
            Err(e) => warn!("⚠️ 截图失败: {}", e),
        }

        match session.page_content().await {
            Ok(html) => {
                let dump = self.dir.join(format!(
                    "{}{}.html",
                    DUMP_PREFIX,
                    chrono::Utc::now().timestamp_millis()
                ));
                match tokio::fs::write(&dump, html).await {
                    Ok(()) => info!("📄 页面快照已保存: {}", dump.display()),
                    Err(e) => warn!("⚠️ 写入页面快照失败: {}", e),
                }
            }
            Err(e) => warn!("⚠️ 无法获取页面内容: {}", e),
        }
    }
}

async fn prune_dumps(dir: &Path) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("⚠️ 无法读取诊断目录: {}", e);
            return 0;
        }
    };

    let mut pruned = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(DUMP_PREFIX) {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => pruned += 1,
            Err(e) => debug!("删除旧快照失败 {}: {}", entry.path().display(), e),
        }
    }
    pruned
}
