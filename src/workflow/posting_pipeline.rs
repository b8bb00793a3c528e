//! 帧发布流程 - 流程层
//!
//! 核心职责：定义"发一帧"的完整流程
//!
//! 流程顺序：
//! 1. 生成文案
//! 2. 在截止时间内：下载到暂存目录 → 交给发布代理 → 删除暂存文件
//!
//! 本流程不修改遍历位置，成功与否由调度器决定是否推进。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::config::Config;
use crate::error::PostError;
use crate::infrastructure::FileStore;
use crate::models::{Caption, ContentItem};
use crate::services::{PostingAgent, StagedFile};
use crate::workflow::post_ctx::PostCtx;

/// 发布成功的回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReceipt {
    pub caption: String,
    pub item: ContentItem,
}

/// 帧发布流程
///
/// - 不持有浏览器，只依赖 `PostingAgent`
/// - 不触碰位置存储
pub struct PostingPipeline {
    files: Arc<dyn FileStore>,
    agent: Arc<dyn PostingAgent>,
    scratch_dir: PathBuf,
    deadline: Duration,
    series_title: String,
    item_label: String,
}

impl PostingPipeline {
    pub fn new(files: Arc<dyn FileStore>, agent: Arc<dyn PostingAgent>, config: &Config) -> Self {
        Self {
            files,
            agent,
            scratch_dir: PathBuf::from(&config.scratch_dir),
            deadline: Duration::from_secs(config.cycle_deadline_secs),
            series_title: config.series_title.clone(),
            item_label: config.caption_item_label.clone(),
        }
    }

    /// 覆盖截止时间
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub async fn post(&self, item: &ContentItem, ctx: &PostCtx) -> Result<PostReceipt, PostError> {
        let caption = Caption::for_position(
            &self.series_title,
            &self.item_label,
            &ctx.position,
            ctx.capacity,
        )
        .to_string();
        info!("{} 📝 文案: {}", ctx, caption);

        // 下载和发布共用一个截止时间；超时丢弃 future 时暂存文件由 drop 清理
        let run = async {
            let staged = StagedFile::download(self.files.as_ref(), item, &self.scratch_dir).await?;
            info!("{} 📤 正在发布 {}", ctx, item.display_name);
            let result = self.agent.post(&caption, staged.path()).await;
            staged.remove().await;
            result
        };

        let result = match tokio::time::timeout(self.deadline, run).await {
            Ok(result) => result,
            Err(_) => {
                error!("{} ⏰ 发布超过 {} 秒，已放弃", ctx, self.deadline.as_secs());
                Err(PostError::DeadlineExceeded(self.deadline.as_secs()))
            }
        };

        match result {
            Ok(()) => {
                info!("{} ✓ 发布成功", ctx);
                Ok(PostReceipt {
                    caption,
                    item: item.clone(),
                })
            }
            Err(e) => {
                error!("{} ❌ 发布失败: {}", ctx, e);
                Err(e)
            }
        }
    }
}
