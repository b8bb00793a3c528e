//! 调度器 - 编排层
//!
//! ## 职责
//!
//! 一个周期 = 读取位置 → 定位下一帧（必要时推进文件夹/剧集/季）→ 发布 → 推进帧偏移。
//!
//! ## 设计特点
//!
//! - **先加锁**：同一系列同一时刻只有一个周期
//! - **有界循环**：推进次数不超过目录规模，避免目录损坏时死循环
//! - **失败不推进**：发布失败时位置保持不变，下次调用重试同一帧

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::context::AppContext;
use crate::error::{CycleError, ResolveError};
use crate::infrastructure::CycleLock;
use crate::models::{ContentItem, Position};
use crate::services::{
    Advance, ContentResolver, EpisodeAdvancer, ItemNaming, PositionStore, Resolution,
};
use crate::utils::logging::log_position;
use crate::workflow::{PostCtx, PostReceipt, PostingPipeline};

/// 周期结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 发出了一帧，`position` 为推进后的位置
    Posted {
        receipt: PostReceipt,
        position: Position,
    },
    /// 目录已全部发完，位置停在最后一帧之后
    CatalogComplete { position: Position },
}

/// 定位结果：找到条目，或目录已完结
enum Located {
    Item(ContentItem, Position),
    Complete(Position),
}

pub struct Scheduler {
    series_id: String,
    scratch_dir: PathBuf,
    stale_lock: Duration,
    capacity: u32,
    positions: PositionStore,
    resolver: ContentResolver,
    advancer: EpisodeAdvancer,
    pipeline: PostingPipeline,
    cycles: AtomicU64,
}

impl Scheduler {
    pub fn new(ctx: &AppContext) -> Self {
        let config = &ctx.config;
        let positions = PositionStore::new(ctx.catalog.clone());
        Self {
            series_id: config.series_id.clone(),
            scratch_dir: PathBuf::from(&config.scratch_dir),
            stale_lock: Duration::from_secs(config.stale_lock_secs),
            capacity: config.folder_capacity,
            resolver: ContentResolver::new(
                ctx.files.clone(),
                ItemNaming::from_config(config),
                config.folder_capacity,
            ),
            advancer: EpisodeAdvancer::new(positions.clone()),
            pipeline: PostingPipeline::new(ctx.files.clone(), ctx.agent.clone(), config),
            positions,
            cycles: AtomicU64::new(0),
        }
    }

    /// 替换发布流程（测试中用来缩短截止时间）
    pub fn with_pipeline(mut self, pipeline: PostingPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    /// 执行一个周期
    pub async fn run_one_cycle(&self) -> Result<CycleOutcome, CycleError> {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.cycle(cycle).await;
        if let Err(e) = &result {
            error!("[周期 #{}] ❌ 周期失败: {}", cycle, e);
        }
        result
    }

    async fn cycle(&self, cycle: u64) -> Result<CycleOutcome, CycleError> {
        let _lock = CycleLock::acquire(&self.scratch_dir, &self.series_id, self.stale_lock)
            .map_err(CycleError::Lock)?
            .ok_or_else(|| {
                warn!("[周期 #{}] ⚠️ 系列 {} 正在被其他周期处理", cycle, self.series_id);
                CycleError::Busy(self.series_id.clone())
            })?;

        let position = self.positions.read().await?;
        log_position("当前位置", &position);

        let (item, position) = match self.locate(cycle, position).await? {
            Located::Item(item, position) => (item, position),
            Located::Complete(position) => {
                info!("[周期 #{}] 🏁 目录已全部发布完成", cycle);
                log_position("最终位置", &position);
                return Ok(CycleOutcome::CatalogComplete { position });
            }
        };

        let ctx = PostCtx::new(cycle, position, self.capacity);
        let receipt = self.pipeline.post(&item, &ctx).await?;

        let frame = self.positions.increment_frame().await?;
        if frame >= self.capacity {
            let folder = self.positions.advance_folder().await?;
            self.positions.reset_frame().await?;
            info!("[周期 #{}] 📦 文件夹已满 {} 帧，切换到文件夹 {}", cycle, self.capacity, folder);
        }

        let position = self.positions.read().await?;
        log_position("最新位置", &position);
        Ok(CycleOutcome::Posted { receipt, position })
    }

    /// 定位下一帧，文件夹耗尽或剧集没有文件夹时推进一步后重试
    async fn locate(&self, cycle: u64, mut position: Position) -> Result<Located, CycleError> {
        let mut budget: Option<usize> = None;
        let mut steps = 0;

        loop {
            match self.resolver.resolve_next(&position).await {
                Ok(Resolution::Found(item)) => return Ok(Located::Item(item, position)),
                Ok(Resolution::ExhaustedFolder) => {}
                // 没有文件夹的剧集直接跳过
                Err(ResolveError::NoFolderAvailable { episode_id }) => {
                    warn!("[周期 #{}] ⚠️ 剧集 {} 没有文件夹，跳过", cycle, episode_id);
                }
                Err(e) => return Err(e.into()),
            }

            let limit = match budget {
                Some(limit) => limit,
                None => {
                    let limit = self.advancer.traversal_budget().await?;
                    debug!("[周期 #{}] 推进上限: {}", cycle, limit);
                    budget = Some(limit);
                    limit
                }
            };
            if steps >= limit {
                return Err(CycleError::CatalogExhausted { steps });
            }
            steps += 1;

            match self.advancer.step(&position).await? {
                Advance::CatalogComplete => return Ok(Located::Complete(position)),
                advance => {
                    debug!("[周期 #{}] 推进: {:?}", cycle, advance);
                    position = self.positions.read().await?;
                }
            }
        }
    }
}
