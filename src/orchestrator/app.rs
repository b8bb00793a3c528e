//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：打开目录数据库、补齐种子、选择文件存储、组装发布代理
//! 2. **运行模式**：默认只跑一个周期（由外部定时器调用）；
//!    配置了 `cycle_interval_secs` 时常驻，按间隔循环直到目录发完

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::browser::ChromeLauncher;
use crate::config::{Config, FileStoreKind};
use crate::context::AppContext;
use crate::infrastructure::{CatalogStore, DriveFileStore, FileStore, LocalFileStore, SqliteCatalog};
use crate::models::load_catalog_seed;
use crate::orchestrator::scheduler::{CycleOutcome, Scheduler};
use crate::services::{ComposeTimeouts, DiagnosticsRecorder, PostingAgent, SessionPoster};
use crate::utils::logging::{log_cycle_outcome, log_cycle_start, log_startup};

/// 应用主结构
pub struct App {
    context: AppContext,
    scheduler: Scheduler,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let catalog = open_catalog(&config).await?;
        let files = open_file_store(&config)?;
        let agent = build_agent(&config);

        Ok(Self::with_context(AppContext::new(config, catalog, files, agent)))
    }

    /// 用现成的上下文组装（测试和试运行）
    pub fn with_context(context: AppContext) -> Self {
        let scheduler = Scheduler::new(&context);
        Self { context, scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        match self.context.config.cycle_interval_secs {
            None => self.run_once().await,
            Some(secs) => self.run_forever(Duration::from_secs(secs.max(1))).await,
        }
    }

    async fn run_once(&self) -> Result<()> {
        log_cycle_start(1);
        match self.scheduler.run_one_cycle().await {
            Ok(outcome) => {
                log_cycle_outcome(1, true, &summarize(&outcome));
                Ok(())
            }
            Err(e) => {
                log_cycle_outcome(1, false, &e.to_string());
                Err(e).context("本次周期失败")
            }
        }
    }

    async fn run_forever(&self, period: Duration) -> Result<()> {
        let mut ticker = tokio::time::interval(period);
        let mut cycle = 0u64;

        loop {
            ticker.tick().await;
            cycle += 1;
            log_cycle_start(cycle);

            match self.scheduler.run_one_cycle().await {
                Ok(outcome) => {
                    log_cycle_outcome(cycle, true, &summarize(&outcome));
                    if matches!(outcome, CycleOutcome::CatalogComplete { .. }) {
                        info!("🏁 目录已发完，程序结束");
                        return Ok(());
                    }
                }
                Err(e) if e.is_retryable() => {
                    log_cycle_outcome(cycle, false, &e.to_string());
                    warn!("⚠️ 下一个周期将重试同一帧");
                }
                Err(e) => {
                    log_cycle_outcome(cycle, false, &e.to_string());
                    error!("❌ 目录数据需要人工修复，停止运行");
                    return Err(e).context("周期遇到不可恢复的错误");
                }
            }
        }
    }
}

fn summarize(outcome: &CycleOutcome) -> String {
    match outcome {
        CycleOutcome::Posted { receipt, position } => {
            format!("已发布「{}」，下一帧 {}", receipt.caption, position)
        }
        CycleOutcome::CatalogComplete { position } => format!("目录已完结 {}", position),
    }
}

/// 打开目录数据库，并用种子文件补齐缺失的季/集
async fn open_catalog(config: &Config) -> Result<Arc<dyn CatalogStore>> {
    let catalog = SqliteCatalog::open(Path::new(&config.database_path), config.series_id.clone())?;

    if let Some(file) = &config.catalog_file {
        let seed = load_catalog_seed(Path::new(file)).await?;
        if seed.series.id != config.series_id {
            anyhow::bail!(
                "种子文件的系列 {} 与配置的系列 {} 不一致",
                seed.series.id,
                config.series_id
            );
        }
        catalog
            .seed(&seed)
            .await
            .with_context(|| format!("写入目录种子失败: {}", file))?;
        info!("🌱 已加载目录种子: {} 季", seed.seasons.len());
    }

    if catalog.series().await?.is_none() {
        anyhow::bail!(
            "数据库中没有系列 {}，请通过 catalog_file 提供目录种子",
            config.series_id
        );
    }

    Ok(Arc::new(catalog))
}

fn open_file_store(config: &Config) -> Result<Arc<dyn FileStore>> {
    let store: Arc<dyn FileStore> = match config.file_store {
        FileStoreKind::Drive => {
            info!("☁️ 文件存储: Google Drive");
            Arc::new(DriveFileStore::new(config).context("初始化 Google Drive 客户端失败")?)
        }
        FileStoreKind::Local => {
            info!("💾 文件存储: 本地目录 {}", config.media_root);
            Arc::new(LocalFileStore::new(&config.media_root))
        }
    };
    Ok(store)
}

fn build_agent(config: &Config) -> Arc<dyn PostingAgent> {
    let poster = SessionPoster::new(
        ChromeLauncher::new(config),
        config.compose_url.clone(),
        config.login_marker.clone(),
    )
    .with_timeouts(ComposeTimeouts::from_config(config))
    .with_diagnostics(DiagnosticsRecorder::new(&config.scratch_dir));
    Arc::new(poster)
}
