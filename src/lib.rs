//! # Frame Poster
//!
//! 把一部剧集按帧逐张发布到社交平台，遍历位置持久化保存
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部资源，只暴露能力
//! - `CatalogStore` - 系列 → 季 → 集 → 文件夹 目录，SQLite 或内存实现
//! - `FileStore` - 按名字查找并下载帧，Google Drive 或本地目录实现
//! - `CycleLock` - 每个系列一个锁文件
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `PositionStore` - 读取位置，原子推进计数
//! - `ContentResolver` - 按位置算出文件名并查找
//! - `EpisodeAdvancer` - 文件夹 → 集 → 季 的推进状态机
//! - `PostingAgent` - 带图发帖，浏览器实现见 `browser/`
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一帧"的发布流程
//! - `PostCtx` - 上下文封装（周期编号 + 位置）
//! - `PostingPipeline` - 文案 → 暂存 → 发布 → 清理
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/scheduler` - 一个周期：加锁、定位、发布、推进
//! - `orchestrator/app` - 组装上下文，单次或常驻运行
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod context;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use context::AppContext;
pub use error::{AdvanceError, CycleError, PostError, ResolveError, StoreError};
pub use models::{Caption, ContentItem, Position};
pub use orchestrator::{App, CycleOutcome, Scheduler};
pub use workflow::{PostCtx, PostReceipt, PostingPipeline};
