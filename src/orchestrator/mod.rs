//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 打开目录数据库并补齐种子
//! - 选择文件存储，组装浏览器发布代理
//! - 单次运行或按间隔常驻
//!
//! ### `scheduler` - 单个周期
//! - 加锁后读取位置
//! - 定位下一帧，文件夹耗尽时交给推进器
//! - 发布成功后推进帧偏移，满额时切换文件夹
//!
//! ## 层次关系
//!
//! ```text
//! app (常驻或单次)
//!     ↓
//! scheduler (一个周期)
//!     ↓
//! workflow::PostingPipeline (发一帧)
//!     ↓
//! services (能力层：位置 / 定位 / 推进 / 发布)
//!     ↓
//! infrastructure (基础设施：目录存储 / 文件存储 / 锁)
//! ```

pub mod app;
pub mod scheduler;

// 重新导出主要类型
pub use app::App;
pub use scheduler::{CycleOutcome, Scheduler};
