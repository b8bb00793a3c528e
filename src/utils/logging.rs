/// 日志工具模块
///
/// 提供日志初始化和周期输出的辅助函数
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::models::Position;

/// 初始化日志
///
/// `RUST_LOG` 优先；未设置时按 `verbose` 选择 debug 或 info。
/// 重复调用时静默忽略（测试里会多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("frame_poster={0},chromiumoxide=warn", default_level).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 逐帧发布模式");
    info!("🎬 系列: {} ({})", config.series_title, config.series_id);
    info!("📁 每个文件夹 {} 帧", config.folder_capacity);
    match config.cycle_interval_secs {
        Some(secs) => info!("⏰ 常驻运行，每 {} 秒一个周期", secs),
        None => info!("⏰ 单次运行"),
    }
    info!("{}", "=".repeat(60));
}

/// 记录周期开始信息
pub fn log_cycle_start(cycle: u64) {
    info!("\n{}", "=".repeat(60));
    info!(
        "📦 第 {} 个周期开始: {}",
        cycle,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 记录当前遍历位置
pub fn log_position(label: &str, position: &Position) {
    info!(
        "📍 {}: 季 {} / 集 {} (第{}集) / 文件夹 {}/{} / 帧 {}",
        label,
        position.season_id,
        position.episode_id,
        position.episode_number,
        position.folder_index,
        position.folder_ids.len(),
        position.frame_index
    );
}

/// 记录周期结果
pub fn log_cycle_outcome(cycle: u64, success: bool, summary: &str) {
    info!("\n{}", "─".repeat(60));
    if success {
        info!("✓ 第 {} 个周期完成: {}", cycle, summary);
    } else {
        info!("✗ 第 {} 个周期失败: {}", cycle, summary);
    }
    info!("{}", "─".repeat(60));
}
