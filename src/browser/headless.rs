use std::path::{Path, PathBuf};

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::PostError;

/// 常见的浏览器安装位置
const KNOWN_EXECUTABLES: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

/// 查找可用的浏览器：优先使用配置的路径，其次是常见安装位置
pub fn find_executable(configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = configured {
        let path = Path::new(path);
        return path.exists().then(|| path.to_path_buf());
    }
    KNOWN_EXECUTABLES
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// 启动浏览器
pub async fn launch_browser(
    executable: &Path,
    headless: bool,
) -> Result<(Browser, JoinHandle<()>), PostError> {
    info!("🚀 启动浏览器: {}", executable.display());

    let builder = BrowserConfig::builder()
        .chrome_executable(executable)
        .window_size(1920, 1080)
        .args(vec![
            "--disable-gpu",           // 无头模式必须禁用 GPU
            "--no-sandbox",            // 容器内没有沙盒权限
            "--disable-setuid-sandbox",
            "--disable-dev-shm-usage", // 防止共享内存不足
        ]);
    let builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        PostError::AgentLaunchFailed(format!("配置浏览器失败: {}", e))
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        PostError::AgentLaunchFailed(format!("启动浏览器失败: {}", e))
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let events = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    Ok((browser, events))
}
