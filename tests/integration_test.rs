use std::time::Duration;

use frame_poster::browser::{find_executable, ChromeLauncher};
use frame_poster::config::Config;
use frame_poster::services::{AgentSession, SessionLauncher};
use frame_poster::utils::logging;
use frame_poster::App;

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_session() {
    // 初始化日志
    logging::init(true);

    // 需要 COOKIES_BASE64 和本机 Chrome
    let config = Config::from_env();

    let launcher = ChromeLauncher::new(&config);
    let session = launcher.launch().await.expect("启动浏览器失败");

    let final_url = session.navigate(&config.compose_url).await.expect("打开发布页失败");
    println!("最终地址: {}", final_url);
    assert!(!final_url.contains(&config.login_marker), "Cookie 应该仍然有效");

    session.close().await.expect("关闭浏览器失败");
}

#[tokio::test]
#[ignore]
async fn test_find_executable() {
    let config = Config::from_env();
    let found = find_executable(config.chrome_executable.as_deref());
    assert!(found.is_some(), "应该能找到本机浏览器");
}

#[tokio::test]
#[ignore]
async fn test_single_cycle() {
    // 初始化日志
    logging::init(true);

    // 加载配置（FRAME_POSTER_CONFIG 或 frame_poster.toml）
    let config = Config::load().expect("加载配置失败");
    let deadline = Duration::from_secs(config.cycle_deadline_secs * 2);

    let app = App::initialize(config).await.expect("初始化失败");
    let result = tokio::time::timeout(deadline, app.scheduler().run_one_cycle())
        .await
        .expect("周期超时");

    assert!(result.is_ok(), "周期应该成功: {:?}", result.err());
}
