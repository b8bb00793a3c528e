//! 基于 chromiumoxide 的发布会话

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser::connection::connect_to_browser;
use crate::browser::cookies::decode_cookies;
use crate::browser::headless::{find_executable, launch_browser};
use crate::config::{ComposeSelectors, Config};
use crate::error::PostError;
use crate::services::posting_agent::{AgentSession, SessionLauncher};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 一个浏览器标签页及其所属浏览器
pub struct ChromeSession {
    browser: Mutex<Browser>,
    page: Page,
    events: JoinHandle<()>,
    user_agent: String,
    cookies: Vec<CookieParam>,
    selectors: ComposeSelectors,
    navigation_timeout: Duration,
    /// 浏览器由本进程启动（关闭时连同浏览器一起退出）
    owned: bool,
}

impl ChromeSession {
    /// 轮询直到选择器出现
    async fn wait_for(&self, selector: &str, what: &str, limit: Duration) -> Result<(), PostError> {
        let poll = async {
            loop {
                if self.page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(limit, poll)
            .await
            .map_err(|_| PostError::PostTimeout {
                what: what.to_string(),
                secs: limit.as_secs(),
            })
    }
}

#[async_trait]
impl AgentSession for ChromeSession {
    async fn prepare(&self) -> Result<(), PostError> {
        self.page.set_user_agent(self.user_agent.as_str()).await?;
        self.page.set_cookies(self.cookies.clone()).await?;
        info!("🍪 已注入 {} 个 Cookie", self.cookies.len());
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<String, PostError> {
        let load = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            self.page.url().await
        };
        let final_url = tokio::time::timeout(self.navigation_timeout, load)
            .await
            .map_err(|_| PostError::PostTimeout {
                what: format!("页面加载 {}", url),
                secs: self.navigation_timeout.as_secs(),
            })??;
        let final_url = final_url.unwrap_or_default();
        debug!("页面最终地址: {}", final_url);
        Ok(final_url)
    }

    async fn type_caption(&self, text: &str) -> Result<(), PostError> {
        let textbox = self.page.find_element(self.selectors.textbox.as_str()).await?;
        textbox.click().await?;
        textbox.type_str(text).await?;
        Ok(())
    }

    async fn attach_file(&self, path: &Path) -> Result<(), PostError> {
        let absolute = std::fs::canonicalize(path)
            .map_err(|e| PostError::Browser(format!("无法定位文件 {}: {}", path.display(), e)))?;
        let input = self.page.find_element(self.selectors.file_input.as_str()).await?;
        let params = SetFileInputFilesParams::builder()
            .files(vec![absolute.to_string_lossy().into_owned()])
            .backend_node_id(input.backend_node_id)
            .build()
            .map_err(PostError::Browser)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn wait_for_attachment(&self, timeout: Duration) -> Result<(), PostError> {
        let selector = self.selectors.attachment_preview.clone();
        self.wait_for(&selector, "图片预览", timeout).await
    }

    async fn submit(&self) -> Result<(), PostError> {
        let button = self.page.find_element(self.selectors.submit_button.as_str()).await?;
        button.click().await?;
        Ok(())
    }

    async fn wait_for_confirmation(&self, timeout: Duration) -> Result<(), PostError> {
        let selector = self.selectors.confirmation_toast.clone();
        self.wait_for(&selector, "发布成功提示", timeout).await
    }

    async fn screenshot(&self, path: &Path) -> Result<(), PostError> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }

    async fn page_content(&self) -> Result<String, PostError> {
        Ok(self.page.content().await?)
    }

    async fn close(&self) -> Result<(), PostError> {
        if self.owned {
            let mut browser = self.browser.lock().await;
            browser.close().await?;
            if let Err(e) = browser.wait().await {
                warn!("⚠️ 等待浏览器退出失败: {}", e);
            }
        } else {
            // 外部浏览器只关闭自己打开的标签页
            self.page.clone().close().await?;
        }
        self.events.abort();
        Ok(())
    }
}

/// 按配置启动或连接浏览器；UA 和登录 Cookie 在会话 `prepare` 时注入
pub struct ChromeLauncher {
    cookies_base64: Option<String>,
    chrome_executable: Option<String>,
    debug_port: Option<u16>,
    headless: bool,
    user_agent: String,
    selectors: ComposeSelectors,
    navigation_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(config: &Config) -> Self {
        Self {
            cookies_base64: config.cookies_base64.clone(),
            chrome_executable: config.chrome_executable.clone(),
            debug_port: config.browser_debug_port,
            headless: config.headless,
            user_agent: config.user_agent.clone(),
            selectors: config.selectors.clone(),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        }
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn AgentSession>, PostError> {
        // 先校验凭证，避免无谓地启动浏览器
        let cookies = decode_cookies(self.cookies_base64.as_deref())?;
        let params = cookies
            .iter()
            .map(|c| c.to_param())
            .collect::<Result<Vec<_>, _>>()?;

        let ((browser, events), owned) = match self.debug_port {
            Some(port) => (connect_to_browser(port).await?, false),
            None => {
                let executable = find_executable(self.chrome_executable.as_deref()).ok_or_else(|| {
                    PostError::AgentLaunchFailed("未找到可用的 Chrome/Chromium".to_string())
                })?;
                (launch_browser(&executable, self.headless).await?, true)
            }
        };

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                events.abort();
                return Err(PostError::AgentLaunchFailed(format!("无法创建新页面: {}", e)));
            }
        };

        Ok(Box::new(ChromeSession {
            browser: Mutex::new(browser),
            page,
            events,
            user_agent: self.user_agent.clone(),
            cookies: params,
            selectors: self.selectors.clone(),
            navigation_timeout: self.navigation_timeout,
            owned,
        }))
    }
}
