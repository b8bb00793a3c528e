//! 发布代理 - 业务能力层
//!
//! `PostingAgent` 对外只有一个能力：带图片发一条帖子。
//! 浏览器实现由 `SessionLauncher` 产生 `AgentSession`，
//! `SessionPoster` 按固定步骤驱动会话，失败时交给诊断记录器。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::PostError;
use crate::services::diagnostics::DiagnosticsRecorder;

/// 发布代理
#[async_trait]
pub trait PostingAgent: Send + Sync {
    async fn post(&self, caption: &str, media: &Path) -> Result<(), PostError>;
}

/// 一个已注入凭证的浏览器会话
#[async_trait]
pub trait AgentSession: Send + Sync {
    /// 注入 UA 和登录凭证，在导航之前调用
    async fn prepare(&self) -> Result<(), PostError>;

    /// 导航并返回最终 URL（用于判断是否被重定向到登录页）
    async fn navigate(&self, url: &str) -> Result<String, PostError>;

    async fn type_caption(&self, text: &str) -> Result<(), PostError>;

    async fn attach_file(&self, path: &Path) -> Result<(), PostError>;

    /// 等待附件预览出现，超时返回 `PostTimeout`
    async fn wait_for_attachment(&self, timeout: Duration) -> Result<(), PostError>;

    async fn submit(&self) -> Result<(), PostError>;

    /// 等待发布成功提示出现，超时返回 `PostTimeout`
    async fn wait_for_confirmation(&self, timeout: Duration) -> Result<(), PostError>;

    async fn screenshot(&self, path: &Path) -> Result<(), PostError>;

    async fn page_content(&self) -> Result<String, PostError>;

    async fn close(&self) -> Result<(), PostError>;
}

/// 会话启动器
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn AgentSession>, PostError>;
}

/// 发布页面的有界等待
#[derive(Debug, Clone, Copy)]
pub struct ComposeTimeouts {
    pub attachment: Duration,
    pub confirmation: Duration,
}

impl ComposeTimeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            attachment: Duration::from_secs(config.attachment_timeout_secs),
            confirmation: Duration::from_secs(config.confirmation_timeout_secs),
        }
    }
}

impl Default for ComposeTimeouts {
    fn default() -> Self {
        Self {
            attachment: Duration::from_secs(10),
            confirmation: Duration::from_secs(5),
        }
    }
}

/// 基于浏览器会话的发布代理
pub struct SessionPoster<L> {
    launcher: L,
    compose_url: String,
    login_marker: String,
    timeouts: ComposeTimeouts,
    diagnostics: Option<DiagnosticsRecorder>,
}

impl<L: SessionLauncher> SessionPoster<L> {
    pub fn new(launcher: L, compose_url: impl Into<String>, login_marker: impl Into<String>) -> Self {
        Self {
            launcher,
            compose_url: compose_url.into(),
            login_marker: login_marker.into(),
            timeouts: ComposeTimeouts::default(),
            diagnostics: None,
        }
    }

    pub fn with_timeouts(mut self, timeouts: ComposeTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticsRecorder) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    async fn compose(
        &self,
        session: &dyn AgentSession,
        caption: &str,
        media: &Path,
    ) -> Result<(), PostError> {
        session.prepare().await?;
        let final_url = session.navigate(&self.compose_url).await?;
        if final_url.contains(&self.login_marker) {
            return Err(PostError::NotAuthenticated(final_url));
        }
        info!("🌐 发布页面已就绪");

        session.type_caption(caption).await?;
        info!("📝 文案已输入");

        session.attach_file(media).await?;
        session.wait_for_attachment(self.timeouts.attachment).await?;
        info!("🖼️ 图片已上传");

        session.submit().await?;
        session.wait_for_confirmation(self.timeouts.confirmation).await?;
        info!("✅ 帖子已发出");
        Ok(())
    }
}

#[async_trait]
impl<L: SessionLauncher> PostingAgent for SessionPoster<L> {
    async fn post(&self, caption: &str, media: &Path) -> Result<(), PostError> {
        let session = self.launcher.launch().await.map_err(|e| {
            error!("❌ 无法获取浏览器会话: {}", e);
            e
        })?;
        let guard = SessionGuard::new(session);

        let result = self.compose(guard.session(), caption, media).await;

        if let Err(e) = &result {
            error!("❌ 发布过程中出错: {}", e);
            if let Some(diagnostics) = &self.diagnostics {
                diagnostics.capture(guard.session()).await;
            }
        }

        guard.close().await;
        result
    }
}

/// 会话守卫
///
/// 正常路径显式 `close()`；如果外层截止时间到期导致 future 被丢弃，
/// drop 时在后台关闭会话。
struct SessionGuard {
    session: Arc<dyn AgentSession>,
    closed: bool,
}

impl SessionGuard {
    fn new(session: Box<dyn AgentSession>) -> Self {
        Self {
            session: Arc::from(session),
            closed: false,
        }
    }

    fn session(&self) -> &dyn AgentSession {
        self.session.as_ref()
    }

    async fn close(mut self) {
        self.closed = true;
        match self.session.close().await {
            Ok(()) => info!("🧼 浏览器会话已关闭"),
            Err(e) => warn!("⚠️ 关闭浏览器会话失败: {}", e),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let session = Arc::clone(&self.session);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("⚠️ 发布流程被中断，后台关闭浏览器会话");
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        warn!("⚠️ 关闭浏览器会话失败: {}", e);
                    }
                });
            }
            Err(_) => warn!("⚠️ 没有运行时，无法关闭浏览器会话"),
        }
    }
}
