#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use frame_poster::config::{Config, FileStoreKind};
use frame_poster::context::AppContext;
use frame_poster::error::PostError;
use frame_poster::infrastructure::{LocalFileStore, MemoryCatalog};
use frame_poster::models::{CatalogSeed, EpisodeSeed, SeasonSeed, SeriesSeed};
use frame_poster::services::{AgentSession, PostingAgent, SessionLauncher};
use frame_poster::Scheduler;

pub const SERIES: &str = "series";

/// 构建目录种子：`[(季, [(集, 集号, [文件夹])])]`
pub fn seed(seasons: &[(&str, &[(&str, u32, &[&str])])]) -> CatalogSeed {
    CatalogSeed {
        series: SeriesSeed {
            id: SERIES.to_string(),
            title: "Series".to_string(),
            current: None,
        },
        seasons: seasons
            .iter()
            .map(|(season_id, episodes)| SeasonSeed {
                id: season_id.to_string(),
                episodes: episodes
                    .iter()
                    .map(|(id, number, folders)| EpisodeSeed {
                        id: id.to_string(),
                        episode_number: *number,
                        folder_ids: folders.iter().map(|f| f.to_string()).collect(),
                        total_files: 500,
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// 在 `folder` 下写入 `frame_<start..=end>.png`
pub fn write_frames(media: &Path, folder: &str, start: u32, end: u32) {
    let dir = media.join(folder);
    std::fs::create_dir_all(&dir).unwrap();
    for i in start..=end {
        std::fs::write(dir.join(format!("frame_{:04}.png", i)), b"png").unwrap();
    }
}

/// 暂存目录中残留的帧文件
pub fn staged_frames(scratch: &Path) -> Vec<String> {
    match std::fs::read_dir(scratch) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with("frame_"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// 测试环境：临时目录里的媒体库 + 暂存目录 + 内存目录
pub struct Harness {
    pub dir: TempDir,
    pub catalog: Arc<MemoryCatalog>,
    pub config: Config,
}

impl Harness {
    pub fn new(seed: &CatalogSeed, capacity: u32) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            series_id: SERIES.to_string(),
            series_title: "Series".to_string(),
            file_store: FileStoreKind::Local,
            media_root: dir.path().join("media").display().to_string(),
            scratch_dir: dir.path().join("scratch").display().to_string(),
            folder_capacity: capacity,
            ..Config::default()
        };
        let catalog = Arc::new(MemoryCatalog::from_seed(seed).unwrap());
        Self {
            dir,
            catalog,
            config,
        }
    }

    pub fn media(&self) -> PathBuf {
        PathBuf::from(&self.config.media_root)
    }

    pub fn scratch(&self) -> PathBuf {
        PathBuf::from(&self.config.scratch_dir)
    }

    pub fn context(&self, agent: Arc<dyn PostingAgent>) -> AppContext {
        AppContext::new(
            self.config.clone(),
            self.catalog.clone(),
            Arc::new(LocalFileStore::new(self.media())),
            agent,
        )
    }

    pub fn scheduler(&self, agent: Arc<dyn PostingAgent>) -> Scheduler {
        Scheduler::new(&self.context(agent))
    }
}

/// 直接记录文案的发布代理
#[derive(Default)]
pub struct RecordingAgent {
    pub captions: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl RecordingAgent {
    pub fn captions(&self) -> Vec<String> {
        self.captions.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostingAgent for RecordingAgent {
    async fn post(&self, caption: &str, media: &Path) -> Result<(), PostError> {
        assert!(media.exists(), "发布时暂存文件应已存在");
        if self.fail.load(Ordering::SeqCst) {
            return Err(PostError::Browser("scripted failure".to_string()));
        }
        self.captions.lock().unwrap().push(caption.to_string());
        Ok(())
    }
}

/// 会话步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Launch,
    Prepare,
    Navigate,
    TypeCaption,
    Attach,
    WaitAttachment,
    Submit,
    WaitConfirmation,
}

/// 按脚本运行的会话启动器
#[derive(Clone)]
pub struct FakeLauncher {
    pub fail_at: Option<Step>,
    /// 在该步骤挂起（用于截止时间测试）
    pub hang_at: Option<Step>,
    pub final_url: String,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            fail_at: None,
            hang_at: None,
            final_url: "https://x.com/compose/post".to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_at(step: Step) -> Self {
        Self {
            fail_at: Some(step),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn AgentSession>, PostError> {
        self.calls.lock().unwrap().push("launch".to_string());
        if self.fail_at == Some(Step::Launch) {
            return Err(PostError::AgentLaunchFailed("no browser".to_string()));
        }
        Ok(Box::new(FakeSession {
            script: self.clone(),
        }))
    }
}

pub struct FakeSession {
    script: FakeLauncher,
}

impl FakeSession {
    async fn step(&self, step: Step, name: &str) -> Result<(), PostError> {
        self.script.calls.lock().unwrap().push(name.to_string());
        if self.script.hang_at == Some(step) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.script.fail_at == Some(step) {
            return Err(match step {
                Step::WaitAttachment | Step::WaitConfirmation => PostError::PostTimeout {
                    what: name.to_string(),
                    secs: 0,
                },
                _ => PostError::Browser(format!("{} failed", name)),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AgentSession for FakeSession {
    async fn prepare(&self) -> Result<(), PostError> {
        self.step(Step::Prepare, "prepare").await
    }

    async fn navigate(&self, _url: &str) -> Result<String, PostError> {
        self.step(Step::Navigate, "navigate").await?;
        Ok(self.script.final_url.clone())
    }

    async fn type_caption(&self, text: &str) -> Result<(), PostError> {
        self.step(Step::TypeCaption, "type_caption").await?;
        self.script
            .calls
            .lock()
            .unwrap()
            .push(format!("caption:{}", text));
        Ok(())
    }

    async fn attach_file(&self, path: &Path) -> Result<(), PostError> {
        assert!(path.exists(), "附件应已暂存");
        self.step(Step::Attach, "attach").await
    }

    async fn wait_for_attachment(&self, _timeout: Duration) -> Result<(), PostError> {
        self.step(Step::WaitAttachment, "wait_attachment").await
    }

    async fn submit(&self) -> Result<(), PostError> {
        self.step(Step::Submit, "submit").await
    }

    async fn wait_for_confirmation(&self, _timeout: Duration) -> Result<(), PostError> {
        self.step(Step::WaitConfirmation, "wait_confirmation").await
    }

    async fn screenshot(&self, path: &Path) -> Result<(), PostError> {
        self.script.calls.lock().unwrap().push("screenshot".to_string());
        std::fs::write(path, b"png").map_err(|e| PostError::Browser(e.to_string()))
    }

    async fn page_content(&self) -> Result<String, PostError> {
        self.script.calls.lock().unwrap().push("page_content".to_string());
        Ok("<html><body>compose</body></html>".to_string())
    }

    async fn close(&self) -> Result<(), PostError> {
        self.script.calls.lock().unwrap().push("close".to_string());
        Ok(())
    }
}
