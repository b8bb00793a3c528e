use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// 文件存储后端
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStoreKind {
    /// Google Drive（生产环境）
    Drive,
    /// 本地目录，文件夹 ID 即子目录名
    Local,
}

/// 发布页面的选择器
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ComposeSelectors {
    pub textbox: String,
    pub file_input: String,
    pub attachment_preview: String,
    pub submit_button: String,
    pub confirmation_toast: String,
}

impl Default for ComposeSelectors {
    fn default() -> Self {
        Self {
            textbox: r#"div[role="textbox"]"#.to_string(),
            file_input: r#"[data-testid="fileInput"]"#.to_string(),
            attachment_preview: r#"img[src^="blob:https://x.com"]"#.to_string(),
            submit_button: r#"[data-testid="tweetButton"]"#.to_string(),
            confirmation_toast: r#"div[role="alert"][data-testid="toast"]"#.to_string(),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 系列 ID（每个部署只跑一个系列）
    pub series_id: String,
    /// 系列名称，用于文案
    pub series_title: String,
    /// SQLite 数据库路径
    pub database_path: String,
    /// 目录种子文件（TOML），启动时补齐缺失的季/集
    pub catalog_file: Option<String>,

    // --- 文件存储 ---
    pub file_store: FileStoreKind,
    pub media_root: String,
    pub drive_api_base_url: String,
    pub drive_download_base_url: String,
    pub drive_api_key: Option<String>,
    pub drive_access_token: Option<String>,

    // --- 帧命名 ---
    /// 每个文件夹的帧数上限
    pub folder_capacity: u32,
    pub item_prefix: String,
    pub item_extension: String,
    pub item_index_width: usize,
    /// 文案中的计数单位
    pub caption_item_label: String,

    // --- 浏览器 ---
    pub compose_url: String,
    /// 最终 URL 包含该片段即视为被重定向到登录页
    pub login_marker: String,
    pub cookies_base64: Option<String>,
    pub chrome_executable: Option<String>,
    /// 设置后连接到已运行的浏览器，而不是启动新实例
    pub browser_debug_port: Option<u16>,
    pub headless: bool,
    pub user_agent: String,
    pub selectors: ComposeSelectors,

    // --- 超时 ---
    pub navigation_timeout_secs: u64,
    pub attachment_timeout_secs: u64,
    pub confirmation_timeout_secs: u64,
    pub cycle_deadline_secs: u64,

    // --- 运行 ---
    /// 暂存、诊断和锁文件目录
    pub scratch_dir: String,
    /// 锁文件超过该时长视为残留
    pub stale_lock_secs: u64,
    /// 设置后常驻运行，按该间隔执行周期
    pub cycle_interval_secs: Option<u64>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            series_id: "twin-peaks".to_string(),
            series_title: "Twin Peaks".to_string(),
            database_path: "catalog.db".to_string(),
            catalog_file: None,
            file_store: FileStoreKind::Drive,
            media_root: "media".to_string(),
            drive_api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            drive_download_base_url: "https://drive.google.com/uc".to_string(),
            drive_api_key: None,
            drive_access_token: None,
            folder_capacity: 100,
            item_prefix: "frame_".to_string(),
            item_extension: "png".to_string(),
            item_index_width: 4,
            caption_item_label: "Item".to_string(),
            compose_url: "https://x.com/compose/tweet".to_string(),
            login_marker: "login".to_string(),
            cookies_base64: None,
            chrome_executable: None,
            browser_debug_port: None,
            headless: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36".to_string(),
            selectors: ComposeSelectors::default(),
            navigation_timeout_secs: 45,
            attachment_timeout_secs: 10,
            confirmation_timeout_secs: 5,
            cycle_deadline_secs: 60,
            scratch_dir: "tmp".to_string(),
            stale_lock_secs: 15 * 60,
            cycle_interval_secs: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：先读 TOML 文件（如果存在），再用环境变量覆盖
    ///
    /// 文件路径取 `FRAME_POSTER_CONFIG`，默认 `frame_poster.toml`。
    pub fn load() -> Result<Self> {
        let path = std::env::var("FRAME_POSTER_CONFIG").unwrap_or_else(|_| "frame_poster.toml".to_string());
        let base = if Path::new(&path).exists() {
            Self::from_toml_file(Path::new(&path))?
        } else {
            Self::default()
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 只从环境变量读取，缺失的字段使用默认值
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("无法解析配置文件: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn with_env_overrides(self) -> Self {
        let default = self;
        Self {
            series_id: env_or("SERIES_ID", default.series_id),
            series_title: env_or("SERIES_TITLE", default.series_title),
            database_path: env_or("DATABASE_PATH", default.database_path),
            catalog_file: std::env::var("CATALOG_FILE").ok().or(default.catalog_file),
            file_store: match std::env::var("FILE_STORE").ok().as_deref() {
                Some("local") => FileStoreKind::Local,
                Some("drive") => FileStoreKind::Drive,
                _ => default.file_store,
            },
            media_root: env_or("MEDIA_ROOT", default.media_root),
            drive_api_key: std::env::var("DRIVE_API_KEY").ok().or(default.drive_api_key),
            drive_access_token: std::env::var("DRIVE_ACCESS_TOKEN").ok().or(default.drive_access_token),
            folder_capacity: env_parse("FOLDER_CAPACITY").unwrap_or(default.folder_capacity),
            compose_url: env_or("COMPOSE_URL", default.compose_url),
            cookies_base64: std::env::var("COOKIES_BASE64").ok().or(default.cookies_base64),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.chrome_executable),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").or(default.browser_debug_port),
            headless: env_parse("HEADLESS").unwrap_or(default.headless),
            scratch_dir: env_or("SCRATCH_DIR", default.scratch_dir),
            cycle_deadline_secs: env_parse("CYCLE_DEADLINE_SECS").unwrap_or(default.cycle_deadline_secs),
            cycle_interval_secs: env_parse("CYCLE_INTERVAL_SECS").or(default.cycle_interval_secs),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            ..default
        }
    }

    /// 校验会导致周期无法运行的配置
    pub fn validate(&self) -> Result<()> {
        if self.series_id.trim().is_empty() {
            anyhow::bail!("series_id 不能为空");
        }
        if self.folder_capacity == 0 {
            anyhow::bail!("folder_capacity 必须大于 0");
        }
        if self.cycle_deadline_secs == 0 {
            anyhow::bail!("cycle_deadline_secs 必须大于 0");
        }
        Ok(())
    }
}

fn env_or(name: &str, fallback: String) -> String {
    std::env::var(name).unwrap_or(fallback)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_only_listed_fields() {
        let config = Config::from_toml_str(
            r#"
            series_id = "dune"
            folder_capacity = 50
            file_store = "local"

            [selectors]
            textbox = "textarea"
            "#,
        )
        .unwrap();

        assert_eq!(config.series_id, "dune");
        assert_eq!(config.folder_capacity, 50);
        assert_eq!(config.file_store, FileStoreKind::Local);
        assert_eq!(config.selectors.textbox, "textarea");
        assert_eq!(config.selectors.file_input, ComposeSelectors::default().file_input);
        assert_eq!(config.cycle_deadline_secs, 60);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = Config {
            folder_capacity: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
