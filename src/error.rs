//! 错误类型
//!
//! 按层划分：存储层（`StoreError` / `FileStoreError`）、能力层
//! （`ResolveError` / `AdvanceError` / `PostError`）、编排层（`CycleError`）。
//! 文件夹耗尽、剧集耗尽等属于正常的控制流，不在这里表示。

use thiserror::Error;

/// 目录存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 没有系列记录或当前剧集不存在
    #[error("未找到当前剧集: {0}")]
    NotFound(String),

    /// SQLite 操作失败
    #[error("数据库错误: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// 文件夹列表编码/解码失败
    #[error("字段编码失败: {0}")]
    Encoding(#[from] serde_json::Error),

    /// 存储锁被毒化（持有锁的线程 panic）
    #[error("存储锁已损坏")]
    Poisoned,
}

impl StoreError {
    /// 创建 NotFound 错误
    pub fn not_found(msg: impl Into<String>) -> Self {
        StoreError::NotFound(msg.into())
    }
}

/// 外部文件存储错误
#[derive(Debug, Error)]
pub enum FileStoreError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// 返回了非成功状态码
    #[error("返回错误状态 ({endpoint}): {status}")]
    BadStatus { endpoint: String, status: u16 },

    /// 本地读写失败
    #[error("文件操作失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 文件 ID 不存在
    #[error("文件不存在: {0}")]
    Missing(String),
}

impl FileStoreError {
    /// 是否值得重试（超时、连接失败、5xx、429）
    pub fn is_retryable(&self) -> bool {
        match self {
            FileStoreError::Request { source, .. } => source.is_timeout() || source.is_connect(),
            FileStoreError::BadStatus { status, .. } => {
                *status == 429 || (500..600).contains(status)
            }
            FileStoreError::Io { .. } | FileStoreError::Missing(_) => false,
        }
    }
}

/// 内容定位错误
#[derive(Debug, Error)]
pub enum ResolveError {
    /// 当前剧集没有任何文件夹
    #[error("剧集 {episode_id} 没有可用的文件夹")]
    NoFolderAvailable { episode_id: String },

    /// 查询文件存储失败
    #[error("查询文件 {name} 失败: {source}")]
    Lookup {
        name: String,
        #[source]
        source: FileStoreError,
    },
}

/// 剧集推进错误
#[derive(Debug, Error)]
pub enum AdvanceError {
    /// 当前指针指向的季/集已不在目录中
    #[error("当前{kind}不在目录中: {id}")]
    CurrentNotFound { kind: &'static str, id: String },

    /// 下一季没有任何剧集
    #[error("季 {season_id} 没有任何剧集")]
    EmptySeason { season_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 发布流程错误
///
/// 所有变体都只影响当前这一帧：位置不推进，下次调用重试。
#[derive(Debug, Error)]
pub enum PostError {
    /// 下载到暂存目录失败
    #[error("下载失败 ({name}): {reason}")]
    DownloadFailed { name: String, reason: String },

    /// 会话凭证缺失或无法解码
    #[error("认证失败: {0}")]
    AuthFailed(String),

    /// 找不到可用的浏览器或启动失败
    #[error("浏览器启动失败: {0}")]
    AgentLaunchFailed(String),

    /// 被重定向到登录页
    #[error("未登录，已被重定向到: {0}")]
    NotAuthenticated(String),

    /// 等待页面元素超时
    #[error("等待 {what} 超时 ({secs}s)")]
    PostTimeout { what: String, secs: u64 },

    /// 整个发布流程超过截止时间
    #[error("发布流程超过截止时间 ({0}s)")]
    DeadlineExceeded(u64),

    /// 浏览器操作失败
    #[error("浏览器操作失败: {0}")]
    Browser(String),
}

impl From<chromiumoxide::error::CdpError> for PostError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        PostError::Browser(err.to_string())
    }
}

/// 单次调度周期错误
#[derive(Debug, Error)]
pub enum CycleError {
    /// 同一系列已有周期在运行
    #[error("系列 {0} 已有调度周期在运行")]
    Busy(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Advance(#[from] AdvanceError),

    /// 推进次数超过目录规模，目录可能损坏
    #[error("推进 {steps} 次仍未找到内容，目录可能已损坏")]
    CatalogExhausted { steps: usize },

    #[error(transparent)]
    Post(#[from] PostError),

    /// 锁文件读写失败
    #[error("锁文件操作失败: {0}")]
    Lock(#[source] std::io::Error),
}

impl CycleError {
    /// 是否只影响当前帧（下次调用会自动重试）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CycleError::Post(_)
                | CycleError::Busy(_)
                | CycleError::Resolve(ResolveError::Lookup { .. })
        )
    }
}

/// 存储层结果类型
pub type StoreResult<T> = Result<T, StoreError>;
