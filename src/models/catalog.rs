//! 目录记录：系列指针与剧集记录

use serde::{Deserialize, Serialize};

/// 系列当前指向的季/集
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentPointer {
    pub season_id: String,
    pub episode_id: String,
}

impl CurrentPointer {
    pub fn new(season_id: impl Into<String>, episode_id: impl Into<String>) -> Self {
        Self {
            season_id: season_id.into(),
            episode_id: episode_id.into(),
        }
    }
}

/// 系列记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRecord {
    pub series_id: String,
    pub title: String,
    pub current: CurrentPointer,
}

/// 剧集记录
///
/// `last_index` / `index_folder` 是该集的位置投影，换集时清零。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRecord {
    pub episode_id: String,
    pub episode_number: u32,
    /// 按顺序排列的外部文件夹 ID
    pub folder_ids: Vec<String>,
    pub total_files: u32,
    pub last_index: u32,
    pub index_folder: u32,
}

/// 可原子递增/重置的计数字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterField {
    /// 文件夹内的帧偏移
    LastIndex,
    /// 文件夹索引
    IndexFolder,
}

impl CounterField {
    /// 对应的数据库列名
    pub fn column(self) -> &'static str {
        match self {
            CounterField::LastIndex => "last_index",
            CounterField::IndexFolder => "index_folder",
        }
    }
}
