//! 遍历位置与内容条目

use std::fmt::Display;

use crate::models::catalog::{EpisodeRecord, SeriesRecord};

/// 当前遍历位置
///
/// 由系列指针和当前剧集记录拼出来，每个周期读取一次。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub season_id: String,
    pub episode_id: String,
    pub episode_number: u32,
    pub folder_index: u32,
    /// 当前文件夹内下一帧的偏移（从 0 开始）
    pub frame_index: u32,
    pub folder_ids: Vec<String>,
    pub total_items: u32,
}

impl Position {
    pub fn from_records(series: &SeriesRecord, episode: &EpisodeRecord) -> Self {
        Self {
            season_id: series.current.season_id.clone(),
            episode_id: series.current.episode_id.clone(),
            episode_number: episode.episode_number,
            folder_index: episode.index_folder,
            frame_index: episode.last_index,
            folder_ids: episode.folder_ids.clone(),
            total_items: episode.total_files,
        }
    }

    /// 在整集中的绝对序号（从 1 开始）
    pub fn absolute_index(&self, capacity: u32) -> u32 {
        self.folder_index * capacity + self.frame_index + 1
    }

    /// 当前文件夹 ID，索引越界时为 None
    pub fn current_folder(&self) -> Option<&str> {
        self.folder_ids
            .get(self.folder_index as usize)
            .map(String::as_str)
    }

    /// 本集是否还有下一个文件夹
    pub fn has_next_folder(&self) -> bool {
        (self.folder_index as usize) + 1 < self.folder_ids.len()
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} / {} 第{}集 文件夹#{} 帧#{}]",
            self.season_id, self.episode_id, self.episode_number, self.folder_index, self.frame_index
        )
    }
}

/// 外部文件存储中的一个条目，只在当前周期内有效
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub external_id: String,
    pub display_name: String,
}

impl ContentItem {
    pub fn new(external_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            display_name: display_name.into(),
        }
    }
}
