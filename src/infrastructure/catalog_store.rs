//! 目录存储 - 基础设施层
//!
//! 只暴露文档式存储的能力：读指针、按声明顺序列出季/集、读剧集记录、
//! 原子递增计数、改写指针。不认识"文件夹耗尽"之类的流程概念。

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::models::{CatalogSeed, CounterField, CurrentPointer, EpisodeRecord, SeriesRecord};

/// 目录存储接口
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// 补齐种子中缺失的季/集，已有的计数不受影响
    async fn seed(&self, seed: &CatalogSeed) -> StoreResult<()>;

    /// 系列记录，尚未初始化时为 None
    async fn series(&self) -> StoreResult<Option<SeriesRecord>>;

    async fn episode(&self, season_id: &str, episode_id: &str)
        -> StoreResult<Option<EpisodeRecord>>;

    /// 按声明顺序列出季 ID
    async fn list_seasons(&self) -> StoreResult<Vec<String>>;

    /// 按声明顺序列出某季的集 ID
    async fn list_episodes(&self, season_id: &str) -> StoreResult<Vec<String>>;

    /// 原子地把计数加 1，返回新值
    async fn increment(&self, episode: &CurrentPointer, field: CounterField) -> StoreResult<u32>;

    async fn set_counter(
        &self,
        episode: &CurrentPointer,
        field: CounterField,
        value: u32,
    ) -> StoreResult<()>;

    /// 改写系列指针，并在同一事务中把目标剧集的两个计数清零
    async fn move_current(&self, target: &CurrentPointer) -> StoreResult<()>;
}

/// 内存目录，用于测试和试运行
///
/// 记录写操作次数，方便断言"没有任何改动"。
pub struct MemoryCatalog {
    series_id: String,
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    series: Option<SeriesRecord>,
    seasons: Vec<(String, Vec<EpisodeRecord>)>,
    mutations: usize,
}

impl MemoryState {
    fn episode_mut(&mut self, pointer: &CurrentPointer) -> StoreResult<&mut EpisodeRecord> {
        self.seasons
            .iter_mut()
            .find(|(id, _)| *id == pointer.season_id)
            .and_then(|(_, episodes)| {
                episodes
                    .iter_mut()
                    .find(|e| e.episode_id == pointer.episode_id)
            })
            .ok_or_else(|| {
                StoreError::not_found(format!("{}/{}", pointer.season_id, pointer.episode_id))
            })
    }
}

impl MemoryCatalog {
    pub fn new(series_id: impl Into<String>) -> Self {
        Self {
            series_id: series_id.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// 直接从种子构建
    pub fn from_seed(seed: &CatalogSeed) -> StoreResult<Self> {
        let catalog = Self::new(&seed.series.id);
        catalog.apply_seed(seed)?;
        Ok(catalog)
    }

    /// 写操作次数（increment / set_counter / move_current）
    pub fn mutation_count(&self) -> usize {
        self.state.lock().map(|s| s.mutations).unwrap_or(0)
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    fn apply_seed(&self, seed: &CatalogSeed) -> StoreResult<()> {
        let mut state = self.lock()?;

        for season in &seed.seasons {
            let index = match state.seasons.iter().position(|(id, _)| *id == season.id) {
                Some(index) => index,
                None => {
                    state.seasons.push((season.id.clone(), Vec::new()));
                    state.seasons.len() - 1
                }
            };
            let episodes = &mut state.seasons[index].1;
            for ep in &season.episodes {
                match episodes.iter_mut().find(|e| e.episode_id == ep.id) {
                    Some(existing) => {
                        existing.episode_number = ep.episode_number;
                        existing.folder_ids = ep.folder_ids.clone();
                        existing.total_files = ep.total_files;
                    }
                    None => episodes.push(EpisodeRecord {
                        episode_id: ep.id.clone(),
                        episode_number: ep.episode_number,
                        folder_ids: ep.folder_ids.clone(),
                        total_files: ep.total_files,
                        last_index: 0,
                        index_folder: 0,
                    }),
                }
            }
        }

        if state.series.is_none() {
            if let Some(current) = seed.initial_pointer() {
                state.series = Some(SeriesRecord {
                    series_id: self.series_id.clone(),
                    title: seed.series.title.clone(),
                    current,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn seed(&self, seed: &CatalogSeed) -> StoreResult<()> {
        self.apply_seed(seed)
    }

    async fn series(&self) -> StoreResult<Option<SeriesRecord>> {
        Ok(self.lock()?.series.clone())
    }

    async fn episode(
        &self,
        season_id: &str,
        episode_id: &str,
    ) -> StoreResult<Option<EpisodeRecord>> {
        let state = self.lock()?;
        Ok(state
            .seasons
            .iter()
            .find(|(id, _)| id == season_id)
            .and_then(|(_, episodes)| episodes.iter().find(|e| e.episode_id == episode_id))
            .cloned())
    }

    async fn list_seasons(&self) -> StoreResult<Vec<String>> {
        Ok(self.lock()?.seasons.iter().map(|(id, _)| id.clone()).collect())
    }

    async fn list_episodes(&self, season_id: &str) -> StoreResult<Vec<String>> {
        let state = self.lock()?;
        Ok(state
            .seasons
            .iter()
            .find(|(id, _)| id == season_id)
            .map(|(_, episodes)| episodes.iter().map(|e| e.episode_id.clone()).collect())
            .unwrap_or_default())
    }

    async fn increment(&self, episode: &CurrentPointer, field: CounterField) -> StoreResult<u32> {
        let mut state = self.lock()?;
        let record = state.episode_mut(episode)?;
        let counter = match field {
            CounterField::LastIndex => &mut record.last_index,
            CounterField::IndexFolder => &mut record.index_folder,
        };
        *counter += 1;
        let value = *counter;
        state.mutations += 1;
        Ok(value)
    }

    async fn set_counter(
        &self,
        episode: &CurrentPointer,
        field: CounterField,
        value: u32,
    ) -> StoreResult<()> {
        let mut state = self.lock()?;
        let record = state.episode_mut(episode)?;
        match field {
            CounterField::LastIndex => record.last_index = value,
            CounterField::IndexFolder => record.index_folder = value,
        }
        state.mutations += 1;
        Ok(())
    }

    async fn move_current(&self, target: &CurrentPointer) -> StoreResult<()> {
        let mut state = self.lock()?;
        if state.series.is_none() {
            return Err(StoreError::not_found(format!("系列 {}", self.series_id)));
        }
        let record = state.episode_mut(target)?;
        record.last_index = 0;
        record.index_folder = 0;
        if let Some(series) = state.series.as_mut() {
            series.current = target.clone();
        }
        state.mutations += 1;
        Ok(())
    }
}
