//! 位置存储 - 业务能力层
//!
//! 把"系列指针 + 当前剧集记录"包装成遍历位置，并提供
//! 原子递增/重置/换集的能力。所有写操作返回前已落盘。

use std::sync::Arc;

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::infrastructure::CatalogStore;
use crate::models::{CounterField, CurrentPointer, Position};

#[derive(Clone)]
pub struct PositionStore {
    catalog: Arc<dyn CatalogStore>,
}

impl PositionStore {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogStore> {
        &self.catalog
    }

    /// 读取当前位置，没有系列记录或当前剧集时返回 `NotFound`
    pub async fn read(&self) -> StoreResult<Position> {
        let series = self
            .catalog
            .series()
            .await?
            .ok_or_else(|| StoreError::not_found("系列记录不存在"))?;

        let episode = self
            .catalog
            .episode(&series.current.season_id, &series.current.episode_id)
            .await?
            .ok_or_else(|| {
                StoreError::not_found(format!(
                    "{}/{}",
                    series.current.season_id, series.current.episode_id
                ))
            })?;

        Ok(Position::from_records(&series, &episode))
    }

    /// 帧偏移原子加 1，返回新值
    pub async fn increment_frame(&self) -> StoreResult<u32> {
        let active = self.active().await?;
        let value = self
            .catalog
            .increment(&active, CounterField::LastIndex)
            .await?;
        debug!("帧偏移 -> {}", value);
        Ok(value)
    }

    pub async fn reset_frame(&self) -> StoreResult<()> {
        let active = self.active().await?;
        self.catalog
            .set_counter(&active, CounterField::LastIndex, 0)
            .await
    }

    /// 文件夹索引原子加 1，返回新值
    pub async fn advance_folder(&self) -> StoreResult<u32> {
        let active = self.active().await?;
        let value = self
            .catalog
            .increment(&active, CounterField::IndexFolder)
            .await?;
        debug!("文件夹索引 -> {}", value);
        Ok(value)
    }

    /// 切换到同一季的另一集，目标剧集计数清零
    pub async fn switch_episode(&self, season_id: &str, episode_id: &str) -> StoreResult<()> {
        self.catalog
            .move_current(&CurrentPointer::new(season_id, episode_id))
            .await
    }

    /// 切换到另一季的某一集，目标剧集计数清零
    pub async fn switch_season(&self, season_id: &str, episode_id: &str) -> StoreResult<()> {
        self.catalog
            .move_current(&CurrentPointer::new(season_id, episode_id))
            .await
    }

    async fn active(&self) -> StoreResult<CurrentPointer> {
        self.catalog
            .series()
            .await?
            .map(|s| s.current)
            .ok_or_else(|| StoreError::not_found("系列记录不存在"))
    }
}
