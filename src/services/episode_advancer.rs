//! 剧集推进 - 业务能力层
//!
//! 文件夹耗尽后的状态机，每次调用只推进一步：
//!
//! ```text
//! 文件夹耗尽 ─┬─ 本集还有文件夹 → 下一个文件夹
//!             └─ 本集耗尽 ─┬─ 本季还有剧集 → 下一集
//!                          └─ 本季耗尽 ─┬─ 还有下一季 → 下一季第一集
//!                                       └─ 目录完结（不做任何写入）
//! ```
//!
//! 季和集的顺序以目录声明顺序为准，当前位置按 ID 匹配。

use tracing::{error, info};

use crate::error::{AdvanceError, StoreResult};
use crate::models::Position;
use crate::services::position_store::PositionStore;

/// 推进结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    NextFolder { folder_index: u32 },
    NextEpisode { season_id: String, episode_id: String },
    NextSeason { season_id: String, episode_id: String },
    /// 没有下一季，整个目录已发完
    CatalogComplete,
}

pub struct EpisodeAdvancer {
    positions: PositionStore,
}

impl EpisodeAdvancer {
    pub fn new(positions: PositionStore) -> Self {
        Self { positions }
    }

    /// 从一个已耗尽的文件夹推进一步
    pub async fn step(&self, position: &Position) -> Result<Advance, AdvanceError> {
        if position.has_next_folder() {
            let folder_index = self.positions.advance_folder().await?;
            self.positions.reset_frame().await?;
            info!("📦 切换到文件夹 {}", folder_index);
            return Ok(Advance::NextFolder { folder_index });
        }

        info!("🎬 第 {} 集的文件夹已全部完成", position.episode_number);
        self.next_episode(position).await
    }

    async fn next_episode(&self, position: &Position) -> Result<Advance, AdvanceError> {
        let catalog = self.positions.catalog();
        let episodes = catalog.list_episodes(&position.season_id).await?;
        let current = episodes
            .iter()
            .position(|id| *id == position.episode_id)
            .ok_or_else(|| {
                error!("❌ 当前剧集 {} 不在 {} 中", position.episode_id, position.season_id);
                AdvanceError::CurrentNotFound {
                    kind: "剧集",
                    id: position.episode_id.clone(),
                }
            })?;

        match episodes.get(current + 1) {
            Some(next) => {
                self.positions
                    .switch_episode(&position.season_id, next)
                    .await?;
                info!("🎞️ 切换到下一集: {}", next);
                Ok(Advance::NextEpisode {
                    season_id: position.season_id.clone(),
                    episode_id: next.clone(),
                })
            }
            None => {
                info!("✅ {} 的剧集已全部完成，切换到下一季", position.season_id);
                self.next_season(position).await
            }
        }
    }

    async fn next_season(&self, position: &Position) -> Result<Advance, AdvanceError> {
        let catalog = self.positions.catalog();
        let seasons = catalog.list_seasons().await?;
        let current = seasons
            .iter()
            .position(|id| *id == position.season_id)
            .ok_or_else(|| {
                error!("❌ 当前季 {} 不在目录中", position.season_id);
                AdvanceError::CurrentNotFound {
                    kind: "季",
                    id: position.season_id.clone(),
                }
            })?;

        let Some(next_season) = seasons.get(current + 1) else {
            info!("✅ 所有季都已完成");
            return Ok(Advance::CatalogComplete);
        };

        let episodes = catalog.list_episodes(next_season).await?;
        let Some(first) = episodes.first() else {
            error!("❌ 季 {} 没有任何剧集", next_season);
            return Err(AdvanceError::EmptySeason {
                season_id: next_season.clone(),
            });
        };

        self.positions.switch_season(next_season, first).await?;
        info!("🎬 切换到下一季: {} / {}", next_season, first);
        Ok(Advance::NextSeason {
            season_id: next_season.clone(),
            episode_id: first.clone(),
        })
    }

    /// 季 + 集 + 文件夹总数，单个周期内推进次数不应超过它
    pub async fn traversal_budget(&self) -> StoreResult<usize> {
        let catalog = self.positions.catalog();
        let seasons = catalog.list_seasons().await?;
        let mut budget = seasons.len();

        for season_id in &seasons {
            for episode_id in catalog.list_episodes(season_id).await? {
                budget += 1;
                if let Some(episode) = catalog.episode(season_id, &episode_id).await? {
                    budget += episode.folder_ids.len();
                }
            }
        }
        Ok(budget)
    }
}
