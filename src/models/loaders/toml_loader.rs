use crate::models::catalog::CurrentPointer;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 目录种子：系列 → 季 → 集
///
/// 季和集的顺序即文件中的声明顺序，遍历时按此顺序推进。
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSeed {
    pub series: SeriesSeed,
    #[serde(default)]
    pub seasons: Vec<SeasonSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesSeed {
    pub id: String,
    pub title: String,
    /// 缺省时指向第一季第一集
    pub current: Option<CurrentPointer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonSeed {
    pub id: String,
    #[serde(default)]
    pub episodes: Vec<EpisodeSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeSeed {
    pub id: String,
    pub episode_number: u32,
    #[serde(default)]
    pub folder_ids: Vec<String>,
    #[serde(default)]
    pub total_files: u32,
}

impl CatalogSeed {
    /// 初始指针：显式指定的，或第一季第一集
    pub fn initial_pointer(&self) -> Option<CurrentPointer> {
        if let Some(current) = &self.series.current {
            return Some(current.clone());
        }
        let season = self.seasons.first()?;
        let episode = season.episodes.first()?;
        Some(CurrentPointer::new(&season.id, &episode.id))
    }
}

/// 解析 TOML 格式的目录种子
pub fn parse_catalog_seed(content: &str) -> Result<CatalogSeed> {
    let seed: CatalogSeed = toml::from_str(content)?;
    if seed.initial_pointer().is_none() {
        anyhow::bail!("目录 {} 没有任何剧集", seed.series.id);
    }
    Ok(seed)
}

/// 从 TOML 文件加载目录种子
pub async fn load_catalog_seed(path: &Path) -> Result<CatalogSeed> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取目录文件: {}", path.display()))?;

    let seed = parse_catalog_seed(&content)
        .with_context(|| format!("无法解析目录文件: {}", path.display()))?;

    let episode_count: usize = seed.seasons.iter().map(|s| s.episodes.len()).sum();
    tracing::info!(
        "成功加载目录 {}: {} 季, {} 集",
        seed.series.title,
        seed.seasons.len(),
        episode_count
    );

    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r#"
        [series]
        id = "twin-peaks"
        title = "Twin Peaks"

        [[seasons]]
        id = "season-1"

        [[seasons.episodes]]
        id = "episode-1"
        episode_number = 1
        folder_ids = ["f1", "f2"]
        total_files = 180

        [[seasons.episodes]]
        id = "episode-2"
        episode_number = 2
        folder_ids = ["f3"]
        total_files = 90
    "#;

    #[test]
    fn defaults_pointer_to_first_episode() {
        let seed = parse_catalog_seed(SEED).unwrap();
        assert_eq!(
            seed.initial_pointer(),
            Some(CurrentPointer::new("season-1", "episode-1"))
        );
    }

    #[test]
    fn rejects_catalog_without_episodes() {
        let err = parse_catalog_seed(
            r#"
            [series]
            id = "empty"
            title = "Empty"
            "#,
        );
        assert!(err.is_err());
    }
}
