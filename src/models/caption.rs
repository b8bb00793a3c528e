//! 发布文案

use std::fmt::Display;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::position::Position;

/// 解析季号：优先取 `season-<n>`，否则取末尾的数字（`s2` → 2），都没有时为 0
pub fn season_number(season_id: &str) -> u32 {
    static SEASON_PREFIX: OnceLock<Option<Regex>> = OnceLock::new();
    static TRAILING_DIGITS: OnceLock<Option<Regex>> = OnceLock::new();

    let patterns = [
        SEASON_PREFIX.get_or_init(|| Regex::new(r"season-(\d+)").ok()),
        TRAILING_DIGITS.get_or_init(|| Regex::new(r"(\d+)\D*$").ok()),
    ];
    patterns
        .into_iter()
        .flatten()
        .find_map(|re| {
            re.captures(season_id)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
        .unwrap_or(0)
}

/// 文案：`<系列> - S<季>E<集> - <单位> <序号> of <总数>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub series_title: String,
    pub season: u32,
    pub episode: u32,
    pub absolute_index: u32,
    pub total: u32,
    pub item_label: String,
}

impl Caption {
    pub fn for_position(
        series_title: &str,
        item_label: &str,
        position: &Position,
        capacity: u32,
    ) -> Self {
        Self {
            series_title: series_title.to_string(),
            season: season_number(&position.season_id),
            episode: position.episode_number,
            absolute_index: position.absolute_index(capacity),
            total: position.total_items,
            item_label: item_label.to_string(),
        }
    }
}

impl Display for Caption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - S{:02}E{:02} - {} {} of {}",
            self.series_title,
            self.season,
            self.episode,
            self.item_label,
            self.absolute_index,
            self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(folder_index: u32, frame_index: u32) -> Position {
        Position {
            season_id: "season-1".to_string(),
            episode_id: "episode-3".to_string(),
            episode_number: 3,
            folder_index,
            frame_index,
            folder_ids: vec!["a".to_string(), "b".to_string()],
            total_items: 500,
        }
    }

    #[test]
    fn renders_padded_season_and_episode() {
        let caption = Caption::for_position("Series", "Item", &position(0, 41), 100);
        assert_eq!(caption.to_string(), "Series - S01E03 - Item 42 of 500");
    }

    #[test]
    fn absolute_index_spans_folders() {
        let caption = Caption::for_position("Series", "Frame", &position(1, 0), 100);
        assert_eq!(caption.to_string(), "Series - S01E03 - Frame 101 of 500");
    }

    #[test]
    fn season_number_parsing() {
        assert_eq!(season_number("season-12"), 12);
        assert_eq!(season_number("s2"), 2);
        assert_eq!(season_number("season-2-part-3"), 2);
        assert_eq!(season_number("pilot"), 0);
    }
}
