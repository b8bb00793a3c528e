//! 发布上下文
//!
//! 封装"这是第几个周期、发的是哪一帧"这一信息

use std::fmt::Display;

use crate::models::Position;

/// 发布上下文
#[derive(Debug, Clone)]
pub struct PostCtx {
    /// 周期编号（仅用于日志显示）
    pub cycle: u64,

    /// 解析出条目时的遍历位置
    pub position: Position,

    /// 每个文件夹的帧数
    pub capacity: u32,
}

impl PostCtx {
    pub fn new(cycle: u64, position: Position, capacity: u32) -> Self {
        Self {
            cycle,
            position,
            capacity,
        }
    }

    /// 帧在整集中的序号（从 1 开始）
    pub fn absolute_index(&self) -> u32 {
        self.position.absolute_index(self.capacity)
    }
}

impl Display for PostCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[周期 #{} {} 第{}集 帧#{}/{}]",
            self.cycle,
            self.position.season_id,
            self.position.episode_number,
            self.absolute_index(),
            self.position.total_items
        )
    }
}
