//! 内容定位 - 业务能力层
//!
//! 根据位置算出期望的文件名，到当前文件夹里查找。
//! 找不到即视为文件夹耗尽，没有单独的数量探测。

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::ResolveError;
use crate::infrastructure::FileStore;
use crate::models::{ContentItem, Position};

/// 定位结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ContentItem),
    /// 当前文件夹已没有下一帧
    ExhaustedFolder,
}

/// 帧文件命名规则：`<prefix><序号补零>.<ext>`
#[derive(Debug, Clone)]
pub struct ItemNaming {
    pub prefix: String,
    pub extension: String,
    pub width: usize,
}

impl ItemNaming {
    pub fn from_config(config: &Config) -> Self {
        Self {
            prefix: config.item_prefix.clone(),
            extension: config.item_extension.clone(),
            width: config.item_index_width,
        }
    }

    pub fn name_for(&self, absolute_index: u32) -> String {
        let stem = format!("{}{:0width$}", self.prefix, absolute_index, width = self.width);
        if self.extension.is_empty() {
            stem
        } else {
            format!("{}.{}", stem, self.extension)
        }
    }
}

impl Default for ItemNaming {
    fn default() -> Self {
        Self {
            prefix: "frame_".to_string(),
            extension: "png".to_string(),
            width: 4,
        }
    }
}

pub struct ContentResolver {
    files: Arc<dyn FileStore>,
    naming: ItemNaming,
    capacity: u32,
}

impl ContentResolver {
    pub fn new(files: Arc<dyn FileStore>, naming: ItemNaming, capacity: u32) -> Self {
        Self {
            files,
            naming,
            capacity,
        }
    }

    /// 定位下一帧
    pub async fn resolve_next(&self, position: &Position) -> Result<Resolution, ResolveError> {
        if position.folder_ids.is_empty() {
            warn!("⚠️ {} 没有任何文件夹", position);
            return Err(ResolveError::NoFolderAvailable {
                episode_id: position.episode_id.clone(),
            });
        }

        // 最后一个文件夹满额后索引会停在列表之外，等价于耗尽
        let Some(folder_id) = position.current_folder() else {
            info!("📦 {} 文件夹索引已越过末尾", position);
            return Ok(Resolution::ExhaustedFolder);
        };

        let name = self.naming.name_for(position.absolute_index(self.capacity));
        let found = self
            .files
            .find_by_name(folder_id, &name)
            .await
            .map_err(|source| {
                error!("❌ 查询 {} 失败: {}", name, source);
                ResolveError::Lookup {
                    name: name.clone(),
                    source,
                }
            })?;

        match found {
            Some(item) => {
                info!("✓ 找到文件 {} ({})", item.display_name, item.external_id);
                Ok(Resolution::Found(item))
            }
            None => {
                info!("⚠️ 文件夹 {} 中没有 {}", folder_id, name);
                Ok(Resolution::ExhaustedFolder)
            }
        }
    }
}
