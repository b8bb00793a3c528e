//! 应用上下文
//!
//! 启动时构建一次，之后以引用传给每个组件。

use std::sync::Arc;

use crate::config::Config;
use crate::infrastructure::{CatalogStore, FileStore};
use crate::services::PostingAgent;

#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub catalog: Arc<dyn CatalogStore>,
    pub files: Arc<dyn FileStore>,
    pub agent: Arc<dyn PostingAgent>,
}

impl AppContext {
    pub fn new(
        config: Config,
        catalog: Arc<dyn CatalogStore>,
        files: Arc<dyn FileStore>,
        agent: Arc<dyn PostingAgent>,
    ) -> Self {
        Self {
            config,
            catalog,
            files,
            agent,
        }
    }
}
