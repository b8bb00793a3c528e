//! Google Drive 文件存储
//!
//! 列表查询走 Drive v3 API；下载优先使用 API（配置了访问令牌时），
//! 否则使用公开的 `uc?export=download` 链接。两者都带指数退避重试。

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::FileStoreError;
use crate::infrastructure::file_store::FileStore;
use crate::models::ContentItem;
use crate::utils::retry::{retry_async, RetryPolicy};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: Option<String>,
    name: Option<String>,
}

/// Drive 文件存储客户端
pub struct DriveFileStore {
    http: reqwest::Client,
    api_base_url: String,
    download_base_url: String,
    api_key: Option<String>,
    access_token: Option<String>,
    retry: RetryPolicy,
}

impl DriveFileStore {
    pub fn new(config: &Config) -> Result<Self, FileStoreError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| FileStoreError::Request {
                endpoint: "client".to_string(),
                source,
            })?;

        Ok(Self {
            http,
            api_base_url: config.drive_api_base_url.trim_end_matches('/').to_string(),
            download_base_url: config.drive_download_base_url.clone(),
            api_key: config.drive_api_key.clone(),
            access_token: config.drive_access_token.clone(),
            retry: RetryPolicy::default(),
        })
    }

    /// Drive 查询语句：文件夹内、名称精确匹配、未进回收站
    pub fn build_query(folder_id: &str, name: &str) -> String {
        format!(
            "'{}' in parents and name='{}' and trashed=false",
            escape_literal(folder_id),
            escape_literal(name)
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        };
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn list_once(&self, query: &str) -> Result<FileList, FileStoreError> {
        let endpoint = format!("{}/files", self.api_base_url);
        let request = self.http.get(&endpoint).query(&[
            ("q", query),
            ("fields", "files(id, name)"),
            ("pageSize", "1"),
        ]);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|source| FileStoreError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(FileStoreError::BadStatus {
                endpoint,
                status: response.status().as_u16(),
            });
        }

        response
            .json::<FileList>()
            .await
            .map_err(|source| FileStoreError::Request { endpoint, source })
    }

    async fn fetch_once(&self, file_id: &str) -> Result<Vec<u8>, FileStoreError> {
        let (endpoint, request) = if self.access_token.is_some() {
            let endpoint = format!("{}/files/{}", self.api_base_url, file_id);
            let request = self.http.get(&endpoint).query(&[("alt", "media")]);
            (endpoint, self.authorize(request))
        } else {
            let endpoint = self.download_base_url.clone();
            let request = self
                .http
                .get(&endpoint)
                .query(&[("export", "download"), ("id", file_id)]);
            (endpoint, request)
        };

        let response = request
            .send()
            .await
            .map_err(|source| FileStoreError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;

        match response.status().as_u16() {
            404 => return Err(FileStoreError::Missing(file_id.to_string())),
            status if !(200..300).contains(&status) => {
                return Err(FileStoreError::BadStatus { endpoint, status })
            }
            _ => {}
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FileStoreError::Request { endpoint, source })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FileStore for DriveFileStore {
    async fn find_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<ContentItem>, FileStoreError> {
        let query = Self::build_query(folder_id, name);
        info!("🔍 在文件夹 {} 中查找文件 {}", folder_id, name);
        debug!("Drive 查询: {}", query);

        let list = retry_async(&self.retry, "Drive 列表查询", FileStoreError::is_retryable, || {
            self.list_once(&query)
        })
        .await?;

        Ok(list.files.into_iter().find_map(|f| match (f.id, f.name) {
            (Some(id), Some(name)) => Some(ContentItem::new(id, name)),
            _ => None,
        }))
    }

    async fn download(&self, item: &ContentItem, dest: &Path) -> Result<u64, FileStoreError> {
        let bytes = retry_async(&self.retry, "Drive 下载", FileStoreError::is_retryable, || {
            self.fetch_once(&item.external_id)
        })
        .await?;

        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|source| FileStoreError::Io {
                path: dest.display().to_string(),
                source,
            })?;

        debug!("已下载 {} ({} 字节)", item.display_name, bytes.len());
        Ok(bytes.len() as u64)
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_escapes_quotes() {
        assert_eq!(
            DriveFileStore::build_query("abc", "frame_0001.png"),
            "'abc' in parents and name='frame_0001.png' and trashed=false"
        );
        assert_eq!(
            DriveFileStore::build_query("abc", "it's.png"),
            r"'abc' in parents and name='it\'s.png' and trashed=false"
        );
    }
}
