//! SQLite 目录存储
//!
//! 计数的递增用单条 `UPDATE … SET x = x + 1 RETURNING x` 完成，
//! 换集/换季在一个事务里同时改写指针和清零计数。

use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::infrastructure::catalog_store::CatalogStore;
use crate::models::{CatalogSeed, CounterField, CurrentPointer, EpisodeRecord, SeriesRecord};

pub struct SqliteCatalog {
    series_id: String,
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// 打开（必要时创建）数据库文件并执行迁移
    pub fn open(path: &Path, series_id: impl Into<String>) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("无法创建数据库目录: {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("无法打开数据库: {}", path.display()))?;
        let catalog = Self {
            series_id: series_id.into(),
            conn: Mutex::new(conn),
        };
        catalog.migrate()?;
        Ok(catalog)
    }

    pub fn open_in_memory(series_id: impl Into<String>) -> anyhow::Result<Self> {
        let catalog = Self {
            series_id: series_id.into(),
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        catalog.migrate()?;
        Ok(catalog)
    }

    fn migrate(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS series (
                    series_id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    current_season TEXT NOT NULL,
                    current_episode TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS seasons (
                    series_id TEXT NOT NULL,
                    season_id TEXT NOT NULL,
                    ordinal INTEGER NOT NULL,
                    PRIMARY KEY (series_id, season_id)
                );
                CREATE TABLE IF NOT EXISTS episodes (
                    series_id TEXT NOT NULL,
                    season_id TEXT NOT NULL,
                    episode_id TEXT NOT NULL,
                    ordinal INTEGER NOT NULL,
                    episode_number INTEGER NOT NULL,
                    folder_ids TEXT NOT NULL,
                    total_files INTEGER NOT NULL DEFAULT 0,
                    last_index INTEGER NOT NULL DEFAULT 0,
                    index_folder INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (series_id, season_id, episode_id)
                );
                "#,
            )?;
            Ok(())
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut conn)
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn seed(&self, seed: &CatalogSeed) -> StoreResult<()> {
        let series_id = self.series_id.clone();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;

            for (season_ordinal, season) in seed.seasons.iter().enumerate() {
                tx.execute(
                    r#"
                    INSERT INTO seasons (series_id, season_id, ordinal)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(series_id, season_id) DO UPDATE SET ordinal = excluded.ordinal
                    "#,
                    params![series_id, season.id, season_ordinal as i64],
                )?;

                for (ordinal, ep) in season.episodes.iter().enumerate() {
                    let folder_ids = serde_json::to_string(&ep.folder_ids)?;
                    tx.execute(
                        r#"
                        INSERT INTO episodes
                            (series_id, season_id, episode_id, ordinal, episode_number, folder_ids, total_files)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                        ON CONFLICT(series_id, season_id, episode_id) DO UPDATE SET
                            ordinal = excluded.ordinal,
                            episode_number = excluded.episode_number,
                            folder_ids = excluded.folder_ids,
                            total_files = excluded.total_files
                        "#,
                        params![
                            series_id,
                            season.id,
                            ep.id,
                            ordinal as i64,
                            ep.episode_number,
                            folder_ids,
                            ep.total_files
                        ],
                    )?;
                }
            }

            if let Some(current) = seed.initial_pointer() {
                tx.execute(
                    r#"
                    INSERT INTO series (series_id, title, current_season, current_episode)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(series_id) DO UPDATE SET title = excluded.title
                    "#,
                    params![series_id, seed.series.title, current.season_id, current.episode_id],
                )?;
            }

            tx.commit()?;
            debug!("目录种子已写入: {}", series_id);
            Ok(())
        })
    }

    async fn series(&self) -> StoreResult<Option<SeriesRecord>> {
        self.with_conn(|conn| {
            let record = conn
                .query_row(
                    "SELECT series_id, title, current_season, current_episode FROM series WHERE series_id = ?1",
                    params![self.series_id],
                    |row| {
                        Ok(SeriesRecord {
                            series_id: row.get(0)?,
                            title: row.get(1)?,
                            current: CurrentPointer {
                                season_id: row.get(2)?,
                                episode_id: row.get(3)?,
                            },
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
    }

    async fn episode(
        &self,
        season_id: &str,
        episode_id: &str,
    ) -> StoreResult<Option<EpisodeRecord>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    r#"
                    SELECT episode_id, episode_number, folder_ids, total_files, last_index, index_folder
                    FROM episodes
                    WHERE series_id = ?1 AND season_id = ?2 AND episode_id = ?3
                    "#,
                    params![self.series_id, season_id, episode_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, u32>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, u32>(3)?,
                            row.get::<_, u32>(4)?,
                            row.get::<_, u32>(5)?,
                        ))
                    },
                )
                .optional()?;

            let Some((episode_id, episode_number, folder_ids, total_files, last_index, index_folder)) =
                row
            else {
                return Ok(None);
            };

            Ok(Some(EpisodeRecord {
                episode_id,
                episode_number,
                folder_ids: serde_json::from_str(&folder_ids)?,
                total_files,
                last_index,
                index_folder,
            }))
        })
    }

    async fn list_seasons(&self) -> StoreResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT season_id FROM seasons WHERE series_id = ?1 ORDER BY ordinal, season_id",
            )?;
            let rows = stmt.query_map(params![self.series_id], |row| row.get(0))?;

            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    async fn list_episodes(&self, season_id: &str) -> StoreResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT episode_id FROM episodes
                WHERE series_id = ?1 AND season_id = ?2
                ORDER BY ordinal, episode_id
                "#,
            )?;
            let rows = stmt.query_map(params![self.series_id, season_id], |row| row.get(0))?;

            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    async fn increment(&self, episode: &CurrentPointer, field: CounterField) -> StoreResult<u32> {
        let column = field.column();
        let sql = format!(
            "UPDATE episodes SET {column} = {column} + 1 \
             WHERE series_id = ?1 AND season_id = ?2 AND episode_id = ?3 \
             RETURNING {column}"
        );
        self.with_conn(|conn| {
            conn.query_row(
                &sql,
                params![self.series_id, episode.season_id, episode.episode_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| {
                StoreError::not_found(format!("{}/{}", episode.season_id, episode.episode_id))
            })
        })
    }

    async fn set_counter(
        &self,
        episode: &CurrentPointer,
        field: CounterField,
        value: u32,
    ) -> StoreResult<()> {
        let column = field.column();
        let sql = format!(
            "UPDATE episodes SET {column} = ?4 \
             WHERE series_id = ?1 AND season_id = ?2 AND episode_id = ?3"
        );
        self.with_conn(|conn| {
            let changed = conn.execute(
                &sql,
                params![self.series_id, episode.season_id, episode.episode_id, value],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found(format!(
                    "{}/{}",
                    episode.season_id, episode.episode_id
                )));
            }
            Ok(())
        })
    }

    async fn move_current(&self, target: &CurrentPointer) -> StoreResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;

            let reset = tx.execute(
                r#"
                UPDATE episodes SET last_index = 0, index_folder = 0
                WHERE series_id = ?1 AND season_id = ?2 AND episode_id = ?3
                "#,
                params![self.series_id, target.season_id, target.episode_id],
            )?;
            let moved = tx.execute(
                "UPDATE series SET current_season = ?2, current_episode = ?3 WHERE series_id = ?1",
                params![self.series_id, target.season_id, target.episode_id],
            )?;

            if reset == 0 || moved == 0 {
                // 事务未提交，drop 时回滚
                return Err(StoreError::not_found(format!(
                    "{}/{}",
                    target.season_id, target.episode_id
                )));
            }

            tx.commit()?;
            Ok(())
        })
    }
}
