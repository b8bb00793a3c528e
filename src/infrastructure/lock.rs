//! 周期锁
//!
//! 每个系列一个锁文件，`create_new` 保证同一时刻只有一个周期在发布。
//! 锁在 drop 时删除；进程崩溃留下的锁超过 `stale_after` 后被回收，
//! 回收前先改名核对内容，避免两个进程同时回收同一把锁。

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

#[derive(Debug)]
pub struct CycleLock {
    path: PathBuf,
}

impl CycleLock {
    /// 尝试获取锁，已被持有时返回 `Ok(None)`
    pub fn acquire(dir: &Path, key: &str, stale_after: Duration) -> std::io::Result<Option<Self>> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.lock", sanitize(key)));

        if let Some(lock) = Self::try_create(&path)? {
            return Ok(Some(lock));
        }

        if is_stale(&path, stale_after) {
            let stamp = match fs::read_to_string(&path) {
                Ok(stamp) => stamp,
                Err(e) if e.kind() == ErrorKind::NotFound => return Self::try_create(&path),
                Err(e) => return Err(e),
            };
            warn!("⚠️ 回收残留的锁文件: {}", path.display());
            if reclaim(&path, &stamp)? {
                return Self::try_create(&path);
            }
            debug!("残留锁已被其他进程回收: {}", path.display());
        }

        Ok(None)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_create(path: &Path) -> std::io::Result<Option<Self>> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                writeln!(
                    file,
                    "{} {}",
                    std::process::id(),
                    chrono::Utc::now().to_rfc3339()
                )?;
                debug!("已获取锁: {}", path.display());
                Ok(Some(Self {
                    path: path.to_path_buf(),
                }))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Drop for CycleLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("⚠️ 无法删除锁文件 {}: {}", self.path.display(), e);
        }
    }
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .map(|age| age > stale_after)
        .unwrap_or(false)
}

/// 把判定为残留的锁改名后再核对内容，只有内容仍是 `expected` 时才删除
///
/// 改名是原子的，两个进程同时回收时只有一个能拿到文件；
/// 拿到的若已是别人新建的锁，用硬链接放回原处（目标已存在时不覆盖）。
fn reclaim(path: &Path, expected: &str) -> std::io::Result<bool> {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".stale.{}.{}", std::process::id(), nanos));
    let parked = PathBuf::from(name);

    match fs::rename(path, &parked) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    }

    let current = fs::read_to_string(&parked)?;
    if current == expected {
        fs::remove_file(&parked)?;
        return Ok(true);
    }

    match fs::hard_link(&parked, path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
        Err(e) => return Err(e),
    }
    fs::remove_file(&parked)?;
    Ok(false)
}

fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_refused_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let stale = Duration::from_secs(600);

        let first = CycleLock::acquire(dir.path(), "twin-peaks", stale).unwrap();
        assert!(first.is_some());
        assert!(CycleLock::acquire(dir.path(), "twin-peaks", stale)
            .unwrap()
            .is_none());

        drop(first);
        assert!(CycleLock::acquire(dir.path(), "twin-peaks", stale)
            .unwrap()
            .is_some());
    }

    #[test]
    fn stale_lock_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("show.lock");
        fs::write(&path, "1 old").unwrap();
        let hour_ago = std::time::SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(hour_ago)
            .unwrap();

        let lock = CycleLock::acquire(dir.path(), "show", Duration::from_secs(60)).unwrap();
        assert!(lock.is_some());
        assert_ne!(fs::read_to_string(&path).unwrap(), "1 old");
    }

    #[test]
    fn reclaim_removes_the_lock_it_judged_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("show.lock");
        fs::write(&path, "1 old").unwrap();

        assert!(reclaim(&path, "1 old").unwrap());
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn reclaim_puts_back_a_lock_that_was_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("show.lock");
        // 另一个进程已经回收并写入了新锁
        fs::write(&path, "2 fresh").unwrap();

        assert!(!reclaim(&path, "1 old").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "2 fresh");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn reclaim_of_a_vanished_lock_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("show.lock");

        assert!(!reclaim(&path, "1 old").unwrap());
        assert!(!path.exists());
    }
}
