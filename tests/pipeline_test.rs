mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use common::{seed, staged_frames, write_frames, FakeLauncher, Harness, Step};
use frame_poster::error::{CycleError, FileStoreError, PostError};
use frame_poster::infrastructure::{FileStore, LocalFileStore};
use frame_poster::models::ContentItem;
use frame_poster::services::diagnostics::{DUMP_PREFIX, SCREENSHOT_NAME};
use frame_poster::services::{DiagnosticsRecorder, PostingAgent, SessionPoster};
use frame_poster::{PostCtx, PostingPipeline};
use tokio_test::{assert_err, assert_ok};

fn harness() -> Harness {
    let harness = Harness::new(&seed(&[("season-1", &[("ep-1", 1, &["a"])])]), 100);
    write_frames(&harness.media(), "a", 1, 3);
    harness
}

fn poster(harness: &Harness, launcher: FakeLauncher) -> Arc<dyn PostingAgent> {
    Arc::new(
        SessionPoster::new(launcher, "https://x.com/compose/post", "login")
            .with_diagnostics(DiagnosticsRecorder::new(harness.scratch())),
    )
}

fn dumps(scratch: &Path) -> usize {
    std::fs::read_dir(scratch)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with(DUMP_PREFIX))
                .count()
        })
        .unwrap_or(0)
}

#[tokio::test]
async fn successful_post_drives_every_step_and_closes() {
    let harness = harness();
    let launcher = FakeLauncher::new();
    let scheduler = harness.scheduler(poster(&harness, launcher.clone()));

    assert_ok!(scheduler.run_one_cycle().await);

    assert_eq!(
        launcher.calls(),
        vec![
            "launch",
            "prepare",
            "navigate",
            "type_caption",
            "caption:Series - S01E01 - Item 1 of 500",
            "attach",
            "wait_attachment",
            "submit",
            "wait_confirmation",
            "close",
        ]
    );
    assert!(staged_frames(&harness.scratch()).is_empty());
    assert!(!harness.scratch().join(SCREENSHOT_NAME).exists());
}

#[tokio::test]
async fn failure_at_any_step_keeps_position_and_cleans_up() {
    let steps = [
        Step::Launch,
        Step::Prepare,
        Step::Navigate,
        Step::TypeCaption,
        Step::Attach,
        Step::WaitAttachment,
        Step::Submit,
        Step::WaitConfirmation,
    ];

    for step in steps {
        let harness = harness();
        let launcher = FakeLauncher::failing_at(step);
        let scheduler = harness.scheduler(poster(&harness, launcher.clone()));

        let err = assert_err!(scheduler.run_one_cycle().await);
        assert!(matches!(err, CycleError::Post(_)), "{:?}: {}", step, err);
        assert_eq!(harness.catalog.mutation_count(), 0, "{:?}", step);
        assert!(staged_frames(&harness.scratch()).is_empty(), "{:?}", step);

        let calls = launcher.calls();
        if step == Step::Launch {
            assert_eq!(calls, vec!["launch"]);
            assert!(!harness.scratch().join(SCREENSHOT_NAME).exists());
        } else {
            assert_eq!(calls.last().map(String::as_str), Some("close"), "{:?}", step);
            assert!(calls.contains(&"screenshot".to_string()));
            assert!(harness.scratch().join(SCREENSHOT_NAME).exists());
            assert_eq!(dumps(&harness.scratch()), 1);
        }
    }
}

#[tokio::test]
async fn credential_injection_failure_is_diagnosed_and_closed() {
    let harness = harness();
    let launcher = FakeLauncher::failing_at(Step::Prepare);
    let scheduler = harness.scheduler(poster(&harness, launcher.clone()));

    let err = assert_err!(scheduler.run_one_cycle().await);
    assert!(matches!(err, CycleError::Post(PostError::Browser(_))));

    let calls = launcher.calls();
    assert_eq!(&calls[..2], ["launch", "prepare"]);
    assert!(!calls.contains(&"navigate".to_string()));
    assert!(calls.contains(&"screenshot".to_string()));
    assert_eq!(calls.last().map(String::as_str), Some("close"));
    assert!(harness.scratch().join(SCREENSHOT_NAME).exists());
}

#[tokio::test]
async fn waits_report_timeouts() {
    let harness = harness();
    let scheduler = harness.scheduler(poster(&harness, FakeLauncher::failing_at(Step::WaitAttachment)));

    let err = assert_err!(scheduler.run_one_cycle().await);
    assert!(matches!(err, CycleError::Post(PostError::PostTimeout { .. })));
}

#[tokio::test]
async fn login_redirect_is_not_authenticated() {
    let harness = harness();
    let launcher = FakeLauncher {
        final_url: "https://x.com/i/flow/login".to_string(),
        ..FakeLauncher::new()
    };
    let scheduler = harness.scheduler(poster(&harness, launcher.clone()));

    let err = assert_err!(scheduler.run_one_cycle().await);
    assert!(matches!(err, CycleError::Post(PostError::NotAuthenticated(_))));
    assert!(!launcher.calls().contains(&"type_caption".to_string()));
    assert_eq!(harness.catalog.mutation_count(), 0);
}

#[tokio::test]
async fn repeated_failures_keep_a_single_dump() {
    let harness = harness();
    let scheduler = harness.scheduler(poster(&harness, FakeLauncher::failing_at(Step::Submit)));

    assert_err!(scheduler.run_one_cycle().await);
    // 快照文件名精确到毫秒
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_err!(scheduler.run_one_cycle().await);

    assert_eq!(dumps(&harness.scratch()), 1);
}

#[tokio::test]
async fn deadline_aborts_post_and_still_cleans_up() {
    let harness = harness();
    let launcher = FakeLauncher {
        hang_at: Some(Step::WaitConfirmation),
        ..FakeLauncher::new()
    };
    let agent = poster(&harness, launcher.clone());
    let files = Arc::new(LocalFileStore::new(harness.media()));
    let pipeline = PostingPipeline::new(files, agent.clone(), &harness.config)
        .with_deadline(Duration::from_millis(100));
    let scheduler = harness.scheduler(agent).with_pipeline(pipeline);

    let err = assert_err!(scheduler.run_one_cycle().await);
    assert!(matches!(err, CycleError::Post(PostError::DeadlineExceeded(_))));
    assert!(staged_frames(&harness.scratch()).is_empty());
    assert_eq!(harness.catalog.mutation_count(), 0);

    // 会话在后台关闭
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(launcher.calls().last().map(String::as_str), Some("close"));
}

/// 下载写了一半就卡住的文件存储
struct StalledDownload(LocalFileStore);

#[async_trait]
impl FileStore for StalledDownload {
    async fn find_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<ContentItem>, FileStoreError> {
        self.0.find_by_name(folder_id, name).await
    }

    async fn download(&self, _item: &ContentItem, dest: &Path) -> Result<u64, FileStoreError> {
        tokio::fs::write(dest, b"partial")
            .await
            .map_err(|source| FileStoreError::Io {
                path: dest.display().to_string(),
                source,
            })?;
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(7)
    }
}

#[tokio::test]
async fn deadline_covers_a_stalled_download() {
    let harness = harness();
    let launcher = FakeLauncher::new();
    let agent = poster(&harness, launcher.clone());
    let files = Arc::new(StalledDownload(LocalFileStore::new(harness.media())));
    let pipeline = PostingPipeline::new(files, agent.clone(), &harness.config)
        .with_deadline(Duration::from_millis(100));
    let scheduler = harness.scheduler(agent).with_pipeline(pipeline);

    let started = Instant::now();
    let err = assert_err!(scheduler.run_one_cycle().await);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(matches!(err, CycleError::Post(PostError::DeadlineExceeded(_))));

    // 半截文件随下载一起被丢弃
    assert!(staged_frames(&harness.scratch()).is_empty());
    assert!(launcher.calls().is_empty());
    assert_eq!(harness.catalog.mutation_count(), 0);
}

#[tokio::test]
async fn missing_item_is_download_failure() {
    let harness = harness();
    let launcher = FakeLauncher::new();
    let pipeline = PostingPipeline::new(
        Arc::new(LocalFileStore::new(harness.media())),
        poster(&harness, launcher.clone()),
        &harness.config,
    );
    let position = frame_poster::services::PositionStore::new(harness.catalog.clone())
        .read()
        .await
        .unwrap();

    let item = ContentItem::new("a/frame_0999.png", "frame_0999.png");
    let err = assert_err!(pipeline.post(&item, &PostCtx::new(1, position, 100)).await);

    assert!(matches!(err, PostError::DownloadFailed { .. }));
    assert!(launcher.calls().is_empty());
    assert!(staged_frames(&harness.scratch()).is_empty());
}
