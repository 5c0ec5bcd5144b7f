//! Run lifecycle integration tests.
//!
//! These tests drive complete runs through the orchestrator against mock
//! downloaders and a SQLite-backed statistics store:
//! refuse | fetch -> select -> reseed each -> record -> notify

use std::sync::Arc;

use tempfile::TempDir;

use reseedjump_core::{
    config::RISK_CONFIRMATION_TEXT,
    testing::{fixtures, MockDownloaderClient, MockNotifier, MockOperation},
    torrent_client::{TorrentRecord, TorrentState},
    DownloaderClient, JobConfig, OrchestratorError, RunOrchestrator, SqliteKvStore,
    StatsAggregator, TrackerMapping,
};

/// Test helper holding a file-backed store and an export directory.
struct TestHarness {
    stats: Arc<StatsAggregator>,
    notifier: MockNotifier,
    db_path: std::path::PathBuf,
    export_dir: std::path::PathBuf,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("stats.db");
        let export_dir = temp_dir.path().join("exports");
        let store = Arc::new(SqliteKvStore::new(&db_path).expect("Failed to create store"));

        Self {
            stats: Arc::new(StatsAggregator::new(store)),
            notifier: MockNotifier::new(),
            db_path,
            export_dir,
            _temp_dir: temp_dir,
        }
    }

    fn job(&self) -> JobConfig {
        JobConfig {
            notify: true,
            downloaders: vec!["qb".to_string()],
            paused_only: true,
            include_tags: "seed".to_string(),
            auto_start: false,
            risk_confirmation: RISK_CONFIRMATION_TEXT.to_string(),
            export_dir: Some(self.export_dir.clone()),
            ..Default::default()
        }
    }

    fn orchestrator(&self, job: JobConfig, clients: &[MockDownloaderClient]) -> RunOrchestrator {
        let clients = clients
            .iter()
            .cloned()
            .map(|c| Arc::new(c) as Arc<dyn DownloaderClient>)
            .collect();
        RunOrchestrator::new(
            job,
            clients,
            Arc::clone(&self.stats),
            Arc::new(self.notifier.clone()),
        )
    }
}

#[tokio::test]
async fn test_single_matching_candidate_is_reseeded() {
    let harness = TestHarness::new();
    let client = MockDownloaderClient::new("qb");
    client
        .add_mock_torrent(fixtures::paused_torrent("match", "seed,other"))
        .await;
    client
        .add_mock_torrent(fixtures::seeding_torrent("active", "movies"))
        .await;

    let orchestrator = harness.orchestrator(harness.job(), &[client.clone()]);
    let summary = orchestrator.run_all().await.expect("run should proceed");

    assert_eq!(summary.candidates, 1);
    assert_eq!(summary.success, 1);
    assert_eq!(client.exported_hashes().await, vec!["match".to_string()]);
    let added = client.added_requests().await;
    assert_eq!(added.len(), 1);
    assert!(added[0].paused);
    assert!(added[0].skip_checking);

    let readded = client.torrent("match").await.expect("torrent re-added");
    assert!(readded.tags.contains(&"已跳校".to_string()));
    assert_eq!(readded.state, TorrentState::PausedUploading);
    assert!(client.has_torrent("active").await);
}

#[tokio::test]
async fn test_auto_start_readds_unpaused() {
    let harness = TestHarness::new();
    let client = MockDownloaderClient::new("qb");
    client
        .add_mock_torrent(fixtures::paused_torrent("match", "seed"))
        .await;

    let mut job = harness.job();
    job.auto_start = true;
    let orchestrator = harness.orchestrator(job, &[client.clone()]);
    let summary = orchestrator.run_all().await.unwrap();

    assert_eq!(summary.success, 1);
    let added = client.added_requests().await;
    assert_eq!(added.len(), 1);
    assert!(!added[0].paused);
    assert_eq!(
        client.torrent("match").await.map(|t| t.state),
        Some(TorrentState::Seeding)
    );
}

#[tokio::test]
async fn test_refused_run_has_no_side_effects() {
    let harness = TestHarness::new();
    let client = MockDownloaderClient::new("qb");
    client
        .add_mock_torrent(fixtures::paused_torrent("match", "seed"))
        .await;

    let mut job = harness.job();
    job.risk_confirmation = format!("{}。", RISK_CONFIRMATION_TEXT);
    let orchestrator = harness.orchestrator(job, &[client.clone()]);

    assert_eq!(
        orchestrator.run_all().await,
        Err(OrchestratorError::RiskNotAcknowledged)
    );
    assert!(client.exported_hashes().await.is_empty());
    assert!(client.deleted().await.is_empty());
    assert!(harness.notifier.sent().await.is_empty());
    assert!(!harness.export_dir.exists());
}

#[tokio::test]
async fn test_destructive_gap_is_counted_and_file_kept() {
    let harness = TestHarness::new();
    let client = MockDownloaderClient::new("qb");
    client
        .add_mock_torrent(fixtures::paused_torrent("lost", "seed"))
        .await;
    client.fail(MockOperation::Add).await;

    let orchestrator = harness.orchestrator(harness.job(), &[client.clone()]);
    let summary = orchestrator.run_all().await.unwrap();

    assert_eq!((summary.success, summary.failed), (0, 1));
    assert!(!client.has_torrent("lost").await);
    assert!(harness.export_dir.join("lost.torrent").exists());

    let stats = harness.stats.snapshot().unwrap();
    let total = &stats.total["qb"];
    assert_eq!(total.failed, 1);
    assert_eq!(total.trackers.get("example"), Some(&1));
}

#[tokio::test]
async fn test_statistics_survive_reopen_and_accumulate() {
    let harness = TestHarness::new();
    let client = MockDownloaderClient::new("qb");
    client
        .add_mock_torrent(fixtures::paused_torrent("a", "seed"))
        .await;

    harness
        .orchestrator(harness.job(), &[client.clone()])
        .run_all()
        .await
        .unwrap();

    // The re-added torrent carries no "seed" tag and is not picked again.
    client
        .add_mock_torrent(fixtures::paused_torrent("b", "seed"))
        .await;
    harness
        .orchestrator(harness.job(), &[client.clone()])
        .run_all()
        .await
        .unwrap();

    let reopened = StatsAggregator::new(Arc::new(SqliteKvStore::new(&harness.db_path).unwrap()));
    let summary = reopened.summary().unwrap();
    assert_eq!(summary.today_count, 2);
    assert_eq!(summary.total_count, 2);
    assert_eq!(
        summary.total_volume,
        2 * fixtures::paused_torrent("x", "").size_bytes
    );

    let sent = harness.notifier.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(sent[1].text.contains("历史跳校数量：2"));
}

#[tokio::test]
async fn test_reclassify_after_run_uses_new_mapping() {
    let harness = TestHarness::new();
    let client = MockDownloaderClient::new("qb");
    client
        .add_mock_torrent(
            TorrentRecord::new("a", "A", TorrentState::PausedUploading)
                .with_tags("seed")
                .with_size(100)
                .with_tracker("https://tracker.alpha.org/announce"),
        )
        .await;
    client
        .add_mock_torrent(
            TorrentRecord::new("b", "B", TorrentState::PausedDownloading)
                .with_tags("seed")
                .with_size(50)
                .with_tracker("https://beta.net/announce"),
        )
        .await;

    harness
        .orchestrator(harness.job(), &[client])
        .run_all()
        .await
        .unwrap();

    let before = harness.stats.snapshot().unwrap();
    assert_eq!(before.total["qb"].trackers.len(), 2);

    let mapping = TrackerMapping::parse("alpha:Merged\nbeta:Merged");
    let report = harness.stats.reclassify_all(&mapping).unwrap();
    assert!(report.changed());

    let after = harness.stats.snapshot().unwrap();
    assert_eq!(after.total["qb"].trackers.get("Merged"), Some(&2));
    assert_eq!(after.total["qb"].volumes.get("Merged"), Some(&150));
    assert_eq!(after.total["qb"].success, 2);
}

#[tokio::test]
async fn test_multiple_downloaders_in_order() {
    let harness = TestHarness::new();
    let first = MockDownloaderClient::new("qb");
    first
        .add_mock_torrent(fixtures::paused_torrent("a", "seed"))
        .await;
    let second = MockDownloaderClient::new("qb2");
    second
        .add_mock_torrent(fixtures::paused_torrent("b", "seed"))
        .await;
    second
        .add_mock_torrent(fixtures::paused_torrent("c", "seed"))
        .await;

    let mut job = harness.job();
    job.downloaders.push("qb2".to_string());
    let summary = harness
        .orchestrator(job, &[first, second])
        .run_all()
        .await
        .unwrap();

    let names: Vec<_> = summary.clients.iter().map(|c| c.client.as_str()).collect();
    assert_eq!(names, vec!["qb", "qb2"]);
    assert_eq!(summary.success, 3);

    let stats = harness.stats.snapshot().unwrap();
    assert_eq!(stats.total["qb"].success, 1);
    assert_eq!(stats.total["qb2"].success, 2);
}

#[tokio::test]
async fn test_reset_clears_everything() {
    let harness = TestHarness::new();
    let client = MockDownloaderClient::new("qb");
    client
        .add_mock_torrent(fixtures::paused_torrent("a", "seed"))
        .await;
    harness
        .orchestrator(harness.job(), &[client])
        .run_all()
        .await
        .unwrap();
    assert!(!harness.stats.snapshot().unwrap().is_empty());

    harness.stats.reset_all().unwrap();

    let doc = harness.stats.snapshot().unwrap();
    assert!(doc.daily.is_empty());
    assert!(doc.total.is_empty());
}
