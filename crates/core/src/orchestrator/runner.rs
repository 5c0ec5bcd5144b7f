//! Run orchestrator implementation.
//!
//! Downloaders and the candidates within each are processed strictly
//! sequentially; no two delete/re-add sequences ever overlap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::JobConfig;
use crate::metrics;
use crate::notify::{summary_notification, Notifier};
use crate::reseed::{CandidateFilter, ReseedExecutor, ReseedFailure, ReseedOptions};
use crate::stats::{SiteAttribution, StatsAggregator};
use crate::torrent_client::DownloaderClient;

use super::types::{ClientRunResult, ClientSkipReason, OrchestratorError, RunSummary};

/// Resets the running flag when a run ends, including on panic.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives a full reseed run over the selected downloaders.
pub struct RunOrchestrator {
    job: JobConfig,
    clients: Vec<Arc<dyn DownloaderClient>>,
    stats: Arc<StatsAggregator>,
    notifier: Arc<dyn Notifier>,
    running: AtomicBool,
}

impl RunOrchestrator {
    /// Create an orchestrator. `clients` are processed in the given order.
    pub fn new(
        job: JobConfig,
        clients: Vec<Arc<dyn DownloaderClient>>,
        stats: Arc<StatsAggregator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            job,
            clients,
            stats,
            notifier,
            running: AtomicBool::new(false),
        }
    }

    pub fn job(&self) -> &JobConfig {
        &self.job
    }

    pub fn stats(&self) -> &Arc<StatsAggregator> {
        &self.stats
    }

    pub fn client_names(&self) -> Vec<String> {
        self.clients.iter().map(|c| c.name().to_string()).collect()
    }

    /// Whether a run is executing right now.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Execute one run.
    ///
    /// Refusals happen before any downloader is contacted. Everything after
    /// that is reported through the summary, never as an error.
    pub async fn run_all(&self) -> Result<RunSummary, OrchestratorError> {
        if !self.job.risk_acknowledged() {
            warn!("Run refused: risk confirmation not acknowledged");
            metrics::RUNS_TOTAL.with_label_values(&["refused"]).inc();
            return Err(OrchestratorError::RiskNotAcknowledged);
        }
        if self.clients.is_empty() {
            warn!("Run refused: no downloader selected");
            metrics::RUNS_TOTAL.with_label_values(&["refused"]).inc();
            return Err(OrchestratorError::NoClientsSelected);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Run skipped: previous run still in progress");
            metrics::RUNS_TOTAL.with_label_values(&["skipped"]).inc();
            return Err(OrchestratorError::RunInProgress);
        }
        let _guard = RunningGuard(&self.running);

        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("run", run_id = %run_id);
        let summary = self.execute(run_id).instrument(span).await;
        Ok(summary)
    }

    async fn execute(&self, run_id: String) -> RunSummary {
        let started = Instant::now();
        info!(clients = self.clients.len(), "Reseed run started");

        let filter = CandidateFilter::from_job(&self.job);
        let executor = ReseedExecutor::new(ReseedOptions::from_job(&self.job), self.job.mapping());
        let mut summary = RunSummary::new(run_id);

        for client in &self.clients {
            let result = self
                .run_client(client.as_ref(), &filter, &executor)
                .instrument(info_span!("client", client = client.name()))
                .await;
            summary.add(result);
        }

        info!(
            candidates = summary.candidates,
            success = summary.success,
            failed = summary.failed,
            "Reseed run finished"
        );

        if self.job.notify && summary.processed() > 0 {
            self.send_summary().await;
        } else {
            debug!(
                notify = self.job.notify,
                processed = summary.processed(),
                "Skipping completion notification"
            );
        }

        metrics::RUNS_TOTAL.with_label_values(&["completed"]).inc();
        metrics::RUN_DURATION
            .with_label_values(&[])
            .observe(started.elapsed().as_secs_f64());
        summary
    }

    async fn run_client(
        &self,
        client: &dyn DownloaderClient,
        filter: &CandidateFilter,
        executor: &ReseedExecutor,
    ) -> ClientRunResult {
        let name = client.name();

        if !client.is_connected().await {
            warn!("Downloader not connected, skipping");
            return ClientRunResult::skipped(name, ClientSkipReason::Disconnected);
        }

        let torrents = match client.list_torrents().await {
            Ok(torrents) => torrents,
            Err(e) => {
                warn!(error = %e, "Failed to list torrents, skipping downloader");
                return ClientRunResult::skipped(name, ClientSkipReason::ListFailed(e.to_string()));
            }
        };

        let candidates = filter.select(&torrents);
        info!(
            torrents = torrents.len(),
            candidates = candidates.len(),
            "Candidates selected"
        );
        metrics::CANDIDATES_SELECTED
            .with_label_values(&[name])
            .inc_by(candidates.len() as u64);

        let mut result = ClientRunResult {
            client: name.to_string(),
            candidates: candidates.len() as u64,
            success: 0,
            failed: 0,
            skipped: None,
        };
        let mut attribution = SiteAttribution::default();

        for torrent in candidates {
            let outcome = executor.reseed(torrent, client).await;
            attribution.merge(&outcome.attribution());

            let label = match &outcome.failure {
                None => "success",
                Some(ReseedFailure::Export(_)) => "export_failed",
                Some(ReseedFailure::Delete(_)) => "delete_failed",
                Some(ReseedFailure::Readd(_)) => "readd_failed",
            };
            metrics::TORRENTS_PROCESSED
                .with_label_values(&[name, label])
                .inc();

            if outcome.success {
                result.success += 1;
                metrics::RESEEDED_BYTES
                    .with_label_values(&[name])
                    .inc_by(outcome.volume);
            } else {
                result.failed += 1;
            }
        }

        info!(
            success = result.success,
            failed = result.failed,
            total = result.candidates,
            "Downloader finished"
        );

        if result.processed() > 0 {
            if let Err(e) = self
                .stats
                .record(name, result.success, result.failed, &attribution)
            {
                error!(error = %e, "Failed to record statistics; run results are not persisted");
                metrics::STATS_PERSIST_FAILURES.inc();
            }
        }

        result
    }

    async fn send_summary(&self) {
        let summary = match self.stats.summary() {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "Failed to load statistics for notification");
                metrics::STATS_PERSIST_FAILURES.inc();
                return;
            }
        };

        let notification = summary_notification(&summary, Local::now().naive_local());
        if let Err(e) = self.notifier.notify(notification).await {
            warn!(error = %e, "Failed to send completion notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RISK_CONFIRMATION_TEXT;
    use crate::stats::SqliteKvStore;
    use crate::testing::{fixtures, MockDownloaderClient, MockNotifier, MockOperation};
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        stats: Arc<StatsAggregator>,
        notifier: MockNotifier,
    }

    fn harness() -> (Harness, JobConfig) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteKvStore::in_memory().unwrap());
        let job = JobConfig {
            notify: true,
            downloaders: vec!["qb".to_string()],
            include_tags: String::new(),
            risk_confirmation: RISK_CONFIRMATION_TEXT.to_string(),
            export_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        (
            Harness {
                _dir: dir,
                stats: Arc::new(StatsAggregator::new(store)),
                notifier: MockNotifier::new(),
            },
            job,
        )
    }

    fn orchestrator(h: &Harness, job: JobConfig, clients: Vec<MockDownloaderClient>) -> RunOrchestrator {
        let clients = clients
            .into_iter()
            .map(|c| Arc::new(c) as Arc<dyn DownloaderClient>)
            .collect();
        RunOrchestrator::new(
            job,
            clients,
            Arc::clone(&h.stats),
            Arc::new(h.notifier.clone()),
        )
    }

    #[tokio::test]
    async fn test_refuses_without_risk_confirmation() {
        let (h, mut job) = harness();
        job.risk_confirmation = "我已知晓".to_string();
        let client = MockDownloaderClient::new("qb");
        client.add_mock_torrent(fixtures::paused_torrent("a", "")).await;
        let orch = orchestrator(&h, job, vec![client.clone()]);

        assert_eq!(
            orch.run_all().await.unwrap_err(),
            OrchestratorError::RiskNotAcknowledged
        );
        assert!(client.exported_hashes().await.is_empty());
        assert!(h.stats.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refuses_without_clients() {
        let (h, job) = harness();
        let orch = orchestrator(&h, job, vec![]);
        assert_eq!(
            orch.run_all().await.unwrap_err(),
            OrchestratorError::NoClientsSelected
        );
    }

    #[tokio::test]
    async fn test_skips_disconnected_and_failed_clients() {
        let (h, job) = harness();
        let offline = MockDownloaderClient::new("offline");
        offline.set_connected(false).await;
        let broken = MockDownloaderClient::new("broken");
        broken.fail(MockOperation::List).await;
        let healthy = MockDownloaderClient::new("healthy");
        healthy.add_mock_torrent(fixtures::paused_torrent("a", "")).await;

        let orch = orchestrator(&h, job, vec![offline, broken, healthy]);
        let summary = orch.run_all().await.unwrap();

        assert_eq!(summary.clients.len(), 3);
        assert_eq!(summary.clients[0].skipped, Some(ClientSkipReason::Disconnected));
        assert!(matches!(
            summary.clients[1].skipped,
            Some(ClientSkipReason::ListFailed(_))
        ));
        assert_eq!(summary.success, 1);

        let doc = h.stats.snapshot().unwrap();
        assert!(doc.total.contains_key("healthy"));
        assert!(!doc.total.contains_key("broken"));
        assert!(!doc.total.contains_key("offline"));
    }

    #[tokio::test]
    async fn test_failures_counted_and_notified() {
        let (h, job) = harness();
        let client = MockDownloaderClient::new("qb");
        client.add_mock_torrent(fixtures::paused_torrent("a", "")).await;
        client.add_mock_torrent(fixtures::paused_torrent("b", "")).await;
        client.fail_for(MockOperation::Add, "b").await;

        let orch = orchestrator(&h, job, vec![client]);
        let summary = orch.run_all().await.unwrap();

        assert_eq!((summary.candidates, summary.success, summary.failed), (2, 1, 1));
        let total = &h.stats.snapshot().unwrap().total["qb"];
        assert_eq!((total.success, total.failed), (1, 1));
        assert_eq!(total.trackers.get("example"), Some(&2));

        let sent = h.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("今日跳校数量：2"));
    }

    #[tokio::test]
    async fn test_no_notification_when_nothing_processed() {
        let (h, job) = harness();
        let client = MockDownloaderClient::new("qb");
        client.add_mock_torrent(fixtures::seeding_torrent("a", "")).await;

        let orch = orchestrator(&h, job, vec![client]);
        let summary = orch.run_all().await.unwrap();

        assert_eq!(summary.candidates, 0);
        assert!(h.notifier.sent().await.is_empty());
        assert!(h.stats.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notify_disabled() {
        let (h, mut job) = harness();
        job.notify = false;
        let client = MockDownloaderClient::new("qb");
        client.add_mock_torrent(fixtures::paused_torrent("a", "")).await;

        let orch = orchestrator(&h, job, vec![client]);
        orch.run_all().await.unwrap();
        assert!(h.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_fail_run() {
        let (h, job) = harness();
        h.notifier.set_fail(true).await;
        let client = MockDownloaderClient::new("qb");
        client.add_mock_torrent(fixtures::paused_torrent("a", "")).await;

        let orch = orchestrator(&h, job, vec![client]);
        assert_eq!(orch.run_all().await.unwrap().success, 1);
        assert!(!orch.is_running());
    }
}
