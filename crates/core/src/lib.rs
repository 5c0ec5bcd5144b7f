pub mod config;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod reseed;
pub mod stats;
pub mod testing;
pub mod torrent_client;
pub mod tracker;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    DownloaderConfig, JobConfig, SanitizedConfig, RISK_CONFIRMATION_TEXT,
};
pub use notify::{LogNotifier, Notification, Notifier, NotifyError, WebhookNotifier};
pub use orchestrator::{
    JobHandle, JobScheduler, OrchestratorError, RunOrchestrator, RunSummary, Schedule,
    ScheduleError,
};
pub use reseed::{CandidateFilter, ReseedExecutor, ReseedOptions, ReseedOutcome};
pub use stats::{
    KvStore, ReclassifyReport, SqliteKvStore, StatsAggregator, StatsDocument, StatsSummary,
    StoreError,
};
pub use torrent_client::{DownloaderClient, QBittorrentClient, TorrentClientError, TorrentRecord};
pub use tracker::{classify, TrackerMapping};
