use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::torrent_client::split_list;
use crate::tracker::TrackerMapping;

/// Sentence the operator must type to accept the delete-then-readd risk.
pub const RISK_CONFIRMATION_TEXT: &str =
    "我已知晓跳校可能带来的所有不良后果，且不会因此迁怒开发者";

/// Cron expression used when none (or an all-wildcard one) is configured.
pub const DEFAULT_CRON: &str = "0 0 */23 * *";

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub downloaders: Vec<DownloaderConfig>,
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("reseedjump.db")
}

/// One qBittorrent instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloaderConfig {
    /// Instance name, used for selection and as the statistics key.
    pub name: String,
    /// WebUI URL (e.g., "http://localhost:8080")
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Reseed job settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    /// Schedule the job at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Send a summary notification after runs that processed something.
    #[serde(default)]
    pub notify: bool,
    /// Run once shortly after startup instead of on the cron schedule.
    #[serde(default)]
    pub run_once: bool,
    /// Five-field cron expression.
    #[serde(default = "default_cron")]
    pub cron: String,
    /// Names of the downloader instances to process.
    #[serde(default)]
    pub downloaders: Vec<String>,
    /// Only consider torrents in an explicit paused state.
    #[serde(default = "default_true")]
    pub paused_only: bool,
    /// Comma-separated tags; a candidate must carry at least one.
    #[serde(default = "default_include_tags")]
    pub include_tags: String,
    /// Comma-separated categories; a candidate must be in one.
    #[serde(default)]
    pub include_categories: String,
    /// Tag applied to re-added torrents.
    #[serde(default = "default_processed_tag")]
    pub processed_tag: String,
    /// Category applied to re-added torrents, overriding the original.
    #[serde(default)]
    pub processed_category: String,
    /// Start re-added torrents immediately.
    #[serde(default = "default_true")]
    pub auto_start: bool,
    /// Keep the original category when no processed category is set.
    #[serde(default = "default_true")]
    pub preserve_category: bool,
    /// Remove the exported `.torrent` file after a successful re-add.
    #[serde(default)]
    pub delete_exported: bool,
    /// Must equal [`RISK_CONFIRMATION_TEXT`] for any run to execute.
    #[serde(default)]
    pub risk_confirmation: String,
    /// Where exported `.torrent` files are written (default: OS temp dir).
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
    /// `substring:site` lines.
    #[serde(default)]
    pub tracker_mapping: String,
}

fn default_true() -> bool {
    true
}

fn default_cron() -> String {
    DEFAULT_CRON.to_string()
}

fn default_include_tags() -> String {
    "IYUU自动辅种".to_string()
}

fn default_processed_tag() -> String {
    "已跳校".to_string()
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            notify: false,
            run_once: false,
            cron: default_cron(),
            downloaders: Vec::new(),
            paused_only: true,
            include_tags: default_include_tags(),
            include_categories: String::new(),
            processed_tag: default_processed_tag(),
            processed_category: String::new(),
            auto_start: true,
            preserve_category: true,
            delete_exported: false,
            risk_confirmation: String::new(),
            export_dir: None,
            tracker_mapping: String::new(),
        }
    }
}

impl JobConfig {
    /// Cron expression with empty and all-wildcard values replaced by the default.
    pub fn effective_cron(&self) -> &str {
        let cron = self.cron.trim();
        if cron.is_empty() || cron.chars().all(|c| c == '*' || c.is_whitespace()) {
            DEFAULT_CRON
        } else {
            cron
        }
    }

    /// Whether the risk sentence was typed exactly.
    pub fn risk_acknowledged(&self) -> bool {
        self.risk_confirmation.trim() == RISK_CONFIRMATION_TEXT
    }

    /// Reasons a run would be refused, empty when runs may proceed.
    pub fn readiness_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !self.risk_acknowledged() {
            problems.push(format!(
                "job.risk_confirmation must be exactly: {}",
                RISK_CONFIRMATION_TEXT
            ));
        }
        if self.downloaders.is_empty() {
            problems.push("job.downloaders must select at least one downloader".to_string());
        }
        problems
    }

    pub fn include_tag_list(&self) -> Vec<String> {
        split_list(&self.include_tags)
    }

    pub fn include_category_list(&self) -> Vec<String> {
        split_list(&self.include_categories)
    }

    pub fn mapping(&self) -> TrackerMapping {
        TrackerMapping::parse(&self.tracker_mapping)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Notification sink configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotifierConfig {
    /// POST notifications here as JSON; log only when absent.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub downloaders: Vec<SanitizedDownloaderConfig>,
    pub job: SanitizedJobConfig,
    pub webhook_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDownloaderConfig {
    pub name: String,
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedJobConfig {
    pub enabled: bool,
    pub notify: bool,
    pub run_once: bool,
    pub cron: String,
    pub downloaders: Vec<String>,
    pub paused_only: bool,
    pub include_tags: String,
    pub include_categories: String,
    pub processed_tag: String,
    pub processed_category: String,
    pub auto_start: bool,
    pub preserve_category: bool,
    pub delete_exported: bool,
    pub risk_acknowledged: bool,
    pub tracker_mapping_entries: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let job = &config.job;
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            downloaders: config
                .downloaders
                .iter()
                .map(|d| SanitizedDownloaderConfig {
                    name: d.name.clone(),
                    url: d.url.clone(),
                    username: d.username.clone(),
                    password_configured: !d.password.is_empty(),
                    timeout_secs: d.timeout_secs,
                })
                .collect(),
            job: SanitizedJobConfig {
                enabled: job.enabled,
                notify: job.notify,
                run_once: job.run_once,
                cron: job.effective_cron().to_string(),
                downloaders: job.downloaders.clone(),
                paused_only: job.paused_only,
                include_tags: job.include_tags.clone(),
                include_categories: job.include_categories.clone(),
                processed_tag: job.processed_tag.clone(),
                processed_category: job.processed_category.clone(),
                auto_start: job.auto_start,
                preserve_category: job.preserve_category,
                delete_exported: job.delete_exported,
                risk_acknowledged: job.risk_acknowledged(),
                tracker_mapping_entries: job.mapping().len(),
            },
            webhook_configured: config
                .notifier
                .webhook_url
                .as_ref()
                .is_some_and(|u| !u.is_empty()),
        }
    }
}
