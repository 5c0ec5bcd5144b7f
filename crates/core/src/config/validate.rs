use std::collections::HashSet;

use super::{types::Config, ConfigError};
use crate::orchestrator::Schedule;

/// Validate configuration
///
/// Collects every problem instead of stopping at the first. The risk
/// acknowledgment is not checked here; runs refuse on their own without it.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut problems = Vec::new();

    if config.server.port == 0 {
        problems.push("server.port cannot be 0".to_string());
    }

    let mut names = HashSet::new();
    for (idx, downloader) in config.downloaders.iter().enumerate() {
        if downloader.name.trim().is_empty() {
            problems.push(format!("downloaders[{}].name cannot be empty", idx));
        } else if !names.insert(downloader.name.as_str()) {
            problems.push(format!("duplicate downloader name '{}'", downloader.name));
        }
        if downloader.url.trim().is_empty() {
            problems.push(format!("downloaders[{}].url cannot be empty", idx));
        }
    }

    for selected in &config.job.downloaders {
        if !names.contains(selected.as_str()) {
            problems.push(format!(
                "job.downloaders references unknown downloader '{}'",
                selected
            ));
        }
    }

    if let Err(e) = Schedule::cron(config.job.effective_cron()) {
        problems.push(format!("job.cron: {}", e));
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(problems))
    }
}
