use std::sync::Arc;

use reseedjump_core::{Config, RunOrchestrator, SanitizedConfig, StatsAggregator, TrackerMapping};

/// Shared application state
pub struct AppState {
    config: Config,
    stats: Arc<StatsAggregator>,
    orchestrator: Option<Arc<RunOrchestrator>>,
}

impl AppState {
    pub fn new(
        config: Config,
        stats: Arc<StatsAggregator>,
        orchestrator: Option<Arc<RunOrchestrator>>,
    ) -> Self {
        Self {
            config,
            stats,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn stats(&self) -> &StatsAggregator {
        self.stats.as_ref()
    }

    /// Mapping used when reprocessing stored statistics.
    pub fn tracker_mapping(&self) -> TrackerMapping {
        self.config.job.mapping()
    }

    pub fn orchestrator(&self) -> Option<&Arc<RunOrchestrator>> {
        self.orchestrator.as_ref()
    }
}
