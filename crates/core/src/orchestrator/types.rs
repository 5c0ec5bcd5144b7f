//! Types for the run orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a run is refused before any downloader is contacted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The risk sentence was not typed exactly.
    #[error("risk confirmation not acknowledged")]
    RiskNotAcknowledged,

    /// No downloader is selected for the job.
    #[error("no downloader selected")]
    NoClientsSelected,

    /// Another run is still executing.
    #[error("a run is already in progress")]
    RunInProgress,
}

/// Why a downloader contributed nothing to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum ClientSkipReason {
    Disconnected,
    ListFailed(String),
}

/// Per-downloader result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRunResult {
    pub client: String,
    pub candidates: u64,
    pub success: u64,
    pub failed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<ClientSkipReason>,
}

impl ClientRunResult {
    pub fn skipped(client: impl Into<String>, reason: ClientSkipReason) -> Self {
        Self {
            client: client.into(),
            candidates: 0,
            success: 0,
            failed: 0,
            skipped: Some(reason),
        }
    }

    pub fn processed(&self) -> u64 {
        self.success + self.failed
    }
}

/// Totals of one run across all downloaders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub candidates: u64,
    pub success: u64,
    pub failed: u64,
    pub clients: Vec<ClientRunResult>,
}

impl RunSummary {
    pub(crate) fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Default::default()
        }
    }

    pub(crate) fn add(&mut self, result: ClientRunResult) {
        self.candidates += result.candidates;
        self.success += result.success;
        self.failed += result.failed;
        self.clients.push(result);
    }

    pub fn processed(&self) -> u64 {
        self.success + self.failed
    }
}
