//! Run-completion notifications.

mod logger;
mod webhook;

pub use logger::LogNotifier;
pub use webhook::WebhookNotifier;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::{format_volume, StatsSummary};

/// Title of the run-completion notification.
pub const RUN_COMPLETE_TITLE: &str = "【QB跳校助手】任务完成";

const RULE: &str = "━━━━━━━━━━━━━━";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Endpoint returned status {0}")]
    Status(u16),
}

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Plugin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub text: String,
}

/// Sink for user-facing notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Build the run-completion notification from the current summary.
pub fn summary_notification(summary: &StatsSummary, executed_at: NaiveDateTime) -> Notification {
    let text = format!(
        "{rule}\n\n\
         📊 今日跳校数量：{today_count}\n\
         📦 今日跳校体积：{today_volume}\n\
         📈 历史跳校数量：{total_count}\n\
         📦 历史跳校体积：{total_volume}\n\n\
         {rule}\n\
         ⏰ 执行时间：{time}",
        rule = RULE,
        today_count = summary.today_count,
        today_volume = format_volume(summary.today_volume),
        total_count = summary.total_count,
        total_volume = format_volume(summary.total_volume),
        time = executed_at.format("%Y-%m-%d %H:%M:%S"),
    );

    Notification {
        kind: NotificationKind::Plugin,
        title: RUN_COMPLETE_TITLE.to_string(),
        text,
    }
}
