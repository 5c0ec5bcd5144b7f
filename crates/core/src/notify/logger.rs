use async_trait::async_trait;
use tracing::info;

use super::{Notification, Notifier, NotifyError};

/// Writes notifications to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(title = %notification.title, "{}", notification.text);
        Ok(())
    }
}
