use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Trait for JSON key-value persistence.
pub trait KvStore: Send + Sync {
    /// Load the value stored under `key`, `None` when absent.
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &Value) -> Result<(), StoreError>;
}
