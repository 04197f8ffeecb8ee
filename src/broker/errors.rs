use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    #[error("connect error: {0}")]
    Connect(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    #[error("consume error: {0}")]
    Consume(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
