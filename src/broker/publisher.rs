use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::{client::Broker, errors::BrokerError, TRANSACTIONS_SUBJECT};

pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Publish gateway for the asynchronous path.
pub struct TransactionPublisher {
    broker: Arc<Broker>,
    timeout: Duration,
}

impl TransactionPublisher {
    pub fn new(broker: Arc<Broker>) -> Self {
        Self {
            broker,
            timeout: PUBLISH_TIMEOUT,
        }
    }

    /// Serializes the message and publishes it to the durable stream,
    /// waiting for the broker acknowledgement under the timeout. Success
    /// means "accepted by the broker", not "processed".
    pub async fn publish_json<T: Serialize>(&self, message: &T) -> Result<(), BrokerError> {
        let context = self.broker.ensure().await?;
        let payload = serde_json::to_vec(message)?;

        let publish = async {
            let ack = context
                .publish(TRANSACTIONS_SUBJECT.to_string(), payload.into())
                .await
                .map_err(|e| BrokerError::Publish(e.to_string()))?;

            ack.await
                .map_err(|e| BrokerError::Publish(e.to_string()))?;

            Ok(())
        };

        match tokio::time::timeout(self.timeout, publish).await {
            Ok(result) => result,
            Err(_) => Err(BrokerError::Timeout(self.timeout)),
        }
    }
}
