use std::time::Duration;

use async_nats::jetstream::{
    self,
    consumer::{self, PullConsumer},
    stream::{self, RetentionPolicy, StorageType},
};
use tokio::sync::RwLock;
use tokio_retry::{strategy::FixedInterval, Retry};

use super::{
    errors::BrokerError, CONSUMER_DURABLE_NAME, TRANSACTIONS_STREAM, TRANSACTIONS_SUBJECT,
};

const ACK_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
    pub max_retries: usize,
    pub retry_delay: Duration,
}

impl BrokerConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_retries: 5,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Handle to the message broker. Starts unavailable when the bounded
/// connect loop fails; `ensure` upgrades it once the broker is reachable
/// again, without a process restart.
pub struct Broker {
    config: BrokerConfig,
    context: RwLock<Option<jetstream::Context>>,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            context: RwLock::new(None),
        }
    }

    /// Connects with a bounded number of fixed-delay attempts, then fails
    /// fast.
    pub async fn connect(&self) -> Result<(), BrokerError> {
        let attempts = self.config.max_retries.saturating_sub(1);
        let retry = FixedInterval::new(self.config.retry_delay).take(attempts);

        let context = Retry::spawn(retry, || self.connect_once()).await?;
        *self.context.write().await = Some(context);

        Ok(())
    }

    /// Returns the live context, attempting a single reconnect when the
    /// handle is empty.
    pub async fn ensure(&self) -> Result<jetstream::Context, BrokerError> {
        if let Some(context) = self.context.read().await.as_ref() {
            return Ok(context.clone());
        }

        let mut guard = self.context.write().await;
        if let Some(context) = guard.as_ref() {
            return Ok(context.clone());
        }

        match self.connect_once().await {
            Ok(context) => {
                tracing::info!("broker connection established");
                *guard = Some(context.clone());
                Ok(context)
            }
            Err(e) => Err(BrokerError::Unavailable(e.to_string())),
        }
    }

    pub async fn is_available(&self) -> bool {
        self.context.read().await.is_some()
    }

    async fn connect_once(&self) -> Result<jetstream::Context, BrokerError> {
        let client = async_nats::connect(self.config.url.as_str())
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        let context = jetstream::new(client);
        declare_transactions_stream(&context).await?;

        Ok(context)
    }

    /// Durable pull consumer over the transactions stream. Declaration is
    /// idempotent.
    pub async fn pull_consumer(&self) -> Result<PullConsumer, BrokerError> {
        let context = self.ensure().await?;

        let stream = context
            .get_stream(TRANSACTIONS_STREAM)
            .await
            .map_err(|e| BrokerError::Consume(e.to_string()))?;

        let consumer = stream
            .get_or_create_consumer(
                CONSUMER_DURABLE_NAME,
                consumer::pull::Config {
                    durable_name: Some(CONSUMER_DURABLE_NAME.to_string()),
                    ack_policy: consumer::AckPolicy::Explicit,
                    ack_wait: ACK_WAIT,
                    filter_subject: TRANSACTIONS_SUBJECT.to_string(),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| BrokerError::Consume(e.to_string()))?;

        Ok(consumer)
    }
}

/// File-backed stream: messages survive a broker restart. Safe to repeat
/// with identical parameters.
async fn declare_transactions_stream(
    context: &jetstream::Context,
) -> Result<(), BrokerError> {
    context
        .get_or_create_stream(stream::Config {
            name: TRANSACTIONS_STREAM.to_string(),
            subjects: vec![TRANSACTIONS_SUBJECT.to_string()],
            retention: RetentionPolicy::WorkQueue,
            storage: StorageType::File,
            ..Default::default()
        })
        .await
        .map_err(|e| BrokerError::Connect(e.to_string()))?;

    Ok(())
}
