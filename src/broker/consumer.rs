use std::sync::Arc;
use std::time::Duration;

use async_nats::jetstream::AckKind;
use futures::StreamExt;
use tokio::sync::watch;

use crate::transactions::{
    dtos::transaction_request_dto::TransactionRequestDto, errors::TransactionError,
    service::TransactionService,
};

use super::{client::Broker, metrics::MetricsSink};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// What the consumer tells the broker about a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Acknowledge,
    RequeueForRetry,
    DropPermanently,
}

/// Acknowledgement policy per error kind. An already-registered
/// transaction_id is an idempotent no-op, not a retry; only storage faults
/// are worth a redelivery.
pub fn outcome_for(error: &TransactionError) -> DeliveryOutcome {
    match error {
        TransactionError::Duplicate => DeliveryOutcome::Acknowledge,
        TransactionError::NotFound => DeliveryOutcome::DropPermanently,
        TransactionError::Storage(_) => DeliveryOutcome::RequeueForRetry,
    }
}

pub struct TransactionConsumer {
    service: TransactionService,
    metrics: Arc<dyn MetricsSink>,
}

impl TransactionConsumer {
    pub fn new(service: TransactionService, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { service, metrics }
    }

    /// Receive loop. Deliveries are handled one at a time with manual
    /// acknowledgement; runs until the shutdown channel flips.
    pub async fn run(&self, broker: Arc<Broker>, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let consumer = match broker.pull_consumer().await {
                Ok(consumer) => consumer,
                Err(e) => {
                    tracing::error!(%e, "consumer cannot reach the broker, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(RECONNECT_DELAY) => continue,
                        _ = shutdown.changed() => break,
                    }
                }
            };

            let mut messages = match consumer.messages().await {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::error!(%e, "failed to open the delivery stream, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(RECONNECT_DELAY) => continue,
                        _ = shutdown.changed() => break,
                    }
                }
            };

            println!("consumer started for subject: {}", super::TRANSACTIONS_SUBJECT);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => return,
                    next = messages.next() => {
                        match next {
                            Some(Ok(message)) => {
                                let outcome = self.handle_delivery(&message.payload).await;

                                let result = match outcome {
                                    DeliveryOutcome::Acknowledge => message.ack().await,
                                    DeliveryOutcome::DropPermanently => {
                                        message.ack_with(AckKind::Term).await
                                    }
                                    DeliveryOutcome::RequeueForRetry => {
                                        message.ack_with(AckKind::Nak(None)).await
                                    }
                                };

                                if let Err(e) = result {
                                    tracing::error!(%e, "failed to acknowledge delivery");
                                }
                            }
                            Some(Err(e)) => {
                                tracing::error!(%e, "delivery stream error");
                                break;
                            }
                            None => {
                                tracing::error!("delivery stream closed");
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Maps one delivery to its outcome. Validation failures are terminal
    /// and never requeued.
    pub async fn handle_delivery(&self, body: &[u8]) -> DeliveryOutcome {
        self.metrics.record_attempt();

        let dto = match serde_json::from_slice::<TransactionRequestDto>(body) {
            Ok(dto) => dto,
            Err(e) => {
                tracing::error!(%e, "failed to decode transaction message");
                self.metrics.record_error(
                    format!("failed to decode message: {}", e),
                    Some(String::from_utf8_lossy(body).to_string()),
                );
                return DeliveryOutcome::DropPermanently;
            }
        };

        if dto.transaction_id.is_empty() {
            tracing::error!("invalid transaction: missing transaction_id");
            self.metrics.record_error(
                "invalid transaction: missing transaction_id".to_string(),
                Some(String::from_utf8_lossy(body).to_string()),
            );
            return DeliveryOutcome::DropPermanently;
        }

        if !dto.value.is_positive() {
            tracing::error!(
                transaction_id = %dto.transaction_id,
                "invalid transaction: value must be greater than zero"
            );
            self.metrics.record_error(
                "invalid transaction: value must be greater than zero".to_string(),
                Some(dto.transaction_id.clone()),
            );
            return DeliveryOutcome::DropPermanently;
        }

        match self.service.create_transaction(&dto).await {
            Ok(transaction) => {
                self.metrics.record_success();
                tracing::info!(
                    transaction_id = %transaction.transaction_id,
                    id = transaction.id,
                    value = %transaction.value,
                    r#type = %transaction.r#type,
                    "transaction registered"
                );
                DeliveryOutcome::Acknowledge
            }
            Err(e) => {
                let outcome = outcome_for(&e);

                if let TransactionError::Duplicate = e {
                    self.metrics.record_success();
                    tracing::info!(
                        transaction_id = %dto.transaction_id,
                        "transaction already registered, dropping redelivery"
                    );
                } else {
                    self.metrics
                        .record_error(e.to_string(), Some(dto.transaction_id.clone()));
                    tracing::error!(
                        %e,
                        transaction_id = %dto.transaction_id,
                        "failed to register transaction"
                    );
                }

                outcome
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::metrics::InMemoryMetrics;
    use crate::transactions::repo::{test_support::InMemoryTransactionRepo, TransactionRepo};

    fn consumer() -> (
        TransactionConsumer,
        Arc<InMemoryTransactionRepo>,
        Arc<InMemoryMetrics>,
    ) {
        let repo = Arc::new(InMemoryTransactionRepo::new());
        let metrics = Arc::new(InMemoryMetrics::new());
        let service = TransactionService::new(repo.clone());

        (
            TransactionConsumer::new(service, metrics.clone()),
            repo,
            metrics,
        )
    }

    const MESSAGE: &[u8] = br#"{
        "transaction_id": "T1",
        "value": 10.00,
        "type": "in",
        "external_company_id": "C1"
    }"#;

    #[test]
    fn outcome_table_matches_the_acknowledgement_policy() {
        assert_eq!(
            outcome_for(&TransactionError::Duplicate),
            DeliveryOutcome::Acknowledge
        );
        assert_eq!(
            outcome_for(&TransactionError::NotFound),
            DeliveryOutcome::DropPermanently
        );
        assert_eq!(
            outcome_for(&TransactionError::Storage("down".to_string())),
            DeliveryOutcome::RequeueForRetry
        );
    }

    #[tokio::test]
    async fn a_valid_message_is_stored_and_acknowledged() {
        let (consumer, repo, metrics) = consumer();

        let outcome = consumer.handle_delivery(MESSAGE).await;

        assert_eq!(outcome, DeliveryOutcome::Acknowledge);
        assert_eq!(repo.row_count(), 1);

        let stored = repo.get_by_transaction_id("T1").await.unwrap().unwrap();
        assert_eq!(stored.value.cents(), 1000);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_processed, 1);
        assert_eq!(snapshot.success_count, 1);
        assert_eq!(snapshot.error_count, 0);
    }

    #[tokio::test]
    async fn a_redelivery_of_a_committed_message_is_a_no_op() {
        let (consumer, repo, _metrics) = consumer();

        assert_eq!(
            consumer.handle_delivery(MESSAGE).await,
            DeliveryOutcome::Acknowledge
        );
        assert_eq!(
            consumer.handle_delivery(MESSAGE).await,
            DeliveryOutcome::Acknowledge
        );
        assert_eq!(repo.row_count(), 1);
    }

    #[tokio::test]
    async fn a_malformed_payload_is_dropped_permanently() {
        let (consumer, repo, metrics) = consumer();

        let outcome = consumer.handle_delivery(b"not json").await;

        assert_eq!(outcome, DeliveryOutcome::DropPermanently);
        assert_eq!(repo.row_count(), 0);
        assert_eq!(metrics.snapshot().error_count, 1);
    }

    #[tokio::test]
    async fn a_missing_transaction_id_is_dropped_permanently() {
        let (consumer, repo, _metrics) = consumer();

        let body = br#"{
            "transaction_id": "",
            "value": "10.00",
            "type": "in",
            "external_company_id": "C1"
        }"#;

        assert_eq!(
            consumer.handle_delivery(body).await,
            DeliveryOutcome::DropPermanently
        );
        assert_eq!(repo.row_count(), 0);
    }

    #[tokio::test]
    async fn a_non_positive_value_is_dropped_permanently() {
        let (consumer, repo, _metrics) = consumer();

        let body = br#"{
            "transaction_id": "T1",
            "value": "0.00",
            "type": "in",
            "external_company_id": "C1"
        }"#;

        assert_eq!(
            consumer.handle_delivery(body).await,
            DeliveryOutcome::DropPermanently
        );

        let body = br#"{
            "transaction_id": "T1",
            "value": "-5.00",
            "type": "in",
            "external_company_id": "C1"
        }"#;

        assert_eq!(
            consumer.handle_delivery(body).await,
            DeliveryOutcome::DropPermanently
        );
        assert_eq!(repo.row_count(), 0);
    }

    #[tokio::test]
    async fn a_storage_fault_is_requeued_for_retry() {
        let (consumer, repo, metrics) = consumer();
        repo.set_fail_storage(true);

        let outcome = consumer.handle_delivery(MESSAGE).await;

        assert_eq!(outcome, DeliveryOutcome::RequeueForRetry);
        assert_eq!(metrics.snapshot().error_count, 1);

        // once storage recovers the redelivery lands
        repo.set_fail_storage(false);
        assert_eq!(
            consumer.handle_delivery(MESSAGE).await,
            DeliveryOutcome::Acknowledge
        );
        assert_eq!(repo.row_count(), 1);
    }
}
