use std::sync::Arc;

use crate::app::util::time;

use super::{
    dtos::transaction_request_dto::TransactionRequestDto, errors::TransactionError,
    models::transaction::Transaction, repo::TransactionRepo,
};

const DEFAULT_LIST_LIMIT: i64 = 10;
const MAX_LIST_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct TransactionService {
    repo: Arc<dyn TransactionRepo>,
}

impl TransactionService {
    pub fn new(repo: Arc<dyn TransactionRepo>) -> Self {
        Self { repo }
    }

    /// Registers a transaction exactly once, keyed by transaction_id. The
    /// lookup is a fast path; the store's unique constraint remains
    /// authoritative when two submissions race past it.
    pub async fn create_transaction(
        &self,
        dto: &TransactionRequestDto,
    ) -> Result<Transaction, TransactionError> {
        if let Some(_existing) = self.repo.get_by_transaction_id(&dto.transaction_id).await? {
            return Err(TransactionError::Duplicate);
        }

        let transaction = Transaction::new(dto);
        self.repo.insert(&transaction).await
    }

    pub async fn get_transaction(&self, id: i32) -> Result<Transaction, TransactionError> {
        match self.repo.get_by_id(id).await? {
            Some(transaction) => Ok(transaction),
            None => Err(TransactionError::NotFound),
        }
    }

    pub async fn get_transaction_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Transaction, TransactionError> {
        match self.repo.get_by_transaction_id(transaction_id).await? {
            Some(transaction) => Ok(transaction),
            None => Err(TransactionError::NotFound),
        }
    }

    pub async fn get_transactions_by_company(
        &self,
        external_company_id: &str,
    ) -> Result<Vec<Transaction>, TransactionError> {
        self.repo
            .get_by_external_company_id(external_company_id)
            .await
    }

    pub async fn list_transactions(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, TransactionError> {
        let mut limit = limit;
        if limit <= 0 {
            limit = DEFAULT_LIST_LIMIT;
        }
        if limit > MAX_LIST_LIMIT {
            limit = MAX_LIST_LIMIT;
        }

        let mut offset = offset;
        if offset < 0 {
            offset = 0;
        }

        self.repo.list(limit, offset).await
    }

    /// Replaces the mutable fields. Uniqueness is re-checked only when the
    /// transaction_id itself changes.
    pub async fn update_transaction(
        &self,
        id: i32,
        dto: &TransactionRequestDto,
    ) -> Result<Transaction, TransactionError> {
        let mut existing = self.get_transaction(id).await?;

        if existing.transaction_id != dto.transaction_id {
            if self
                .repo
                .get_by_transaction_id(&dto.transaction_id)
                .await?
                .is_some()
            {
                return Err(TransactionError::Duplicate);
            }
        }

        existing.transaction_id = dto.transaction_id.to_string();
        existing.value = dto.value;
        existing.r#type = dto.r#type.to_string();
        existing.external_company_id = dto.external_company_id.to_string();
        existing.description = dto.description.to_owned();
        existing.updated_at = time::current_time_in_secs() as i64;

        self.repo.update(&existing).await
    }

    pub async fn delete_transaction(&self, id: i32) -> Result<(), TransactionError> {
        self.get_transaction(id).await?;
        self.repo.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::transactions::repo::test_support::InMemoryTransactionRepo;

    fn request(transaction_id: &str) -> TransactionRequestDto {
        TransactionRequestDto {
            transaction_id: transaction_id.to_string(),
            value: Money::new(10.00),
            r#type: "in".to_string(),
            external_company_id: "C1".to_string(),
            description: None,
        }
    }

    fn service() -> (TransactionService, Arc<InMemoryTransactionRepo>) {
        let repo = Arc::new(InMemoryTransactionRepo::new());
        (TransactionService::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn create_persists_and_backfills_the_id() {
        let (service, repo) = service();

        let created = service.create_transaction(&request("T1")).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.transaction_id, "T1");
        assert_eq!(created.value.cents(), 1000);
        assert_eq!(repo.row_count(), 1);
    }

    #[tokio::test]
    async fn create_twice_with_the_same_transaction_id_keeps_one_row() {
        let (service, repo) = service();

        service.create_transaction(&request("T1")).await.unwrap();
        let second = service.create_transaction(&request("T1")).await;

        assert!(matches!(second, Err(TransactionError::Duplicate)));
        assert_eq!(repo.row_count(), 1);
    }

    #[tokio::test]
    async fn get_by_unknown_id_is_not_found() {
        let (service, _repo) = service();

        let result = service.get_transaction(42).await;
        assert!(matches!(result, Err(TransactionError::NotFound)));

        let result = service.get_transaction_by_transaction_id("missing").await;
        assert!(matches!(result, Err(TransactionError::NotFound)));
    }

    #[tokio::test]
    async fn list_clamps_limit_and_offset() {
        let (service, _repo) = service();

        for i in 0..15 {
            service
                .create_transaction(&request(&format!("T{}", i)))
                .await
                .unwrap();
        }

        let page = service.list_transactions(0, -5).await.unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(page[0].transaction_id, "T0");

        let page = service.list_transactions(500, 0).await.unwrap();
        assert_eq!(page.len(), 15);

        let page = service.list_transactions(5, 10).await.unwrap();
        assert_eq!(page.len(), 5);
    }

    #[tokio::test]
    async fn update_rechecks_uniqueness_only_when_the_id_changes() {
        let (service, _repo) = service();

        let first = service.create_transaction(&request("T1")).await.unwrap();
        service.create_transaction(&request("T2")).await.unwrap();

        // same transaction_id, new fields
        let mut dto = request("T1");
        dto.value = Money::new(25.50);
        let updated = service.update_transaction(first.id, &dto).await.unwrap();
        assert_eq!(updated.value.cents(), 2550);

        // changing to an already-taken transaction_id fails
        let stolen = request("T2");
        let result = service.update_transaction(first.id, &stolen).await;
        assert!(matches!(result, Err(TransactionError::Duplicate)));

        // changing to a fresh transaction_id succeeds
        let fresh = request("T3");
        let updated = service.update_transaction(first.id, &fresh).await.unwrap();
        assert_eq!(updated.transaction_id, "T3");
    }

    #[tokio::test]
    async fn delete_requires_existence() {
        let (service, repo) = service();

        let created = service.create_transaction(&request("T1")).await.unwrap();

        let result = service.delete_transaction(999).await;
        assert!(matches!(result, Err(TransactionError::NotFound)));
        assert_eq!(repo.row_count(), 1);

        service.delete_transaction(created.id).await.unwrap();
        assert_eq!(repo.row_count(), 0);
    }

    #[tokio::test]
    async fn storage_faults_propagate_opaquely() {
        let (service, repo) = service();
        repo.set_fail_storage(true);

        let result = service.create_transaction(&request("T1")).await;
        assert!(matches!(result, Err(TransactionError::Storage(_))));
    }
}
