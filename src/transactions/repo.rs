use async_trait::async_trait;
use sqlx::PgPool;

use super::{errors::TransactionError, models::transaction::Transaction};

/// Persistence seam for transactions. Lookup misses are `Ok(None)` or empty
/// vectors; faults surface as `TransactionError`.
#[async_trait]
pub trait TransactionRepo: Send + Sync {
    async fn insert(&self, transaction: &Transaction) -> Result<Transaction, TransactionError>;
    async fn get_by_id(&self, id: i32) -> Result<Option<Transaction>, TransactionError>;
    async fn get_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, TransactionError>;
    async fn get_by_external_company_id(
        &self,
        external_company_id: &str,
    ) -> Result<Vec<Transaction>, TransactionError>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Transaction>, TransactionError>;
    async fn update(&self, transaction: &Transaction) -> Result<Transaction, TransactionError>;
    async fn delete(&self, id: i32) -> Result<(), TransactionError>;
}

pub struct PgTransactionRepo {
    pool: PgPool,
}

impl PgTransactionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepo for PgTransactionRepo {
    async fn insert(&self, transaction: &Transaction) -> Result<Transaction, TransactionError> {
        let inserted = sqlx::query_as::<_, Transaction>(
            "
            INSERT INTO transactions (
                transaction_id, value, type, external_company_id, description, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            ",
        )
        .bind(&transaction.transaction_id)
        .bind(transaction.value)
        .bind(&transaction.r#type)
        .bind(&transaction.external_company_id)
        .bind(&transaction.description)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Transaction>, TransactionError> {
        let transaction = sqlx::query_as::<_, Transaction>(
            "
            SELECT * FROM transactions
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn get_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, TransactionError> {
        let transaction = sqlx::query_as::<_, Transaction>(
            "
            SELECT * FROM transactions
            WHERE transaction_id = $1
            ",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn get_by_external_company_id(
        &self,
        external_company_id: &str,
    ) -> Result<Vec<Transaction>, TransactionError> {
        let transactions = sqlx::query_as::<_, Transaction>(
            "
            SELECT * FROM transactions
            WHERE external_company_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(external_company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Transaction>, TransactionError> {
        let transactions = sqlx::query_as::<_, Transaction>(
            "
            SELECT * FROM transactions
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    async fn update(&self, transaction: &Transaction) -> Result<Transaction, TransactionError> {
        let updated = sqlx::query_as::<_, Transaction>(
            "
            UPDATE transactions
            SET transaction_id = $2,
                value = $3,
                type = $4,
                external_company_id = $5,
                description = $6,
                updated_at = $7
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(transaction.id)
        .bind(&transaction.transaction_id)
        .bind(transaction.value)
        .bind(&transaction.r#type)
        .bind(&transaction.external_company_id)
        .bind(&transaction.description)
        .bind(transaction.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete(&self, id: i32) -> Result<(), TransactionError> {
        sqlx::query(
            "
            DELETE FROM transactions
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
pub mod test_support {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// In-memory store for service and consumer tests. Enforces the
    /// transaction_id unique constraint the way the database does.
    pub struct InMemoryTransactionRepo {
        rows: Mutex<Vec<Transaction>>,
        next_id: Mutex<i32>,
        fail_storage: AtomicBool,
    }

    impl InMemoryTransactionRepo {
        pub fn new() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                next_id: Mutex::new(1),
                fail_storage: AtomicBool::new(false),
            }
        }

        pub fn row_count(&self) -> usize {
            self.rows.lock().unwrap().len()
        }

        pub fn set_fail_storage(&self, fail: bool) {
            self.fail_storage.store(fail, Ordering::Relaxed);
        }

        fn check_storage(&self) -> Result<(), TransactionError> {
            match self.fail_storage.load(Ordering::Relaxed) {
                true => Err(TransactionError::Storage("storage offline".to_string())),
                false => Ok(()),
            }
        }
    }

    #[async_trait]
    impl TransactionRepo for InMemoryTransactionRepo {
        async fn insert(
            &self,
            transaction: &Transaction,
        ) -> Result<Transaction, TransactionError> {
            self.check_storage()?;

            let mut rows = self.rows.lock().unwrap();
            if rows
                .iter()
                .any(|row| row.transaction_id == transaction.transaction_id)
            {
                return Err(TransactionError::Duplicate);
            }

            let mut next_id = self.next_id.lock().unwrap();
            let mut inserted = transaction.clone();
            inserted.id = *next_id;
            *next_id += 1;

            rows.push(inserted.clone());
            Ok(inserted)
        }

        async fn get_by_id(&self, id: i32) -> Result<Option<Transaction>, TransactionError> {
            self.check_storage()?;

            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().find(|row| row.id == id).cloned())
        }

        async fn get_by_transaction_id(
            &self,
            transaction_id: &str,
        ) -> Result<Option<Transaction>, TransactionError> {
            self.check_storage()?;

            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .find(|row| row.transaction_id == transaction_id)
                .cloned())
        }

        async fn get_by_external_company_id(
            &self,
            external_company_id: &str,
        ) -> Result<Vec<Transaction>, TransactionError> {
            self.check_storage()?;

            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|row| row.external_company_id == external_company_id)
                .cloned()
                .collect())
        }

        async fn list(
            &self,
            limit: i64,
            offset: i64,
        ) -> Result<Vec<Transaction>, TransactionError> {
            self.check_storage()?;

            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn update(
            &self,
            transaction: &Transaction,
        ) -> Result<Transaction, TransactionError> {
            self.check_storage()?;

            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|row| {
                row.transaction_id == transaction.transaction_id && row.id != transaction.id
            }) {
                return Err(TransactionError::Duplicate);
            }

            match rows.iter_mut().find(|row| row.id == transaction.id) {
                Some(row) => {
                    *row = transaction.clone();
                    Ok(transaction.clone())
                }
                None => Err(TransactionError::NotFound),
            }
        }

        async fn delete(&self, id: i32) -> Result<(), TransactionError> {
            self.check_storage()?;

            let mut rows = self.rows.lock().unwrap();
            rows.retain(|row| row.id != id);
            Ok(())
        }
    }
}
