//! In-memory implementation of TransactionRepository, for tests and local runs.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{NewTransaction, Transaction, TransactionStatus};
use crate::ports::{RepositoryError, RepositoryResult, TransactionRepository};

#[derive(Default)]
struct Inner {
    rows: HashMap<Uuid, (u64, Transaction)>,
    next_seq: u64,
}

/// A thread-safe in-memory transaction store.
///
/// Insertion order is tracked separately so that rows created within the same clock tick
/// still list newest first.
#[derive(Default, Clone)]
pub struct InMemoryTransactionRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn insert(&self, new_tx: &NewTransaction) -> RepositoryResult<Transaction> {
        let now = Utc::now();
        let tx = Transaction {
            id: Uuid::new_v4(),
            payer_address: new_tx.payer_address.clone(),
            recipient_address: new_tx.recipient_address.clone(),
            amount: new_tx.amount(),
            status: TransactionStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.rows.insert(tx.id, (seq, tx.clone()));
        Ok(tx)
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transaction> {
        let inner = self.inner.read().await;
        inner
            .rows
            .get(&id)
            .map(|(_, tx)| tx.clone())
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> RepositoryResult<Transaction> {
        if !expected.can_transition_to(next) {
            return Err(RepositoryError::IllegalTransition {
                id,
                from: expected,
                to: next,
            });
        }

        let mut inner = self.inner.write().await;
        let (_, tx) = inner
            .rows
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;

        if tx.status != expected {
            return Err(RepositoryError::StatusConflict {
                id,
                expected,
                current: tx.status,
            });
        }

        tx.status = next;
        tx.updated_at = Utc::now();
        Ok(tx.clone())
    }

    async fn list(&self, limit: Option<i64>, offset: i64) -> RepositoryResult<Vec<Transaction>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<&(u64, Transaction)> = inner.rows.values().collect();
        rows.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at.cmp(&a.created_at).then(b_seq.cmp(a_seq))
        });

        let offset = usize::try_from(offset.max(0)).unwrap_or(0);
        let limit = limit
            .map(|l| usize::try_from(l.max(0)).unwrap_or(0))
            .unwrap_or(usize::MAX);

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, tx)| tx.clone())
            .collect())
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}
