//! Store boundary of the orchestrator.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{NewTransaction, Transaction, TransactionStatus};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("transaction {0} not found")]
    NotFound(Uuid),

    /// The conditional update lost: the row was not in the expected status at write time.
    #[error("transaction {id} is {current}, expected {expected}")]
    StatusConflict {
        id: Uuid,
        expected: TransactionStatus,
        current: TransactionStatus,
    },

    /// `from -> to` is not an edge of the lifecycle graph.
    #[error("transaction {id} cannot move from {from} to {to}")]
    IllegalTransition {
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::Database(err.to_string())
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Durable record of every transaction and its lifecycle state.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Persists a new PENDING transaction. The store assigns the id and timestamps.
    async fn insert(&self, new_tx: &NewTransaction) -> RepositoryResult<Transaction>;

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transaction>;

    /// Compare-and-set on the status column: moves `id` from `expected` to `next` and
    /// refreshes `updated_at`, or fails with `StatusConflict` carrying the stored status.
    /// Pairs that are not lifecycle edges fail with `IllegalTransition` without touching the row.
    async fn update_status(
        &self,
        id: Uuid,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> RepositoryResult<Transaction>;

    /// Newest first. `limit = None` returns everything after `offset`.
    async fn list(&self, limit: Option<i64>, offset: i64) -> RepositoryResult<Vec<Transaction>>;

    async fn ping(&self) -> RepositoryResult<()>;
}
