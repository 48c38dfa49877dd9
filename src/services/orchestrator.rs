//! Transaction orchestrator: drives each purchase through
//! `PENDING -> PAID | FAILED` on payment and `PAID -> DISBURSED` on disbursement.

use bigdecimal::BigDecimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{BundleKind, Transaction, TransactionStatus};
use crate::error::{AppError, FailureCause};
use crate::gateway::{Outcome, ProviderGateway};
use crate::ports::TransactionRepository;
use crate::services::disbursement_lock::DisbursementLocks;
use crate::validation::{self, PaymentRequest};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub transaction_id: Uuid,
    pub status: TransactionStatus,
    pub bundle_kind: BundleKind,
    pub amount: BigDecimal,
    pub provider_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisbursementReceipt {
    pub transaction_id: Uuid,
    pub status: TransactionStatus,
    pub provider_reference: Option<String>,
}

pub struct TransactionOrchestrator {
    repository: Arc<dyn TransactionRepository>,
    gateway: ProviderGateway,
    locks: DisbursementLocks,
}

impl TransactionOrchestrator {
    pub fn new(repository: Arc<dyn TransactionRepository>, gateway: ProviderGateway) -> Self {
        Self {
            repository,
            gateway,
            locks: DisbursementLocks::new(),
        }
    }

    pub fn gateway(&self) -> &ProviderGateway {
        &self.gateway
    }

    /// Validates the request, records it as PENDING, charges the payer and records the
    /// outcome before returning.
    ///
    /// A decline or transport failure still leaves a FAILED row; its id travels in the error.
    pub async fn submit_payment(&self, request: PaymentRequest) -> Result<PaymentReceipt, AppError> {
        let new_tx = validation::validate_payment_request(&request)?;

        // The row must exist before the provider is contacted.
        let tx = self.repository.insert(&new_tx).await?;
        info!(
            transaction_id = %tx.id,
            bundle_kind = %new_tx.bundle_kind,
            amount = %tx.amount,
            "Transaction created, charging payer"
        );

        match self.gateway.charge(&tx.payer_address, &tx.amount).await {
            Ok(outcome) if outcome.success => {
                let paid = self
                    .record_charge(&tx, TransactionStatus::Paid, &outcome)
                    .await?;
                info!(
                    transaction_id = %paid.id,
                    provider_reference = outcome.provider_reference.as_deref().unwrap_or(""),
                    "Payment accepted"
                );

                Ok(PaymentReceipt {
                    transaction_id: paid.id,
                    status: paid.status,
                    bundle_kind: new_tx.bundle_kind,
                    amount: paid.amount,
                    provider_reference: outcome.provider_reference,
                })
            }
            Ok(outcome) => {
                self.record_charge(&tx, TransactionStatus::Failed, &outcome)
                    .await?;
                warn!(transaction_id = %tx.id, reason = outcome.detail(), "Payment declined");

                Err(AppError::PaymentDeclined {
                    transaction_id: tx.id,
                    reason: outcome.detail().to_string(),
                })
            }
            Err(e) => {
                self.record_charge(&tx, TransactionStatus::Failed, &Outcome::declined(e.to_string()))
                    .await?;
                error!(transaction_id = %tx.id, error = %e, "Payment provider unavailable");

                Err(AppError::ProviderUnavailable {
                    transaction_id: tx.id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Credits the bundle for a PAID transaction and moves it to DISBURSED.
    ///
    /// Attempts for the same id are serialized and the final write is conditional on the row
    /// still being PAID, so the credit capability runs at most once per transaction.
    /// A failed credit leaves the row at PAID.
    pub async fn disburse(&self, transaction_id: Uuid) -> Result<DisbursementReceipt, AppError> {
        let _guard = self.locks.acquire(transaction_id).await;

        let tx = self.repository.get_by_id(transaction_id).await?;
        if tx.status != TransactionStatus::Paid {
            warn!(
                transaction_id = %tx.id,
                status = %tx.status,
                "Disbursement rejected, transaction is not PAID"
            );
            return Err(AppError::InvalidState {
                transaction_id: tx.id,
                current_status: tx.status,
            });
        }

        info!(transaction_id = %tx.id, "Crediting recipient");

        let outcome = match self.gateway.credit(&tx.recipient_address, &tx.amount).await {
            Ok(outcome) if outcome.success => outcome,
            Ok(outcome) => {
                warn!(transaction_id = %tx.id, reason = outcome.detail(), "Disbursement declined");
                return Err(AppError::DisbursementFailed {
                    transaction_id: tx.id,
                    cause: FailureCause::Declined,
                    reason: outcome.detail().to_string(),
                });
            }
            Err(e) => {
                error!(transaction_id = %tx.id, error = %e, "Disbursement provider unavailable");
                return Err(AppError::DisbursementFailed {
                    transaction_id: tx.id,
                    cause: FailureCause::ProviderUnavailable,
                    reason: e.to_string(),
                });
            }
        };

        let disbursed = self
            .repository
            .update_status(tx.id, TransactionStatus::Paid, TransactionStatus::Disbursed)
            .await
            .map_err(|e| {
                error!(
                    transaction_id = %tx.id,
                    provider_reference = outcome.provider_reference.as_deref().unwrap_or(""),
                    error = %e,
                    "Bundle credited but DISBURSED could not be recorded, reconcile manually"
                );
                AppError::from(e)
            })?;

        info!(
            transaction_id = %disbursed.id,
            provider_reference = outcome.provider_reference.as_deref().unwrap_or(""),
            "Bundle disbursed"
        );

        Ok(DisbursementReceipt {
            transaction_id: disbursed.id,
            status: disbursed.status,
            provider_reference: outcome.provider_reference,
        })
    }

    /// Newest first, read straight from the store.
    pub async fn list_transactions(
        &self,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repository.list(limit, offset).await?)
    }

    pub async fn get_transaction(&self, transaction_id: Uuid) -> Result<Transaction, AppError> {
        Ok(self.repository.get_by_id(transaction_id).await?)
    }

    /// Records the charge outcome. A store failure here is not compensated: the provider
    /// may already have moved money, so it is logged for reconciliation and surfaced.
    async fn record_charge(
        &self,
        tx: &Transaction,
        next: TransactionStatus,
        outcome: &Outcome,
    ) -> Result<Transaction, AppError> {
        self.repository
            .update_status(tx.id, TransactionStatus::Pending, next)
            .await
            .map_err(|e| {
                error!(
                    transaction_id = %tx.id,
                    intended_status = %next,
                    provider_reference = outcome.provider_reference.as_deref().unwrap_or(""),
                    error = %e,
                    "Charge outcome could not be recorded, reconcile manually"
                );
                AppError::from(e)
            })
    }
}
