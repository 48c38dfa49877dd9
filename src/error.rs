use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::TransactionStatus;
use crate::ports::RepositoryError;
use crate::validation::ValidationError;

/// Why a disbursement did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCause {
    /// The provider answered and refused.
    Declined,
    /// The provider could not be reached or answered garbage.
    ProviderUnavailable,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Payment declined: {reason}")]
    PaymentDeclined { transaction_id: Uuid, reason: String },

    #[error("Payment provider unavailable: {reason}")]
    ProviderUnavailable { transaction_id: Uuid, reason: String },

    #[error("Transaction {transaction_id} is {current_status}, expected PAID")]
    InvalidState {
        transaction_id: Uuid,
        current_status: TransactionStatus,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Disbursement failed: {reason}")]
    DisbursementFailed {
        transaction_id: Uuid,
        cause: FailureCause,
        reason: String,
    },

    #[error("Store error: {0}")]
    Store(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::PaymentDeclined { .. } => "PaymentDeclined",
            AppError::ProviderUnavailable { .. } => "ProviderUnavailable",
            AppError::InvalidState { .. } => "InvalidState",
            AppError::NotFound(_) => "NotFound",
            AppError::DisbursementFailed { .. } => "DisbursementFailed",
            AppError::Store(_) => "StoreError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PaymentDeclined { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::ProviderUnavailable { .. } => StatusCode::BAD_GATEWAY,
            AppError::InvalidState { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DisbursementFailed { .. } => StatusCode::BAD_GATEWAY,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn transaction_id(&self) -> Option<Uuid> {
        match self {
            AppError::PaymentDeclined { transaction_id, .. }
            | AppError::ProviderUnavailable { transaction_id, .. }
            | AppError::InvalidState { transaction_id, .. }
            | AppError::DisbursementFailed { transaction_id, .. } => Some(*transaction_id),
            _ => None,
        }
    }

    /// Stored status of the transaction the error refers to, when known.
    pub fn current_status(&self) -> Option<TransactionStatus> {
        match self {
            AppError::PaymentDeclined { .. } | AppError::ProviderUnavailable { .. } => {
                Some(TransactionStatus::Failed)
            }
            AppError::InvalidState { current_status, .. } => Some(*current_status),
            AppError::DisbursementFailed { .. } => Some(TransactionStatus::Paid),
            _ => None,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => {
                AppError::NotFound(format!("Transaction {} not found", id))
            }
            RepositoryError::StatusConflict { id, current, .. } => AppError::InvalidState {
                transaction_id: id,
                current_status: current,
            },
            err @ RepositoryError::IllegalTransition { .. } => AppError::Store(err.to_string()),
            RepositoryError::Database(msg) => AppError::Store(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({
            "errorKind": self.kind(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        if let Some(id) = self.transaction_id() {
            body["transactionId"] = json!(id);
        }
        if let Some(current) = self.current_status() {
            body["currentStatus"] = json!(current);
        }
        if let AppError::DisbursementFailed { cause, .. } = &self {
            body["cause"] = json!(cause);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_status_code() {
        let error = AppError::Validation(ValidationError::new("amount", "must be 0.20 or 0.40"));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.kind(), "ValidationError");
    }

    #[test]
    fn test_not_found_error_status_code() {
        let error = AppError::NotFound("Transaction not found".to_string());
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_decline_and_unavailable_are_distinct() {
        let id = Uuid::new_v4();
        let declined = AppError::PaymentDeclined {
            transaction_id: id,
            reason: "insufficient balance".to_string(),
        };
        let unavailable = AppError::ProviderUnavailable {
            transaction_id: id,
            reason: "timeout".to_string(),
        };

        assert_ne!(declined.kind(), unavailable.kind());
        assert_ne!(declined.status_code(), unavailable.status_code());
        assert_eq!(declined.current_status(), Some(TransactionStatus::Failed));
        assert_eq!(unavailable.current_status(), Some(TransactionStatus::Failed));
    }

    #[test]
    fn test_repository_errors_map_to_taxonomy() {
        let id = Uuid::new_v4();
        assert!(matches!(
            AppError::from(RepositoryError::NotFound(id)),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(RepositoryError::StatusConflict {
                id,
                expected: TransactionStatus::Paid,
                current: TransactionStatus::Disbursed,
            }),
            AppError::InvalidState {
                current_status: TransactionStatus::Disbursed,
                ..
            }
        ));
        assert!(matches!(
            AppError::from(RepositoryError::Database("down".to_string())),
            AppError::Store(_)
        ));
    }

    #[tokio::test]
    async fn test_invalid_state_response() {
        let error = AppError::InvalidState {
            transaction_id: Uuid::new_v4(),
            current_status: TransactionStatus::Failed,
        };
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_store_error_response() {
        let error = AppError::Store("connection refused".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
