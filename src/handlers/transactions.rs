use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{BundleKind, Transaction, TransactionStatus};
use crate::error::AppError;
use crate::validation::{PaymentRequest, ValidationError};
use crate::AppState;

pub const MAX_PAGE_SIZE: i64 = 500;

/// Prices arrive either quoted (`"0.20"`) or as JSON numbers (`0.2`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    fn into_string(self) -> String {
        match self {
            AmountInput::Text(s) => s,
            AmountInput::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPayload {
    #[serde(alias = "userPhone")]
    pub payer_address: String,
    #[serde(alias = "recipientPhone")]
    pub recipient_address: String,
    pub amount: AmountInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisbursePayload {
    pub transaction_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: Uuid,
    pub payer_address: String,
    pub recipient_address: String,
    pub amount: BigDecimal,
    pub bundle_kind: Option<BundleKind>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionView {
    fn from(tx: Transaction) -> Self {
        Self {
            bundle_kind: tx.bundle_kind(),
            amount: tx.amount.with_scale(2),
            id: tx.id,
            payer_address: tx.payer_address,
            recipient_address: tx.recipient_address,
            status: tx.status,
            created_at: tx.created_at,
            updated_at: tx.updated_at,
        }
    }
}

fn malformed(field: &'static str, detail: String) -> AppError {
    AppError::Validation(ValidationError::new(field, detail))
}

pub async fn pay(
    State(state): State<AppState>,
    payload: Result<Json<PayPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|e| malformed("body", e.body_text()))?;

    let receipt = state
        .orchestrator
        .submit_payment(PaymentRequest {
            payer_address: payload.payer_address,
            recipient_address: payload.recipient_address,
            amount: payload.amount.into_string(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn disburse(
    State(state): State<AppState>,
    payload: Result<Json<DisbursePayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|e| malformed("body", e.body_text()))?;

    let receipt = state.orchestrator.disburse(payload.transaction_id).await?;

    Ok(Json(receipt))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    pagination: Result<Query<Pagination>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(pagination) = pagination.map_err(|e| malformed("query", e.body_text()))?;

    if let Some(limit) = pagination.limit {
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(malformed(
                "limit",
                format!("must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }
    }
    let offset = pagination.offset.unwrap_or(0);
    if offset < 0 {
        return Err(malformed("offset", "must not be negative".to_string()));
    }

    let transactions = state
        .orchestrator
        .list_transactions(pagination.limit, offset)
        .await?;

    Ok(Json(
        transactions
            .into_iter()
            .map(TransactionView::from)
            .collect::<Vec<_>>(),
    ))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id.map_err(|e| malformed("id", e.body_text()))?;

    let tx = state.orchestrator.get_transaction(id).await?;

    Ok(Json(TransactionView::from(tx)))
}
