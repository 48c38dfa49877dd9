//! Transaction domain entity.
//! Framework-agnostic representation of a pay-then-disburse bundle purchase.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle state of a transaction.
///
/// `PENDING -> PAID -> DISBURSED` on the happy path, `PENDING -> FAILED` when the charge
/// does not go through. FAILED and DISBURSED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Paid,
    Failed,
    Disbursed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Paid => "PAID",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Disbursed => "DISBURSED",
        }
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Paid)
                | (TransactionStatus::Pending, TransactionStatus::Failed)
                | (TransactionStatus::Paid, TransactionStatus::Disbursed)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown transaction status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TransactionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TransactionStatus::Pending),
            "PAID" => Ok(TransactionStatus::Paid),
            "FAILED" => Ok(TransactionStatus::Failed),
            "DISBURSED" => Ok(TransactionStatus::Disbursed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Data bundle sold for a given price point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BundleKind {
    /// 0.20 USD, six hours of data.
    Short,
    /// 0.40 USD, twelve hours of data.
    Long,
}

impl BundleKind {
    pub const ALL: [BundleKind; 2] = [BundleKind::Short, BundleKind::Long];

    /// Price of the bundle, scale 2.
    pub fn amount(&self) -> BigDecimal {
        match self {
            BundleKind::Short => BigDecimal::new(20.into(), 2),
            BundleKind::Long => BigDecimal::new(40.into(), 2),
        }
    }

    /// Maps a price to its bundle. Comparison is by value, so `0.2` and `0.20` are the same.
    pub fn from_amount(amount: &BigDecimal) -> Option<BundleKind> {
        Self::ALL.into_iter().find(|kind| &kind.amount() == amount)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BundleKind::Short => "SHORT",
            BundleKind::Long => "LONG",
        }
    }
}

impl fmt::Display for BundleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A validated payment that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub payer_address: String,
    pub recipient_address: String,
    pub bundle_kind: BundleKind,
}

impl NewTransaction {
    pub fn new(payer_address: String, recipient_address: String, bundle_kind: BundleKind) -> Self {
        Self {
            payer_address,
            recipient_address,
            bundle_kind,
        }
    }

    pub fn amount(&self) -> BigDecimal {
        self.bundle_kind.amount()
    }
}

/// Domain entity representing a stored transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub payer_address: String,
    pub recipient_address: String,
    pub amount: BigDecimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Bundle derived from the stored amount. `None` only if the row holds a price
    /// that is no longer on sale.
    pub fn bundle_kind(&self) -> Option<BundleKind> {
        BundleKind::from_amount(&self.amount)
    }
}
