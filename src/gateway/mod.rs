//! Provider Gateway: a uniform capability interface over the payment (charge) and
//! disbursement (credit) providers.
//!
//! Each capability returns an [`Outcome`] when the exchange with the provider completed,
//! whether the provider approved or declined, and a [`GatewayError`] when it did not.
//! The orchestrator's state policy depends on that split, so implementations must never
//! fold a transport failure into a decline or vice versa.

pub mod edahab;
pub mod simulated;
pub mod waafi;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use failsafe::{backoff, failure_policy, Config as BreakerConfig, StateMachine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::GatewayConfig;

pub use edahab::EdahabClient;
pub use simulated::{FixedOutcome, OutcomeSource, SimulatedCharge, SimulatedCredit, WeightedRandom};
pub use waafi::WaafiPayClient;

/// Which backing a capability runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    Simulated,
    Live,
}

impl fmt::Display for GatewayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayMode::Simulated => f.write_str("simulated"),
            GatewayMode::Live => f.write_str("live"),
        }
    }
}

impl FromStr for GatewayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "mock" => Ok(GatewayMode::Simulated),
            "live" | "real" => Ok(GatewayMode::Live),
            other => Err(format!(
                "invalid gateway mode '{}', expected 'simulated' or 'live'",
                other
            )),
        }
    }
}

/// Normalized result of a completed provider exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub provider_reference: Option<String>,
    pub error_detail: Option<String>,
}

impl Outcome {
    pub fn approved(provider_reference: impl Into<String>) -> Self {
        Self {
            success: true,
            provider_reference: Some(provider_reference.into()),
            error_detail: None,
        }
    }

    pub fn declined(error_detail: impl Into<String>) -> Self {
        Self {
            success: false,
            provider_reference: None,
            error_detail: Some(error_detail.into()),
        }
    }

    pub fn detail(&self) -> &str {
        self.error_detail.as_deref().unwrap_or("declined by provider")
    }
}

/// The exchange with the provider could not be completed.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("missing provider credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("circuit breaker open: {0}")]
    CircuitOpen(String),
}

#[async_trait]
pub trait ChargeCapability: Send + Sync {
    /// Debits `amount` from the payer's wallet.
    async fn charge(&self, payer_address: &str, amount: &BigDecimal) -> Result<Outcome, GatewayError>;

    fn mode(&self) -> GatewayMode;
}

#[async_trait]
pub trait CreditCapability: Send + Sync {
    /// Credits the data bundle priced at `amount` to the recipient.
    async fn credit(
        &self,
        recipient_address: &str,
        amount: &BigDecimal,
    ) -> Result<Outcome, GatewayError>;

    fn mode(&self) -> GatewayMode;
}

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Both capabilities behind one handle, each call bounded by `call_timeout`.
#[derive(Clone)]
pub struct ProviderGateway {
    charge: Arc<dyn ChargeCapability>,
    credit: Arc<dyn CreditCapability>,
    call_timeout: Duration,
}

impl ProviderGateway {
    pub fn new(charge: Arc<dyn ChargeCapability>, credit: Arc<dyn CreditCapability>) -> Self {
        Self {
            charge,
            credit,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Builds each capability from its configured mode.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let charge: Arc<dyn ChargeCapability> = match config.charge_mode {
            GatewayMode::Simulated => Arc::new(SimulatedCharge::weighted(config.simulated_charge_delay)),
            GatewayMode::Live => Arc::new(WaafiPayClient::new(
                config.waafi.clone(),
                config.provider_timeout,
            )),
        };

        let credit: Arc<dyn CreditCapability> = match config.credit_mode {
            GatewayMode::Simulated => Arc::new(SimulatedCredit::new(
                Arc::new(FixedOutcome(true)),
                config.simulated_credit_delay,
            )),
            GatewayMode::Live => Arc::new(EdahabClient::new(
                config.edahab.clone(),
                config.provider_timeout,
            )),
        };

        Self::new(charge, credit).with_call_timeout(config.provider_timeout)
    }

    pub fn charge_mode(&self) -> GatewayMode {
        self.charge.mode()
    }

    pub fn credit_mode(&self) -> GatewayMode {
        self.credit.mode()
    }

    pub async fn charge(&self, payer_address: &str, amount: &BigDecimal) -> Result<Outcome, GatewayError> {
        tokio::time::timeout(self.call_timeout, self.charge.charge(payer_address, amount))
            .await
            .map_err(|_| GatewayError::Timeout(self.call_timeout))?
    }

    pub async fn credit(
        &self,
        recipient_address: &str,
        amount: &BigDecimal,
    ) -> Result<Outcome, GatewayError> {
        tokio::time::timeout(self.call_timeout, self.credit.credit(recipient_address, amount))
            .await
            .map_err(|_| GatewayError::Timeout(self.call_timeout))?
    }
}

pub(crate) type CircuitBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>;

/// Opens after `failure_threshold` consecutive transport failures, half-opens after a
/// jittered `reset_timeout..2*reset_timeout`.
pub(crate) fn circuit_breaker(failure_threshold: u32, reset_timeout: Duration) -> CircuitBreaker {
    let backoff = backoff::equal_jittered(reset_timeout, reset_timeout * 2);
    let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
    BreakerConfig::new().failure_policy(policy).build()
}

/// Providers are inconsistent about quoting numeric status codes.
pub(crate) fn code_as_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `PREFIX_<uuid>`: unique per attempt so provider records can be reconciled later.
pub(crate) fn attempt_reference(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}
