//! Simulated backing for both capabilities. Latency is modelled with a fixed delay and the
//! approve/decline decision comes from an injectable [`OutcomeSource`].

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::utils::mask_address;

use super::{
    attempt_reference, ChargeCapability, CreditCapability, GatewayError, GatewayMode, Outcome,
};

/// Probability that a simulated charge is approved.
pub const SIMULATED_CHARGE_SUCCESS_RATE: f64 = 0.9;

/// Decides whether the next simulated call is approved.
pub trait OutcomeSource: Send + Sync {
    fn next_success(&self) -> bool;
}

/// Independent draw per call with a fixed approval probability.
#[derive(Debug, Clone, Copy)]
pub struct WeightedRandom {
    success_probability: f64,
}

impl WeightedRandom {
    pub fn new(success_probability: f64) -> Self {
        Self {
            success_probability: success_probability.clamp(0.0, 1.0),
        }
    }

    pub fn success_probability(&self) -> f64 {
        self.success_probability
    }
}

impl OutcomeSource for WeightedRandom {
    fn next_success(&self) -> bool {
        rand::thread_rng().gen_bool(self.success_probability)
    }
}

/// Always the same answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedOutcome(pub bool);

impl OutcomeSource for FixedOutcome {
    fn next_success(&self) -> bool {
        self.0
    }
}

pub struct SimulatedCharge {
    outcomes: Arc<dyn OutcomeSource>,
    delay: Duration,
}

impl SimulatedCharge {
    pub fn new(outcomes: Arc<dyn OutcomeSource>, delay: Duration) -> Self {
        Self { outcomes, delay }
    }

    /// The default simulated wallet: 90% approvals.
    pub fn weighted(delay: Duration) -> Self {
        Self::new(
            Arc::new(WeightedRandom::new(SIMULATED_CHARGE_SUCCESS_RATE)),
            delay,
        )
    }
}

#[async_trait]
impl ChargeCapability for SimulatedCharge {
    async fn charge(&self, payer_address: &str, amount: &BigDecimal) -> Result<Outcome, GatewayError> {
        tokio::time::sleep(self.delay).await;

        if self.outcomes.next_success() {
            let reference = attempt_reference("SIMCHG");
            debug!(payer = %mask_address(payer_address), %amount, %reference, "Simulated charge approved");
            Ok(Outcome::approved(reference))
        } else {
            debug!(payer = %mask_address(payer_address), %amount, "Simulated charge declined");
            Ok(Outcome::declined("simulated decline"))
        }
    }

    fn mode(&self) -> GatewayMode {
        GatewayMode::Simulated
    }
}

pub struct SimulatedCredit {
    outcomes: Arc<dyn OutcomeSource>,
    delay: Duration,
}

impl SimulatedCredit {
    pub fn new(outcomes: Arc<dyn OutcomeSource>, delay: Duration) -> Self {
        Self { outcomes, delay }
    }
}

#[async_trait]
impl CreditCapability for SimulatedCredit {
    async fn credit(
        &self,
        recipient_address: &str,
        amount: &BigDecimal,
    ) -> Result<Outcome, GatewayError> {
        tokio::time::sleep(self.delay).await;

        if self.outcomes.next_success() {
            let reference = attempt_reference("SIMDSB");
            debug!(recipient = %mask_address(recipient_address), %amount, %reference, "Simulated credit approved");
            Ok(Outcome::approved(reference))
        } else {
            Ok(Outcome::declined("simulated disbursement failure"))
        }
    }

    fn mode(&self) -> GatewayMode {
        GatewayMode::Simulated
    }
}
