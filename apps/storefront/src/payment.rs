//! # Payment Processing
//!
//! Decides whether an order's payment completes.
//!
//! ```text
//! OrderService ── attempt_payment(&PaymentAttempt) ──► dyn PaymentProcessor
//!                                                          │
//!                     ┌────────────────────────────────────┼───────────────┐
//!                     ▼                                    ▼               ▼
//!          SimulatedPaymentProcessor          FixedOutcomeProcessor   (real gateway)
//!          Bernoulli(success_rate)            always one outcome
//! ```
//!
//! The processor runs inside the order transaction, so it must not block
//! for long and must not touch the database.

use async_trait::async_trait;
use esales_core::{Money, OrderStatus};
use rand::Rng;
use tracing::debug;

/// What the processor is asked to charge.
#[derive(Debug, Clone)]
pub struct PaymentAttempt {
    pub order_number: String,
    pub amount: Money,
}

/// Final payment result for one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Completed,
    Failed,
}

impl PaymentOutcome {
    /// The order status this outcome produces.
    pub const fn order_status(&self) -> OrderStatus {
        match self {
            PaymentOutcome::Completed => OrderStatus::Completed,
            PaymentOutcome::Failed => OrderStatus::Failed,
        }
    }

    pub const fn is_completed(&self) -> bool {
        matches!(self, PaymentOutcome::Completed)
    }
}

/// Strategy for charging an order.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn attempt_payment(&self, attempt: &PaymentAttempt) -> PaymentOutcome;
}

// =============================================================================
// Simulated
// =============================================================================

/// Random outcome standing in for a payment gateway.
#[derive(Debug, Clone)]
pub struct SimulatedPaymentProcessor {
    success_rate: f64,
}

impl SimulatedPaymentProcessor {
    pub const DEFAULT_SUCCESS_RATE: f64 = 0.8;

    /// `success_rate` is clamped to [0, 1].
    pub fn new(success_rate: f64) -> Self {
        let success_rate = if success_rate.is_nan() {
            0.0
        } else {
            success_rate.clamp(0.0, 1.0)
        };
        SimulatedPaymentProcessor { success_rate }
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

impl Default for SimulatedPaymentProcessor {
    fn default() -> Self {
        SimulatedPaymentProcessor::new(Self::DEFAULT_SUCCESS_RATE)
    }
}

#[async_trait]
impl PaymentProcessor for SimulatedPaymentProcessor {
    async fn attempt_payment(&self, attempt: &PaymentAttempt) -> PaymentOutcome {
        let approved = rand::thread_rng().gen_bool(self.success_rate);
        let outcome = if approved {
            PaymentOutcome::Completed
        } else {
            PaymentOutcome::Failed
        };

        debug!(
            order_number = %attempt.order_number,
            amount = %attempt.amount,
            ?outcome,
            "Simulated payment"
        );
        outcome
    }
}

// =============================================================================
// Fixed
// =============================================================================

/// Always returns the same outcome.
#[derive(Debug, Clone, Copy)]
pub struct FixedOutcomeProcessor {
    outcome: PaymentOutcome,
}

impl FixedOutcomeProcessor {
    pub const fn new(outcome: PaymentOutcome) -> Self {
        FixedOutcomeProcessor { outcome }
    }

    pub const fn approve_all() -> Self {
        Self::new(PaymentOutcome::Completed)
    }

    pub const fn decline_all() -> Self {
        Self::new(PaymentOutcome::Failed)
    }
}

#[async_trait]
impl PaymentProcessor for FixedOutcomeProcessor {
    async fn attempt_payment(&self, _attempt: &PaymentAttempt) -> PaymentOutcome {
        self.outcome
    }
}
