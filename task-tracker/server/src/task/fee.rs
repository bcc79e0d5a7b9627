//! Overdue-fee model.
//!
//! `fee = base_rate * days_overdue * priority_multiplier * escalation_multiplier`, where the
//! priority multiplier is 3.0/2.0/1.0 for high/medium/low and the escalation multiplier steps up
//! after 7 and after 30 overdue days.

use std::fmt;

use super::{Priority, TaskError};

/// Per-day base rate used when none is configured.
pub const DEFAULT_BASE_RATE: f64 = 10.0;

const EXTENDED_AFTER_DAYS: i64 = 7;
const SEVERE_AFTER_DAYS: i64 = 30;

/// Step function over overdue days that raises the fee multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationTier {
    /// Up to and including 7 days.
    Standard,
    /// 8 to 30 days.
    Extended,
    /// More than 30 days.
    Severe,
}

impl EscalationTier {
    pub fn for_days(days_overdue: i64) -> Self {
        if days_overdue > SEVERE_AFTER_DAYS {
            EscalationTier::Severe
        } else if days_overdue > EXTENDED_AFTER_DAYS {
            EscalationTier::Extended
        } else {
            EscalationTier::Standard
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            EscalationTier::Standard => 1.0,
            EscalationTier::Extended => 1.2,
            EscalationTier::Severe => 1.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationTier::Standard => "standard",
            EscalationTier::Extended => "extended",
            EscalationTier::Severe => "severe",
        }
    }
}

/// Multiplier applied to the base rate for a priority.
pub fn priority_multiplier(priority: Priority) -> f64 {
    match priority {
        Priority::High => 3.0,
        Priority::Medium => 2.0,
        Priority::Low => 1.0,
    }
}

/// Which branch of the model produced a fee. Reported back to clients for transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeStrategy {
    /// Nothing is overdue, so no fee applies.
    NoOverdue,
    Tiered {
        priority: Priority,
        tier: EscalationTier,
    },
}

impl fmt::Display for FeeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeStrategy::NoOverdue => f.write_str("no-overdue"),
            FeeStrategy::Tiered { priority, tier } => {
                write!(f, "{}-priority/{}", priority, tier.as_str())
            }
        }
    }
}

/// Result of a fee calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeQuote {
    pub fee: f64,
    pub days_overdue: i64,
    pub strategy: FeeStrategy,
}

/// Computes overdue fees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeCalculator {
    base_rate: f64,
}

impl Default for FeeCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_RATE)
    }
}

impl FeeCalculator {
    pub fn new(base_rate: f64) -> Self {
        Self { base_rate }
    }

    pub fn base_rate(&self) -> f64 {
        self.base_rate
    }

    /// Computes the fee for a task of `priority` that is `days_overdue` days late.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `daysOverdue` if `days_overdue` is negative.
    pub fn calculate(&self, priority: Priority, days_overdue: i64) -> Result<FeeQuote, TaskError> {
        if days_overdue < 0 {
            return Err(TaskError::validation(
                "daysOverdue",
                format!("must not be negative, got {days_overdue}"),
            ));
        }
        if days_overdue == 0 {
            return Ok(FeeQuote {
                fee: 0.0,
                days_overdue,
                strategy: FeeStrategy::NoOverdue,
            });
        }

        let tier = EscalationTier::for_days(days_overdue);
        let multiplier = priority_multiplier(priority) * tier.multiplier();
        Ok(FeeQuote {
            fee: self.base_rate * days_overdue as f64 * multiplier,
            days_overdue,
            strategy: FeeStrategy::Tiered { priority, tier },
        })
    }
}
