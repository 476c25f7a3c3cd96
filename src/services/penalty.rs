//! Late-return penalty computation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Days past due and the amount owed for them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyAssessment {
    pub days_overdue: i64,
    pub penalty: Decimal,
}

impl PenaltyAssessment {
    pub fn is_late(&self) -> bool {
        self.days_overdue > 0
    }
}

/// Flat per-day penalty
#[derive(Debug, Clone, Copy)]
pub struct PenaltyCalculator {
    daily_rate: Decimal,
}

impl PenaltyCalculator {
    pub fn new(daily_rate: Decimal) -> Self {
        Self { daily_rate }
    }

    pub fn daily_rate(&self) -> Decimal {
        self.daily_rate
    }

    /// Whole days elapsed from `due_date` to `as_of`, never negative,
    /// times the daily rate.
    pub fn compute(&self, due_date: DateTime<Utc>, as_of: DateTime<Utc>) -> PenaltyAssessment {
        let days_overdue = (as_of - due_date).num_days().max(0);
        PenaltyAssessment {
            days_overdue,
            penalty: Decimal::from(days_overdue) * self.daily_rate,
        }
    }
}

impl Default for PenaltyCalculator {
    fn default() -> Self {
        Self::new(Decimal::from(5))
    }
}
