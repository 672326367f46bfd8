//! Application-level limits for new loans and repayments.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LoanError;
use crate::types::{Money, Rate};
use crate::LoanResult;

/// Product limits for loan applications. Defaults mirror the platform
/// configuration: 0.01 to 1 BTC over 1 to 24 months at 5% annual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanLimits {
    pub min_amount: Money,
    pub max_amount: Money,
    pub min_term_months: u32,
    pub max_term_months: u32,
    pub annual_rate: Rate,
}

impl Default for LoanLimits {
    fn default() -> Self {
        LoanLimits {
            min_amount: dec!(0.01),
            max_amount: dec!(1),
            min_term_months: 1,
            max_term_months: 24,
            annual_rate: dec!(0.05),
        }
    }
}

/// Validate a loan application against product limits.
pub fn validate_application(
    amount: Money,
    term_months: u32,
    limits: &LoanLimits,
) -> LoanResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LoanError::InvalidInput {
            field: "amount".into(),
            reason: "Amount must be positive".into(),
        });
    }
    if amount < limits.min_amount {
        return Err(LoanError::InvalidInput {
            field: "amount".into(),
            reason: format!("Minimum loan amount is {} BTC", limits.min_amount),
        });
    }
    if amount > limits.max_amount {
        return Err(LoanError::InvalidInput {
            field: "amount".into(),
            reason: format!("Maximum loan amount is {} BTC", limits.max_amount),
        });
    }
    if term_months < limits.min_term_months {
        return Err(LoanError::InvalidInput {
            field: "term_months".into(),
            reason: format!("Minimum term is {} month(s)", limits.min_term_months),
        });
    }
    if term_months > limits.max_term_months {
        return Err(LoanError::InvalidInput {
            field: "term_months".into(),
            reason: format!("Maximum term is {} months", limits.max_term_months),
        });
    }
    Ok(())
}

/// Validate a repayment amount against the outstanding balance.
pub fn validate_repayment(amount: Money, remaining_balance: Money) -> LoanResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LoanError::InvalidInput {
            field: "amount".into(),
            reason: "Repayment amount must be positive".into(),
        });
    }
    if amount > remaining_balance {
        return Err(LoanError::InvalidInput {
            field: "amount".into(),
            reason: format!(
                "Repayment {} exceeds the outstanding balance {}",
                amount, remaining_balance
            ),
        });
    }
    Ok(())
}
