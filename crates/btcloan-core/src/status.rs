//! Derived loan-state queries.
//!
//! Everything here is a pure function of a [`Loan`] and a caller-supplied
//! "now", so dashboards can decorate schedule rows without touching the
//! wall clock. Paid months are inferred from the balance: the engine
//! treats `amount - remaining_balance` divided by the fixed installment
//! as the number of satisfied months rather than tracking payment records.

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::schedule::add_months;
use crate::types::{Loan, LoanStatus, SATOSHI};
use crate::LoanResult;

const PERCENT: Decimal = dec!(100);

/// Health of a loan as of a given date. Unlike [`LoanStatus`] this is
/// derived, not stored: a loan the store still marks `active` reports
/// `Overdue` here once the calendar outruns its payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanHealth {
    Active,
    Completed,
    Overdue,
}

/// Point-in-time status report for a loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanState {
    pub health: LoanHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub months_overdue: Option<u32>,
    pub message: String,
}

/// Number of scheduled months covered by what has been paid so far.
///
/// `floor((amount - remaining_balance) / monthly_payment)`, clamped to
/// `[0, term]`. A malformed loan with a non-positive installment counts
/// as zero months paid instead of propagating a division blow-up.
pub fn paid_months_count(loan: &Loan) -> u32 {
    if loan.monthly_payment <= Decimal::ZERO {
        return 0;
    }
    let total_paid = (loan.amount - loan.remaining_balance).max(Decimal::ZERO);
    // Balances derived by repeated Decimal multiplication can sit one ulp
    // under a whole month; round well below satoshi granularity first.
    let months = (total_paid / loan.monthly_payment).round_dp(9).floor();
    // Clamp in Decimal space: an oversized count must saturate at the
    // term, not fall back to 0 through a failed u32 conversion.
    if months >= Decimal::from(loan.term_months) {
        return loan.term_months;
    }
    months.to_u32().unwrap_or(0)
}

/// Which month's payment is currently due, 1-based and clamped to the
/// term. Independent of whether that payment has been made.
pub fn current_due_month(loan: &Loan, now: NaiveDate) -> u32 {
    let start = loan.start_date;
    let months_elapsed =
        (now.year() - start.year()) * 12 + now.month() as i32 - start.month() as i32;
    (months_elapsed + 1).clamp(1, loan.term_months as i32) as u32
}

/// True when the calendar has passed `payment_month`'s due date but the
/// cumulative paid count has not caught up to it.
pub fn is_payment_overdue(loan: &Loan, payment_month: u32, now: NaiveDate) -> bool {
    current_due_month(loan, now) > payment_month && paid_months_count(loan) < payment_month
}

/// Full status report: completed, overdue (with how many months), or active.
pub fn loan_state(loan: &Loan, now: NaiveDate) -> LoanState {
    if loan.status == LoanStatus::Completed || loan.remaining_balance <= SATOSHI {
        return LoanState {
            health: LoanHealth::Completed,
            months_overdue: None,
            message: "Loan fully repaid".into(),
        };
    }

    let current = current_due_month(loan, now);
    let paid = paid_months_count(loan);

    if current > paid + 1 {
        let months_overdue = current - paid - 1;
        return LoanState {
            health: LoanHealth::Overdue,
            months_overdue: Some(months_overdue),
            message: format!("{months_overdue} payment(s) overdue"),
        };
    }

    LoanState {
        health: LoanHealth::Active,
        months_overdue: None,
        message: "Loan on schedule".into(),
    }
}

/// Share of the principal repaid, as a percentage in `[0, 100]`.
pub fn repayment_progress(loan: &Loan) -> Decimal {
    if loan.amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let progress = (loan.amount - loan.remaining_balance) / loan.amount * PERCENT;
    progress.clamp(Decimal::ZERO, PERCENT)
}

/// Months left until full repayment, assuming the paid-months proxy.
///
/// A settled balance reports zero outright: the installment rarely
/// divides the principal evenly, so the paid-months floor alone would
/// leave a phantom month on a loan that owes nothing.
pub fn remaining_months(loan: &Loan) -> u32 {
    if loan.remaining_balance <= SATOSHI {
        return 0;
    }
    loan.term_months.saturating_sub(paid_months_count(loan))
}

/// Due date of the first unpaid installment.
pub fn next_payment_date(loan: &Loan) -> LoanResult<NaiveDate> {
    add_months(loan.start_date, paid_months_count(loan) + 1)
}

/// Calendar days from `now` to the next payment, floored at zero.
pub fn days_until_next_payment(loan: &Loan, now: NaiveDate) -> LoanResult<i64> {
    let next = next_payment_date(loan)?;
    Ok((next - now).num_days().max(0))
}
