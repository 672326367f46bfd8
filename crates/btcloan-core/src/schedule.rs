//! Annuity amortization schedules for BTC-denominated loans.
//!
//! A loan is repaid in equal monthly installments; each installment splits
//! into interest accrued on the outstanding balance and a principal
//! portion that retires it. All math uses `rust_decimal::Decimal` so the
//! displayed schedule is exact to the satoshi.

use chrono::{Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::LoanError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, SATOSHI};
use crate::LoanResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MONTHS_PER_YEAR: Decimal = dec!(12);
/// BTC carries 8 fractional digits on-chain.
const BTC_SCALE: u32 = 8;

// ---------------------------------------------------------------------------
// Input / Output Types
// ---------------------------------------------------------------------------

/// Input for building an amortization schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Loan principal in BTC.
    pub principal: Money,
    /// Term in months.
    pub term_months: u32,
    /// Annual interest rate as a fraction (0.05 = 5%).
    pub annual_rate: Rate,
    /// First accrual date. Defaults to today (UTC) when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

/// One row of the payment schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Month number, 1-based.
    pub month: u32,
    pub due_date: NaiveDate,
    /// Total installment (principal + interest).
    pub payment: Money,
    pub principal: Money,
    pub interest: Money,
    /// Outstanding balance after this installment, never negative.
    pub remaining_balance: Money,
}

/// Full schedule with aggregate figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub monthly_payment: Money,
    pub total_payment: Money,
    pub total_interest: Money,
    pub entries: Vec<ScheduleEntry>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the full monthly amortization schedule for a loan.
pub fn build_schedule(
    request: &ScheduleRequest,
) -> LoanResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_terms(request.principal, request.term_months, request.annual_rate)?;

    if request.principal.normalize().scale() > BTC_SCALE {
        warnings.push(format!(
            "Principal {} has sub-satoshi precision; amounts below 1e-8 BTC are not representable on-chain",
            request.principal
        ));
    }

    let start_date = request
        .start_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let (monthly, entries) = compute_entries(
        request.principal,
        request.term_months,
        request.annual_rate,
        start_date,
    )?;

    let total_payment: Money = entries.iter().map(|e| e.payment).sum();
    let total_interest = total_payment - request.principal;

    let output = ScheduleOutput {
        monthly_payment: monthly,
        total_payment,
        total_interest,
        entries,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Annuity amortization — fixed installment, declining interest",
        &serde_json::json!({
            "principal": request.principal.to_string(),
            "term_months": request.term_months,
            "annual_rate": request.annual_rate.to_string(),
            "start_date": start_date.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Fixed monthly installment for the given terms, without materializing
/// the schedule. Identical to the `payment` field of every schedule entry.
pub fn monthly_payment(
    principal: Money,
    term_months: u32,
    annual_rate: Rate,
) -> LoanResult<Money> {
    validate_terms(principal, term_months, annual_rate)?;
    annuity_payment(principal, term_months, annual_rate)
}

/// Total amount repaid over the life of the loan.
///
/// Summed over the materialized schedule rather than `M * n`, so the
/// figure matches a displayed table row-for-row.
pub fn total_payment(
    principal: Money,
    term_months: u32,
    annual_rate: Rate,
) -> LoanResult<Money> {
    validate_terms(principal, term_months, annual_rate)?;
    // Due dates don't affect the sum; any anchor works.
    let anchor = NaiveDate::from_ymd_opt(2000, 1, 1)
        .ok_or_else(|| LoanError::DateError("invalid anchor date".into()))?;
    let (_, entries) = compute_entries(principal, term_months, annual_rate, anchor)?;
    Ok(entries.iter().map(|e| e.payment).sum())
}

/// Advance a date by whole calendar months, clamping the day when the
/// target month is shorter (Jan 31 + 1 month -> Feb 28/29).
pub fn add_months(date: NaiveDate, months: u32) -> LoanResult<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LoanError::DateError(format!("{date} + {months} months overflows")))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub(crate) fn validate_terms(
    principal: Money,
    term_months: u32,
    annual_rate: Rate,
) -> LoanResult<()> {
    if principal <= Decimal::ZERO {
        return Err(LoanError::InvalidInput {
            field: "principal".into(),
            reason: "Principal must be positive".into(),
        });
    }
    if term_months == 0 {
        return Err(LoanError::InvalidInput {
            field: "term_months".into(),
            reason: "Term must be at least 1 month".into(),
        });
    }
    if annual_rate < Decimal::ZERO {
        return Err(LoanError::InvalidInput {
            field: "annual_rate".into(),
            reason: "Annual rate cannot be negative".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Annuity formula: M = P * r * (1+r)^n / ((1+r)^n - 1).
///
/// At r = 0 the formula divides by zero; the loan degenerates to equal
/// principal installments with no interest.
fn annuity_payment(principal: Money, term_months: u32, annual_rate: Rate) -> LoanResult<Money> {
    let n = Decimal::from(term_months);
    if annual_rate.is_zero() {
        return Ok(principal / n);
    }

    let monthly_rate = annual_rate / MONTHS_PER_YEAR;
    // powi, not powd: the exponent is a whole number of months, and the
    // exp/ln path leaves sub-satoshi dust even for n = 1.
    let growth = (Decimal::ONE + monthly_rate).powi(term_months as i64);
    let annuity_factor = growth - Decimal::ONE;
    if annuity_factor.is_zero() {
        return Err(LoanError::DivisionByZero {
            context: "annuity factor".into(),
        });
    }

    Ok(principal * monthly_rate * growth / annuity_factor)
}

/// Materialize all schedule rows. The installment is computed once and
/// reused so every row carries the identical payment.
fn compute_entries(
    principal: Money,
    term_months: u32,
    annual_rate: Rate,
    start_date: NaiveDate,
) -> LoanResult<(Money, Vec<ScheduleEntry>)> {
    let monthly = annuity_payment(principal, term_months, annual_rate)?;
    let monthly_rate = if annual_rate.is_zero() {
        Decimal::ZERO
    } else {
        annual_rate / MONTHS_PER_YEAR
    };

    let mut entries: Vec<ScheduleEntry> = Vec::with_capacity(term_months as usize);
    let mut balance = principal;

    for month in 1..=term_months {
        let interest = balance * monthly_rate;
        let principal_portion = monthly - interest;
        balance -= principal_portion;

        // The final installment can miss zero by a rounding hair in
        // either direction; anything at or below one satoshi is settled.
        let remaining_balance = if month == term_months && balance.abs() <= SATOSHI {
            Decimal::ZERO
        } else {
            balance.max(Decimal::ZERO)
        };

        entries.push(ScheduleEntry {
            month,
            due_date: add_months(start_date, month)?,
            payment: monthly,
            principal: principal_portion,
            interest,
            remaining_balance,
        });
    }

    Ok((monthly, entries))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(principal: Decimal, term: u32, rate: Decimal) -> ScheduleRequest {
        ScheduleRequest {
            principal,
            term_months: term,
            annual_rate: rate,
            start_date: Some(date(2025, 1, 15)),
        }
    }

    // -----------------------------------------------------------------------
    // 1. Monthly payment matches every schedule row exactly
    // -----------------------------------------------------------------------
    #[test]
    fn test_monthly_payment_matches_schedule_rows() {
        let m = monthly_payment(dec!(0.5), 12, dec!(0.05)).unwrap();
        let out = build_schedule(&request(dec!(0.5), 12, dec!(0.05))).unwrap();

        assert_eq!(out.result.monthly_payment, m);
        for entry in &out.result.entries {
            assert_eq!(entry.payment, m, "month {} drifted", entry.month);
        }
    }

    // -----------------------------------------------------------------------
    // 2. Zero rate: equal principal split, no interest
    // -----------------------------------------------------------------------
    #[test]
    fn test_zero_rate_equal_principal() {
        let out = build_schedule(&request(dec!(0.6), 6, dec!(0))).unwrap();
        let expected = dec!(0.6) / dec!(6);

        assert_eq!(out.result.monthly_payment, expected);
        assert_eq!(out.result.total_interest, Decimal::ZERO);
        for entry in &out.result.entries {
            assert_eq!(entry.interest, Decimal::ZERO);
            assert_eq!(entry.principal, expected);
        }
        assert_eq!(
            out.result.entries.last().unwrap().remaining_balance,
            Decimal::ZERO
        );
    }

    // -----------------------------------------------------------------------
    // 3. Single-month term: one installment of P * (1 + r/12)
    // -----------------------------------------------------------------------
    #[test]
    fn test_single_month_term() {
        let out = build_schedule(&request(dec!(1), 1, dec!(0.05))).unwrap();
        let entries = &out.result.entries;

        assert_eq!(entries.len(), 1);
        let expected = dec!(1) * (Decimal::ONE + dec!(0.05) / dec!(12));
        let diff = (entries[0].payment - expected).abs();
        assert!(
            diff < dec!(0.0000000001),
            "single installment should be P*(1+r), got {}",
            entries[0].payment
        );
        assert_eq!(entries[0].remaining_balance, Decimal::ZERO);
    }

    // -----------------------------------------------------------------------
    // 4. Due dates clamp day-of-month overflow
    // -----------------------------------------------------------------------
    #[test]
    fn test_due_date_day_clamping() {
        let req = ScheduleRequest {
            principal: dec!(0.5),
            term_months: 3,
            annual_rate: dec!(0.05),
            start_date: Some(date(2025, 1, 31)),
        };
        let out = build_schedule(&req).unwrap();
        let dates: Vec<NaiveDate> = out.result.entries.iter().map(|e| e.due_date).collect();

        // Feb has 28 days in 2025, Apr has 30
        assert_eq!(dates[0], date(2025, 2, 28));
        assert_eq!(dates[1], date(2025, 3, 31));
        assert_eq!(dates[2], date(2025, 4, 30));
    }

    // -----------------------------------------------------------------------
    // 5. Leap year February
    // -----------------------------------------------------------------------
    #[test]
    fn test_add_months_leap_year() {
        assert_eq!(add_months(date(2024, 1, 31), 1).unwrap(), date(2024, 2, 29));
        assert_eq!(add_months(date(2024, 11, 30), 3).unwrap(), date(2025, 2, 28));
    }

    // -----------------------------------------------------------------------
    // 6. Validation: non-positive principal
    // -----------------------------------------------------------------------
    #[test]
    fn test_validation_zero_principal() {
        let err = build_schedule(&request(Decimal::ZERO, 12, dec!(0.05))).unwrap_err();
        match err {
            LoanError::InvalidInput { field, .. } => assert_eq!(field, "principal"),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    // -----------------------------------------------------------------------
    // 7. Validation: zero term
    // -----------------------------------------------------------------------
    #[test]
    fn test_validation_zero_term() {
        let err = monthly_payment(dec!(0.5), 0, dec!(0.05)).unwrap_err();
        match err {
            LoanError::InvalidInput { field, .. } => assert_eq!(field, "term_months"),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    // -----------------------------------------------------------------------
    // 8. Validation: negative rate
    // -----------------------------------------------------------------------
    #[test]
    fn test_validation_negative_rate() {
        let err = total_payment(dec!(0.5), 12, dec!(-0.01)).unwrap_err();
        match err {
            LoanError::InvalidInput { field, .. } => assert_eq!(field, "annual_rate"),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    // -----------------------------------------------------------------------
    // 9. total_payment equals the schedule sum
    // -----------------------------------------------------------------------
    #[test]
    fn test_total_payment_equals_schedule_sum() {
        let total = total_payment(dec!(0.75), 18, dec!(0.05)).unwrap();
        let out = build_schedule(&request(dec!(0.75), 18, dec!(0.05))).unwrap();
        let summed: Decimal = out.result.entries.iter().map(|e| e.payment).sum();

        assert_eq!(total, summed);
        assert_eq!(out.result.total_payment, summed);
    }

    // -----------------------------------------------------------------------
    // 10. Sub-satoshi principal produces a warning, not an error
    // -----------------------------------------------------------------------
    #[test]
    fn test_sub_satoshi_warning() {
        let out = build_schedule(&request(dec!(0.123456789), 12, dec!(0.05))).unwrap();
        assert!(
            out.warnings.iter().any(|w| w.contains("sub-satoshi")),
            "expected a precision warning, got {:?}",
            out.warnings
        );
        assert_eq!(out.result.entries.len(), 12);
    }

    // -----------------------------------------------------------------------
    // 11. Metadata populated
    // -----------------------------------------------------------------------
    #[test]
    fn test_metadata_populated() {
        let out = build_schedule(&request(dec!(0.5), 12, dec!(0.05))).unwrap();
        assert!(out.methodology.contains("Annuity"));
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
    }
}
