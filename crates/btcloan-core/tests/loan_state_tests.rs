use btcloan_core::repayment::{apply_repayment, RepaymentKind};
use btcloan_core::schedule::{monthly_payment, total_payment};
use btcloan_core::status::{
    current_due_month, days_until_next_payment, loan_state, next_payment_date,
    paid_months_count, remaining_months, repayment_progress, LoanHealth,
};
use btcloan_core::{Loan, LoanStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Derived loan-state tests (engine consumes a Loan, never mutates it)
// ===========================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 0.5 BTC / 12 months / 5% annual, started 2025-01-15.
fn sample_loan() -> Loan {
    let amount = dec!(0.5);
    let m = monthly_payment(amount, 12, dec!(0.05)).unwrap();
    Loan {
        id: "loan-42".into(),
        user_id: Some("user-7".into()),
        amount,
        term_months: 12,
        annual_rate: dec!(0.05),
        monthly_payment: m,
        total_payment: total_payment(amount, 12, dec!(0.05)).unwrap(),
        remaining_balance: amount,
        status: LoanStatus::Active,
        start_date: date(2025, 1, 15),
        created_at: Some(date(2025, 1, 15)),
    }
}

fn after_payments(months: u32) -> Loan {
    let mut loan = sample_loan();
    loan.remaining_balance = loan.amount - loan.monthly_payment * Decimal::from(months);
    loan
}

// Scenario: zero balance reports completed regardless of stored status
#[test]
fn test_zero_balance_reports_completed() {
    let mut loan = sample_loan();
    loan.remaining_balance = Decimal::ZERO;

    let state = loan_state(&loan, date(2025, 6, 1));
    assert_eq!(state.health, LoanHealth::Completed);
    assert_eq!(repayment_progress(&loan), dec!(100));
}

// Scenario: started 3 months ago, only 1 month paid -> 1 month overdue
#[test]
fn test_three_months_elapsed_one_paid_is_overdue() {
    let loan = after_payments(1);
    let now = date(2025, 3, 20);

    assert_eq!(current_due_month(&loan, now), 3);
    assert_eq!(paid_months_count(&loan), 1);

    let state = loan_state(&loan, now);
    assert_eq!(state.health, LoanHealth::Overdue);
    assert_eq!(state.months_overdue, Some(1));
}

#[test]
fn test_on_track_loan_is_active() {
    let loan = after_payments(3);
    let state = loan_state(&loan, date(2025, 4, 20)); // month 4 due, 3 paid
    assert_eq!(state.health, LoanHealth::Active);
}

#[test]
fn test_progress_and_remaining_months_track_balance() {
    let loan = after_payments(6);

    assert_eq!(paid_months_count(&loan), 6);
    assert_eq!(remaining_months(&loan), 6);

    let progress = repayment_progress(&loan);
    // 6 installments cover a bit more than half the principal
    assert!(progress > dec!(50) && progress < dec!(60), "got {}", progress);
}

#[test]
fn test_next_payment_date_follows_paid_months() {
    let loan = after_payments(4);
    assert_eq!(next_payment_date(&loan).unwrap(), date(2025, 6, 15));
    assert_eq!(days_until_next_payment(&loan, date(2025, 6, 10)).unwrap(), 5);
    assert_eq!(days_until_next_payment(&loan, date(2025, 7, 1)).unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Repayment flows end to end
// ---------------------------------------------------------------------------

#[test]
fn test_partial_repayment_then_status() {
    let loan = sample_loan();
    let out = apply_repayment(&loan, Some(dec!(0.25)), RepaymentKind::Partial).unwrap();

    let mut updated = loan.clone();
    updated.remaining_balance = out.result.new_balance;

    assert_eq!(updated.remaining_balance, dec!(0.25));
    assert_eq!(repayment_progress(&updated), dec!(50));

    // The prepayment counts as months covered, so a calendar only two
    // months in cannot be overdue anymore
    let state = loan_state(&updated, date(2025, 3, 20));
    assert_eq!(state.health, LoanHealth::Active);
}

#[test]
fn test_full_repayment_completes_and_progress_hits_100() {
    let loan = after_payments(5);
    let out = apply_repayment(&loan, None, RepaymentKind::Full).unwrap();

    let mut updated = loan.clone();
    updated.remaining_balance = out.result.new_balance;
    updated.status = out.result.status;

    assert_eq!(updated.status, LoanStatus::Completed);
    assert_eq!(repayment_progress(&updated), dec!(100));
    assert_eq!(loan_state(&updated, date(2026, 1, 1)).health, LoanHealth::Completed);
    assert_eq!(remaining_months(&updated), 0);
}

#[test]
fn test_revised_schedule_shortens_after_prepayment() {
    let loan = sample_loan();
    let out = apply_repayment(&loan, Some(dec!(0.3)), RepaymentKind::Partial).unwrap();
    let revised = out.result.revised_schedule.unwrap();

    // 0.3 BTC covers 7 installments' worth, leaving 5 months owed
    assert_eq!(revised.entries.len(), 5);
    assert!(revised.entries.last().unwrap().remaining_balance < dec!(0.000000001));
    // Revised plan amortizes exactly the new balance
    let principal_sum: Decimal = revised.entries.iter().map(|e| e.principal).sum();
    assert!((principal_sum - dec!(0.2)).abs() < dec!(0.000000001));
}
