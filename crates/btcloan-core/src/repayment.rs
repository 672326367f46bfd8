//! Early repayment (partial or full) of an active loan.
//!
//! A repayment only moves the balance; the Loan record itself stays
//! untouched and the caller persists the outcome. After a partial
//! repayment the outcome carries a schedule recomputed from the new
//! balance over the months still owed, so the displayed table reflects
//! the accelerated payoff instead of the original contractual rows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::LoanError;
use crate::schedule::{add_months, build_schedule, ScheduleOutput, ScheduleRequest};
use crate::status::{paid_months_count, remaining_months};
use crate::types::{with_metadata, ComputationOutput, Loan, LoanStatus, Money, SATOSHI};
use crate::validation::validate_repayment;
use crate::LoanResult;

/// How a repayment is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepaymentKind {
    /// Reduce the balance by a caller-supplied amount.
    Partial,
    /// Settle the full outstanding balance; any supplied amount is ignored.
    Full,
}

/// Effect of a repayment on a loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentOutcome {
    pub amount_applied: Money,
    pub new_balance: Money,
    pub status: LoanStatus,
    pub completed: bool,
    /// Payoff plan for the months still owed, recomputed from the new
    /// balance at the contractual rate. Absent once the loan completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_schedule: Option<ScheduleOutput>,
}

/// Apply a repayment to `loan` and report the resulting balance, status,
/// and revised payoff plan. Pure: the input loan is not mutated.
pub fn apply_repayment(
    loan: &Loan,
    amount: Option<Money>,
    kind: RepaymentKind,
) -> LoanResult<ComputationOutput<RepaymentOutcome>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if loan.status != LoanStatus::Active {
        return Err(LoanError::InvalidInput {
            field: "status".into(),
            reason: format!("Cannot repay a loan with status {:?}", loan.status),
        });
    }

    let applied = match kind {
        RepaymentKind::Full => {
            if let Some(a) = amount {
                if a != loan.remaining_balance {
                    warnings.push(format!(
                        "Full repayment settles the outstanding balance {}; supplied amount {} ignored",
                        loan.remaining_balance, a
                    ));
                }
            }
            loan.remaining_balance
        }
        RepaymentKind::Partial => {
            let a = amount.ok_or_else(|| LoanError::InvalidInput {
                field: "amount".into(),
                reason: "Partial repayment requires an amount".into(),
            })?;
            validate_repayment(a, loan.remaining_balance)?;
            a
        }
    };

    let new_balance = (loan.remaining_balance - applied).max(Decimal::ZERO);
    let completed = new_balance <= SATOSHI;
    let status = if completed {
        LoanStatus::Completed
    } else {
        loan.status
    };

    let revised_schedule = if completed {
        None
    } else {
        let mut updated = loan.clone();
        updated.remaining_balance = new_balance;

        // The prepayment counts toward paid months, so the revised plan
        // covers only what is still owed.
        let paid = paid_months_count(&updated);
        let months_left = remaining_months(&updated).max(1);

        let mut revised = build_schedule(&ScheduleRequest {
            principal: new_balance,
            term_months: months_left,
            annual_rate: loan.annual_rate,
            start_date: Some(loan.start_date),
        })?;
        // Re-derive each due date as a single offset from the contractual
        // start. Stepping through an already-clamped intermediate date
        // would shift month-end starts (Jan 31 -> Feb 28 -> Mar 28).
        for entry in &mut revised.result.entries {
            entry.due_date = add_months(loan.start_date, paid + entry.month)?;
        }
        warnings.extend(revised.warnings);
        Some(revised.result)
    };

    let outcome = RepaymentOutcome {
        amount_applied: applied,
        new_balance,
        status,
        completed,
        revised_schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Early repayment — balance reduction with recalculated payoff plan",
        &serde_json::json!({
            "loan_id": loan.id,
            "kind": kind,
            "previous_balance": loan.remaining_balance.to_string(),
        }),
        warnings,
        elapsed,
        outcome,
    ))
}
