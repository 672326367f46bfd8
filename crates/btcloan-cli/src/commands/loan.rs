use chrono::{NaiveDate, Utc};
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use btcloan_core::repayment::{apply_repayment, RepaymentKind};
use btcloan_core::schedule::{monthly_payment, total_payment};
use btcloan_core::status::{
    current_due_month, days_until_next_payment, loan_state, next_payment_date, paid_months_count,
    remaining_months, repayment_progress,
};
use btcloan_core::validation::{validate_application, LoanLimits};
use btcloan_core::{Loan, LoanStatus};

use crate::input;

/// Loan record supplied by file, stdin, or individual flags.
#[derive(Args)]
pub struct LoanInput {
    /// Path to a JSON file holding a Loan (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Original principal in BTC
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub term: Option<u32>,

    /// Annual interest rate as a fraction (defaults to the platform rate)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Outstanding balance in BTC (defaults to the full amount)
    #[arg(long)]
    pub remaining_balance: Option<Decimal>,

    /// Loan start date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Fixed installment (computed from the terms when omitted)
    #[arg(long)]
    pub monthly_payment: Option<Decimal>,
}

impl LoanInput {
    /// Resolve to a full Loan, computing the installment fields the flag
    /// path leaves out.
    fn resolve(&self) -> Result<Loan, Box<dyn std::error::Error>> {
        if let Some(ref path) = self.input {
            return Ok(input::read_json(path)?);
        }
        if let Some(data) = input::read_stdin()? {
            return Ok(serde_json::from_value(data)?);
        }

        let amount = self.amount.ok_or("--amount is required (or provide --input)")?;
        let term = self.term.ok_or("--term is required (or provide --input)")?;
        let rate = self.rate.unwrap_or_else(|| LoanLimits::default().annual_rate);
        let start_date = self
            .start_date
            .ok_or("--start-date is required (or provide --input)")?;

        let installment = match self.monthly_payment {
            Some(m) => m,
            None => monthly_payment(amount, term, rate)?,
        };

        Ok(Loan {
            id: "cli".into(),
            user_id: None,
            amount,
            term_months: term,
            annual_rate: rate,
            monthly_payment: installment,
            total_payment: total_payment(amount, term, rate)?,
            remaining_balance: self.remaining_balance.unwrap_or(amount),
            status: LoanStatus::Active,
            start_date,
            created_at: None,
        })
    }
}

/// Arguments for the status report
#[derive(Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub loan: LoanInput,

    /// Reference date for overdue checks (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub now: Option<NaiveDate>,
}

/// Arguments for early repayment
#[derive(Args)]
pub struct RepayArgs {
    #[command(flatten)]
    pub loan: LoanInput,

    /// Repayment amount in BTC (required for partial)
    #[arg(long)]
    pub repay_amount: Option<Decimal>,

    /// Repayment kind
    #[arg(long, default_value = "partial")]
    pub kind: KindArg,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum KindArg {
    Partial,
    Full,
}

impl From<KindArg> for RepaymentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Partial => RepaymentKind::Partial,
            KindArg::Full => RepaymentKind::Full,
        }
    }
}

/// Arguments for application validation
#[derive(Args)]
pub struct ValidateArgs {
    /// Requested principal in BTC
    #[arg(long)]
    pub amount: Decimal,

    /// Requested term in months
    #[arg(long)]
    pub term: u32,

    /// Override the minimum loan amount
    #[arg(long)]
    pub min_amount: Option<Decimal>,

    /// Override the maximum loan amount
    #[arg(long)]
    pub max_amount: Option<Decimal>,

    /// Override the maximum term in months
    #[arg(long)]
    pub max_term: Option<u32>,
}

pub fn run_status(args: StatusArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan = args.loan.resolve()?;
    let now = args.now.unwrap_or_else(|| Utc::now().date_naive());

    let state = loan_state(&loan, now);

    Ok(serde_json::json!({
        "result": {
            "health": state.health,
            "message": state.message,
            "months_overdue": state.months_overdue,
            "current_due_month": current_due_month(&loan, now),
            "paid_months": paid_months_count(&loan),
            "remaining_months": remaining_months(&loan),
            "progress_pct": repayment_progress(&loan),
            "remaining_balance": loan.remaining_balance,
            "next_payment_date": next_payment_date(&loan)?,
            "days_until_next_payment": days_until_next_payment(&loan, now)?,
        },
        "as_of": now,
        "loan_id": loan.id,
    }))
}

pub fn run_repay(args: RepayArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan = args.loan.resolve()?;
    let out = apply_repayment(&loan, args.repay_amount, args.kind.into())?;
    Ok(serde_json::to_value(&out)?)
}

pub fn run_validate(args: ValidateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut limits = LoanLimits::default();
    if let Some(min) = args.min_amount {
        limits.min_amount = min;
    }
    if let Some(max) = args.max_amount {
        limits.max_amount = max;
    }
    if let Some(max_term) = args.max_term {
        limits.max_term_months = max_term;
    }

    let verdict = validate_application(args.amount, args.term, &limits);

    Ok(serde_json::json!({
        "result": {
            "valid": verdict.is_ok(),
            "reason": verdict.err().map(|e| e.to_string()),
            "amount": args.amount,
            "term_months": args.term,
        },
        "limits": limits,
    }))
}
