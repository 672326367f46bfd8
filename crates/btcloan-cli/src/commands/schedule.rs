use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use btcloan_core::schedule::{build_schedule, ScheduleRequest};
use btcloan_core::validation::LoanLimits;

use crate::input;

/// Arguments for the installment preview
#[derive(Args)]
pub struct PreviewArgs {
    /// Path to JSON input file (a ScheduleRequest; overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal in BTC
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub term: Option<u32>,

    /// Annual interest rate as a fraction (defaults to the platform rate)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// First accrual date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

/// Arguments for the full amortization schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON input file (a ScheduleRequest; overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal in BTC
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub term: Option<u32>,

    /// Annual interest rate as a fraction (defaults to the platform rate)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// First accrual date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

fn request_from(
    input_path: &Option<String>,
    amount: Option<Decimal>,
    term: Option<u32>,
    rate: Option<Decimal>,
    start_date: Option<NaiveDate>,
) -> Result<ScheduleRequest, Box<dyn std::error::Error>> {
    if let Some(path) = input_path {
        return Ok(input::read_json(path)?);
    }
    if let Some(data) = input::read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }
    Ok(ScheduleRequest {
        principal: amount.ok_or("--amount is required (or provide --input)")?,
        term_months: term.ok_or("--term is required (or provide --input)")?,
        annual_rate: rate.unwrap_or_else(|| LoanLimits::default().annual_rate),
        start_date,
    })
}

pub fn run_preview(args: PreviewArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = request_from(
        &args.input,
        args.amount,
        args.term,
        args.rate,
        args.start_date,
    )?;

    let out = build_schedule(&request)?;
    let mut value = serde_json::to_value(&out)?;

    // The preview is the aggregate figures only; drop the row detail
    if let Some(result) = value.get_mut("result").and_then(Value::as_object_mut) {
        result.remove("entries");
    }
    Ok(value)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = request_from(
        &args.input,
        args.amount,
        args.term,
        args.rate,
        args.start_date,
    )?;

    let out = build_schedule(&request)?;
    Ok(serde_json::to_value(&out)?)
}
