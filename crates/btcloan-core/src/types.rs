use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// All monetary values (fractional BTC). Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5% annual). Never as percentages.
pub type Rate = Decimal;

/// One satoshi. Balances at or below this are treated as fully repaid.
pub const SATOSHI: Decimal = dec!(0.00000001);

/// Lifecycle status stored on a loan record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

/// A funded loan as the application shell stores it. The engine never
/// mutates one of these; repayments produce a new balance for the caller
/// to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Original principal in BTC.
    pub amount: Money,
    /// Contractual term in months.
    pub term_months: u32,
    /// Annual interest rate as a fraction.
    pub annual_rate: Rate,
    /// Fixed annuity payment, set once at origination.
    pub monthly_payment: Money,
    pub total_payment: Money,
    /// Live balance, reduced by scheduled payments and prepayments.
    pub remaining_balance: Money,
    pub status: LoanStatus,
    pub start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDate>,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
